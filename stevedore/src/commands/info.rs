use super::{Dispatcher, STATUS_ERROR, STATUS_OK};
use crate::options::CommandOptions;
use crate::output::{Formattable, OutputFormat, format_output};
use libstevedore::HostInfo;
use libstevedore::config::Settings;
use serde::Serialize;
use tracing::warn;

/// Host and settings summary shown by `info`.
#[derive(Debug, Serialize)]
pub struct InfoReport<'a> {
    pub version: &'static str,
    pub host: &'a HostInfo,
    pub settings: &'a Settings,
    /// Registry hosts with stored credentials
    pub logins: Vec<String>,
}

impl Formattable for InfoReport<'_> {
    fn format_pretty(&self) -> String {
        let arch = if self.host.arch.is_empty() {
            "unknown"
        } else {
            self.host.arch.as_str()
        };

        let mut output = String::new();
        output.push_str(&format!("Version: {}\n", self.version));
        output.push_str(&format!(
            "User: {} (uid {}, gid {})\n",
            self.host.username, self.host.uid, self.host.gid
        ));
        output.push_str(&format!("OS: {} {}\n", self.host.os, self.host.kernel));
        output.push_str(&format!("Architecture: {}\n", arch));
        output.push_str(&format!(
            "Repository: {}\n",
            self.settings.repository.display()
        ));
        output.push_str(&format!(
            "Keystore: {}\n",
            self.settings.keystore_path().display()
        ));
        output.push_str(&format!("Index: {}\n", self.settings.index_url));
        output.push_str(&format!("Registry: {}\n", self.settings.registry_url));
        if self.logins.is_empty() {
            output.push_str("Logins: none");
        } else {
            output.push_str(&format!("Logins: {}", self.logins.join(", ")));
        }
        output
    }
}

impl Dispatcher {
    /// `info [--format pretty|json|yaml]`
    pub(super) fn info(&mut self, options: &CommandOptions) -> i32 {
        let format = options
            .get("format")
            .map(OutputFormat::from)
            .unwrap_or_default();

        let logins = self.credentials.list().unwrap_or_else(|e| {
            warn!(error = %e, "cannot list stored credentials");
            Vec::new()
        });

        let report = InfoReport {
            version: env!("CARGO_PKG_VERSION"),
            host: &self.ctx.host,
            settings: &self.ctx.settings,
            logins,
        };

        match format_output(&report, format) {
            Ok(output) => {
                self.sink.info(output.trim_end());
                STATUS_OK
            }
            Err(e) => {
                self.sink.error(&e);
                STATUS_ERROR
            }
        }
    }
}
