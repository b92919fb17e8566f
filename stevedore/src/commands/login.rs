use super::{Dispatcher, STATUS_ERROR, STATUS_OK};
use crate::options::CommandOptions;
use libstevedore::registry::registry_host;
use tracing::debug;

impl Dispatcher {
    /// `login [--username U] [--password P] [--registry R]`
    ///
    /// Missing credentials are prompted for, each at most once, before the
    /// keystore is touched.
    pub(super) fn login(&mut self, options: &CommandOptions) -> i32 {
        let Some(host) = self.target_host(options) else {
            return STATUS_ERROR;
        };

        let username = match options.get("username") {
            Some(username) => username.trim().to_string(),
            None => match self.terminal.read_line("Username: ") {
                Ok(username) => username.trim().to_string(),
                Err(e) => {
                    self.sink.error(&format!("Failed to read username: {}", e));
                    return STATUS_ERROR;
                }
            },
        };

        let password = match options.get("password") {
            Some(password) => password.to_string(),
            None => match self.terminal.read_secret("Password: ") {
                Ok(password) => password,
                Err(e) => {
                    self.sink.error(&format!("Failed to read password: {}", e));
                    return STATUS_ERROR;
                }
            },
        };

        if username.is_empty() {
            self.sink.error("Username cannot be empty");
            return STATUS_ERROR;
        }

        debug!(host = %host, username = %username, "storing credentials");
        match self.credentials.put(&host, &username, &password) {
            Ok(()) => {
                self.sink.info(&format!("Login succeeded for {}", host));
                STATUS_OK
            }
            Err(e) => {
                self.sink.error(&format!("Failed to store credentials: {}", e));
                STATUS_ERROR
            }
        }
    }

    /// `logout [--registry R] [--all]`
    pub(super) fn logout(&mut self, options: &CommandOptions) -> i32 {
        if options.flag("all") {
            return match self.credentials.erase() {
                Ok(()) => {
                    self.sink.info("Removed all stored credentials");
                    STATUS_OK
                }
                Err(e) => {
                    self.sink.error(&format!("Failed to erase credentials: {}", e));
                    STATUS_ERROR
                }
            };
        }

        let Some(host) = self.target_host(options) else {
            return STATUS_ERROR;
        };

        match self.credentials.delete(&host) {
            Ok(()) => {
                self.sink.info(&format!("Logged out from {}", host));
                STATUS_OK
            }
            Err(e) => {
                self.sink
                    .error(&format!("Failed to remove credentials for {}: {}", host, e));
                STATUS_ERROR
            }
        }
    }

    /// Host named by `--registry`, or the configured index host.
    fn target_host(&self, options: &CommandOptions) -> Option<String> {
        let host = match options.get("registry") {
            Some(registry) => registry_host(registry),
            None => self.ctx.settings.index_host(),
        };

        if host.is_none() {
            self.sink.error(&format!(
                "Invalid registry: {}",
                options
                    .get("registry")
                    .unwrap_or(self.ctx.settings.index_url.as_str())
            ));
        }
        host
    }
}
