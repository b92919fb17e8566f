//! User-facing output.
//!
//! Every line a command shows the user goes through a [`MessageSink`], gated
//! by severity. Structured data (image listings, host info) is rendered to a
//! string first with [`format_output`] and then emitted at `Info`.

use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

pub use libstevedore::config::Verbosity as Severity;


/// Destination for user-facing messages.
pub trait MessageSink {
    /// Shows `message` if `severity` passes the sink's level.
    fn emit(&self, severity: Severity, message: &str);

    fn error(&self, message: &str) {
        self.emit(Severity::Error, message);
    }

    fn warning(&self, message: &str) {
        self.emit(Severity::Warning, message);
    }

    fn info(&self, message: &str) {
        self.emit(Severity::Info, message);
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl From<&str> for ColorChoice {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "always" | "true" | "yes" => ColorChoice::Always,
            "never" | "false" | "no" => ColorChoice::Never,
            _ => ColorChoice::Auto,
        }
    }
}

impl ColorChoice {
    /// Resolves `Auto` against `NO_COLOR` and whether stderr is a terminal.
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
            }
        }
    }
}

/// Sink writing to the terminal.
///
/// Errors and warnings go to stderr, info to stdout, and verbose or debug
/// chatter to stderr so it never mixes with data on stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    level: Severity,
    color: bool,
}

impl ConsoleSink {
    pub fn new(level: Severity, color: ColorChoice) -> Self {
        Self {
            level,
            color: color.enabled(),
        }
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    fn decorate(&self, severity: Severity, message: &str) -> String {
        match (severity, self.color) {
            (Severity::Error, true) => format!("{} {}", "✗".red().bold(), message),
            (Severity::Error, false) => format!("✗ {}", message),
            (Severity::Warning, true) => format!("{} {}", "⚠".yellow().bold(), message),
            (Severity::Warning, false) => format!("⚠ {}", message),
            (Severity::Info, _) => message.to_string(),
            (_, true) => format!("{}", message.dimmed()),
            (_, false) => message.to_string(),
        }
    }
}

impl MessageSink for ConsoleSink {
    fn emit(&self, severity: Severity, message: &str) {
        if severity > self.level {
            return;
        }

        let line = self.decorate(severity, message);
        match severity {
            Severity::Info => println!("{}", line),
            _ => eprintln!("{}", line),
        }
    }
}

/// Sink that records messages instead of printing them.
///
/// Clones share one message log.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    messages: std::rc::Rc<std::cell::RefCell<Vec<(Severity, String)>>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.borrow().clone()
    }

    /// Messages of exactly `severity`, in emission order.
    pub fn at(&self, severity: Severity) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.borrow().iter().any(|(_, m)| m.contains(needle))
    }
}

#[cfg(test)]
impl MessageSink for MemorySink {
    fn emit(&self, severity: Severity, message: &str) {
        self.messages
            .borrow_mut()
            .push((severity, message.to_string()));
    }
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Pretty,
        }
    }
}

/// Trait for types that can be formatted for CLI output
pub trait Formattable: Serialize {
    /// Format the type for pretty (human-readable) output
    fn format_pretty(&self) -> String;
}

/// Format a single item for output
pub fn format_output<T: Formattable>(item: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Pretty => Ok(item.format_pretty()),
        OutputFormat::Json => serde_json::to_string_pretty(item)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e)),
        OutputFormat::Yaml => {
            serde_yaml::to_string(item).map_err(|e| format!("Failed to serialize to YAML: {}", e))
        }
    }
}
