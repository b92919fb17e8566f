//! Read-only option bag handed to command handlers.

use clap::ArgMatches;
use clap::parser::ValueSource;

/// Ordered `(name, values)` pairs for one command invocation.
///
/// Built once from clap's matches and never mutated by handlers. Values that
/// only exist because of a clap default are left out, so a handler can tell
/// "not given" apart from "given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    entries: Vec<(String, Vec<String>)>,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the explicitly supplied arguments of a (sub)command.
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let mut entries = Vec::new();
        for id in matches.ids() {
            let name = id.as_str();
            if matches!(matches.value_source(name), Some(ValueSource::DefaultValue) | None) {
                continue;
            }

            let values = match matches.try_get_raw(name) {
                Ok(Some(raw)) => raw.map(|v| v.to_string_lossy().into_owned()).collect(),
                _ => Vec::new(),
            };
            entries.push((name.to_string(), values));
        }
        Self { entries }
    }

    /// Adds a single-valued option.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.entries.push((name.to_string(), vec![value.into()]));
        self
    }

    /// Adds a switch.
    pub fn with_flag(mut self, name: &str) -> Self {
        self.entries.push((name.to_string(), Vec::new()));
        self
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entry(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value of `name`, in the order given.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entry(name).unwrap_or_default()
    }

    /// True when the switch `name` was given.
    pub fn flag(&self, name: &str) -> bool {
        match self.entry(name) {
            Some(values) => values.first().is_none_or(|v| v != "false"),
            None => false,
        }
    }

    /// Names from `required` that were not given or are blank.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| self.get(name).is_none_or(|v| v.trim().is_empty()))
            .collect()
    }

    fn entry(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, values)| values.as_slice())
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
