//! Application context that holds resolved settings and host facts.
//!
//! Settings are resolved in this order, later layers winning:
//! 1. Default values
//! 2. Config file values
//! 3. Environment variables
//! 4. CLI flags
//!
//! Once built, the context is passed read-only to the dispatcher.

use libstevedore::config::{Settings, Verbosity};
use libstevedore::registry::SearchApi;
use libstevedore::{HostInfo, Result};
use std::path::PathBuf;

/// Values given on the command line that override loaded settings.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub repository: Option<PathBuf>,
    pub index_url: Option<String>,
    pub registry_url: Option<String>,
    pub search_api: Option<SearchApi>,
    pub verbosity: Option<Verbosity>,
}

/// Application context with resolved settings and runtime facts
#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub host: HostInfo,
}

impl AppContext {
    /// Loads settings, applies the CLI overrides and detects the host.
    pub fn build(overrides: Overrides) -> Result<Self> {
        let settings = Settings::load(overrides.config.as_deref())?;
        Ok(Self::new(apply(settings, overrides), HostInfo::detect()))
    }

    pub fn new(settings: Settings, host: HostInfo) -> Self {
        Self { settings, host }
    }
}

fn apply(mut settings: Settings, overrides: Overrides) -> Settings {
    if let Some(repository) = overrides.repository {
        settings.repository = repository;
    }
    if let Some(url) = overrides.index_url {
        settings.index_url = url;
    }
    if let Some(url) = overrides.registry_url {
        settings.registry_url = url;
    }
    if let Some(api) = overrides.search_api {
        settings.search_api = api;
    }
    if let Some(verbosity) = overrides.verbosity {
        settings.verbosity = verbosity;
    }
    settings
}
