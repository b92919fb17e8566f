//! Application settings.
//!
//! Settings are layered with the `config` crate: built-in defaults, then the
//! TOML configuration file, then `STEVEDORE_*` environment variables. The
//! command line applies its own overrides on top of the loaded value.

use crate::auth::Credentials;
use crate::error::{Result, StevedoreError};
use crate::registry::{ClientConfig, SearchApi, registry_host};
use config::builder::DefaultState;
use config::{Config as ConfigRs, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};


/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV: &str = "STEVEDORE_CONFIG";

const ENV_PREFIX: &str = "STEVEDORE";

/// How much user-facing output is shown. Ordered from least to most chatty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Error,
    Warning,
    #[default]
    Info,
    Verbose,
    Debug,
}

/// Root settings structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Root of the local image repository
    #[serde(default = "default_repository")]
    pub repository: PathBuf,

    /// Credential keystore; relative paths live under the repository
    #[serde(default = "default_keystore")]
    pub keystore: PathBuf,

    #[serde(default = "default_index_url")]
    pub index_url: String,

    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    #[serde(default)]
    pub search_api: SearchApi,

    #[serde(default = "default_search_page_size")]
    pub search_page_size: usize,

    /// Network timeout in seconds
    #[serde(default = "default_network_timeout")]
    pub network_timeout: u64,

    #[serde(default)]
    pub verbosity: Verbosity,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            keystore: default_keystore(),
            index_url: default_index_url(),
            registry_url: default_registry_url(),
            search_api: SearchApi::default(),
            search_page_size: default_search_page_size(),
            network_timeout: default_network_timeout(),
            verbosity: Verbosity::default(),
        }
    }
}

fn default_repository() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stevedore")
}

fn default_keystore() -> PathBuf {
    PathBuf::from("keystore.toml")
}

fn default_index_url() -> String {
    "https://index.docker.io/v1".to_string()
}

fn default_registry_url() -> String {
    "https://registry-1.docker.io".to_string()
}

fn default_search_page_size() -> usize {
    25
}

fn default_network_timeout() -> u64 {
    30
}

impl Settings {
    /// Parses settings from a TOML string on top of the defaults.
    ///
    /// Environment variables are not consulted.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let builder = Self::defaults()?.add_source(File::from_str(s, FileFormat::Toml));
        Self::from_builder(builder)
    }

    /// Loads settings from `path`, or from [`config_path`] when `None`.
    ///
    /// An explicit path must exist. The default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).format(FileFormat::Toml).required(true),
            None => File::from(config_path()).format(FileFormat::Toml).required(false),
        };

        let builder = Self::defaults()?.add_source(file).add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .ignore_empty(true),
        );

        Self::from_builder(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(ConfigRs::builder().add_source(ConfigRs::try_from(&Settings::default())?))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                StevedoreError::config_with_source("Failed to load settings", None::<String>, e)
            })
    }

    /// Returns the keystore location, resolved against the repository.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::config::Settings;
    /// use std::path::PathBuf;
    ///
    /// let settings = Settings {
    ///     repository: PathBuf::from("/srv/images"),
    ///     ..Settings::default()
    /// };
    /// assert_eq!(settings.keystore_path(), PathBuf::from("/srv/images/keystore.toml"));
    /// ```
    pub fn keystore_path(&self) -> PathBuf {
        if self.keystore.is_absolute() {
            self.keystore.clone()
        } else {
            self.repository.join(&self.keystore)
        }
    }

    /// Host credentials for the index are stored under.
    pub fn index_host(&self) -> Option<String> {
        registry_host(&self.index_url)
    }

    /// Host of the v2 registry.
    pub fn registry_host(&self) -> Option<String> {
        registry_host(&self.registry_url)
    }

    /// Builds the registry client configuration these settings describe.
    pub fn client_config(&self, credentials: Credentials) -> ClientConfig {
        ClientConfig::new()
            .with_index_url(self.index_url.clone())
            .with_registry_url(self.registry_url.clone())
            .with_api(self.search_api)
            .with_page_size(self.search_page_size)
            .with_timeout(self.network_timeout)
            .with_credentials(credentials)
    }
}

/// Location of the configuration file.
///
/// `$STEVEDORE_CONFIG` wins; otherwise `<config dir>/stevedore/config.toml`.
pub fn config_path() -> PathBuf {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stevedore")
        .join("config.toml")
}
