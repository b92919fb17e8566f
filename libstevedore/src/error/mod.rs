//! Error types for Stevedore
//!
//! Every fallible library operation returns [`StevedoreError`]. The command
//! layer never lets these escape; it turns them into an exit status and a
//! user-facing message.

use std::path::Path;
use thiserror::Error;


/// Main error type for Stevedore operations
#[derive(Error, Debug)]
pub enum StevedoreError {
    /// Network-related errors (connection, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication errors (401, 403, rejected credentials)
    #[error("Authentication error (status: {status_code:?}): {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    /// Resource not found errors (unknown image, missing archive member)
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// Validation errors (malformed archive, digest mismatch, bad reference)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid config file, unreadable keystore)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Local storage errors (repository tree, layer files, archives)
    #[error("Storage error: {message}{}", path_suffix(.path))]
    Storage {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

fn path_suffix(path: &Option<String>) -> String {
    path.as_deref()
        .map(|p| format!(" ({})", p))
        .unwrap_or_default()
}

/// Result type alias for Stevedore operations
pub type Result<T> = std::result::Result<T, StevedoreError>;

impl StevedoreError {
    /// Creates a new network error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::error::StevedoreError;
    ///
    /// let err = StevedoreError::network("connection refused");
    /// assert!(matches!(err, StevedoreError::Network { .. }));
    /// ```
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new network error with a source error.
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new authentication error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::error::StevedoreError;
    ///
    /// let err = StevedoreError::authentication("invalid credentials", Some(401));
    /// assert!(matches!(err, StevedoreError::Authentication { .. }));
    /// ```
    pub fn authentication<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::Authentication {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new not found error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::error::StevedoreError;
    ///
    /// let err = StevedoreError::not_found("image", "alpine:latest");
    /// assert!(matches!(err, StevedoreError::NotFound { .. }));
    /// ```
    pub fn not_found<R, N>(resource_type: R, name: N) -> Self
    where
        R: Into<String>,
        N: Into<String>,
    {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error with a source error.
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::error::StevedoreError;
    ///
    /// let err = StevedoreError::config("invalid config file", Some("/path/to/config.toml"));
    /// assert!(matches!(err, StevedoreError::Config { .. }));
    /// ```
    pub fn config<S: Into<String>>(message: S, path: Option<S>) -> Self {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    pub fn config_with_source<S, P, E>(message: S, path: Option<P>, source: E) -> Self
    where
        S: Into<String>,
        P: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new storage error for a path in the local repository.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::error::StevedoreError;
    /// use std::path::Path;
    ///
    /// let err = StevedoreError::storage("layer missing", Path::new("/repo/layers/abc"));
    /// assert!(err.to_string().contains("/repo/layers/abc"));
    /// ```
    pub fn storage<S: Into<String>>(message: S, path: &Path) -> Self {
        Self::Storage {
            message: message.into(),
            path: Some(path.display().to_string()),
            source: None,
        }
    }

    /// Creates a new storage error with a source error.
    pub fn storage_with_source<S, E>(message: S, path: &Path, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            path: Some(path.display().to_string()),
            source: Some(Box::new(source)),
        }
    }
}

impl From<config::ConfigError> for StevedoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::config_with_source("Failed to build configuration", None::<String>, err)
    }
}
