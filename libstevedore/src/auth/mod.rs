//! Registry credentials.
//!
//! This module holds the credential types passed between the command layer,
//! the credential store and the registry client. Storage lives in
//! [`store`].

use std::fmt;

mod store;
pub use store::{CredentialStore, FileCredentialStore};


#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;

/// Credentials for registry authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// No authentication required (anonymous access)
    Anonymous,

    /// HTTP Basic authentication with username and password
    Basic {
        /// Username for authentication
        username: String,
        /// Password for authentication
        password: String,
    },
}

impl Credentials {
    /// Creates anonymous credentials.
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Creates Basic authentication credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::auth::Credentials;
    ///
    /// let creds = Credentials::basic("username", "password");
    /// assert!(matches!(creds, Credentials::Basic { .. }));
    /// ```
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the Authorization header value for these credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::auth::Credentials;
    ///
    /// let creds = Credentials::basic("user", "pass");
    /// assert_eq!(creds.to_header_value().as_deref(), Some("Basic dXNlcjpwYXNz"));
    /// assert!(Credentials::anonymous().to_header_value().is_none());
    /// ```
    pub fn to_header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Basic { username, password } => {
                use base64::{Engine as _, engine::general_purpose};
                let credentials = format!("{}:{}", username, password);
                let encoded = general_purpose::STANDARD.encode(credentials);
                Some(format!("Basic {}", encoded))
            }
        }
    }
}

/// A credential kept for one registry host.
///
/// The command layer only passes these through; the secret is never shown by
/// `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Registry host the credential belongs to (e.g. `registry-1.docker.io`)
    pub registry_host: String,
    /// Account name
    pub username: String,
    /// Password or token
    pub secret: String,
}

impl CredentialRecord {
    /// Creates a new record.
    pub fn new(
        registry_host: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            registry_host: registry_host.into(),
            username: username.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("registry_host", &self.registry_host)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl From<CredentialRecord> for Credentials {
    fn from(record: CredentialRecord) -> Self {
        Credentials::basic(record.username, record.secret)
    }
}
