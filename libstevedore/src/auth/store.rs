//! Credential storage for registry logins.
//!
//! The file-based implementation keeps one TOML keystore with restricted
//! permissions (0600). It re-reads the file on every call, so no state is
//! carried between invocations.

use crate::auth::CredentialRecord;
use crate::error::{Result, StevedoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Trait for storing and retrieving registry credentials.
///
/// The command layer depends on this trait only, so tests can substitute an
/// in-memory fake.
pub trait CredentialStore {
    /// Stores (or replaces) the credential for a registry host.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore cannot be read, parsed or written.
    fn put(&mut self, host: &str, username: &str, secret: &str) -> Result<()>;

    /// Retrieves the credential for a registry host, if one is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore cannot be read or an entry is malformed.
    fn get(&self, host: &str) -> Result<Option<CredentialRecord>>;

    /// Removes the credential for a registry host.
    ///
    /// Removing a host that has no credential is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore cannot be read or written.
    fn delete(&mut self, host: &str) -> Result<()>;

    /// Removes every stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore cannot be removed.
    fn erase(&mut self) -> Result<()>;

    /// Lists the registry hosts that have stored credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore cannot be read.
    fn list(&self) -> Result<Vec<String>>;
}

/// Stored credential representation for serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct StoredCredential {
    /// Account name
    username: String,
    /// Secret, base64 encoded
    secret: String,
}

/// File-based credential store.
///
/// Secrets are base64 encoded for basic obfuscation only.
///
/// # Examples
///
/// ```no_run
/// use libstevedore::auth::{CredentialStore, FileCredentialStore};
/// use std::path::PathBuf;
///
/// # fn example() -> libstevedore::error::Result<()> {
/// let mut store = FileCredentialStore::new(PathBuf::from("/home/user/.stevedore/keystore.toml"));
/// store.put("registry-1.docker.io", "alice", "hunter2")?;
/// assert!(store.get("registry-1.docker.io")?.is_some());
/// store.delete("registry-1.docker.io")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store backed by the keystore at `path`.
    ///
    /// Nothing is read or created until the first operation.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the keystore path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, StoredCredential>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| {
            StevedoreError::config_with_source("Failed to read keystore", self.path.to_str(), e)
        })?;

        toml::from_str(&contents).map_err(|e| {
            StevedoreError::config_with_source("Failed to parse keystore", self.path.to_str(), e)
        })
    }

    fn save(&self, credentials: &BTreeMap<String, StoredCredential>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StevedoreError::config_with_source(
                    "Failed to create keystore directory",
                    parent.to_str(),
                    e,
                )
            })?;
        }

        let contents = toml::to_string_pretty(credentials).map_err(|e| {
            StevedoreError::config_with_source("Failed to serialize keystore", self.path.to_str(), e)
        })?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options
            .open(&self.path)
            .and_then(|mut file| file.write_all(contents.as_bytes()))
            .map_err(|e| {
                StevedoreError::config_with_source("Failed to write keystore", self.path.to_str(), e)
            })?;

        // the creation mode does not apply to a keystore that already existed
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, permissions).map_err(|e| {
                StevedoreError::config_with_source(
                    "Failed to set keystore permissions",
                    self.path.to_str(),
                    e,
                )
            })?;
        }

        Ok(())
    }

    fn encode(username: &str, secret: &str) -> StoredCredential {
        use base64::{Engine as _, engine::general_purpose};
        StoredCredential {
            username: username.to_string(),
            secret: general_purpose::STANDARD.encode(secret),
        }
    }

    fn decode(host: &str, stored: &StoredCredential) -> Result<CredentialRecord> {
        use base64::{Engine as _, engine::general_purpose};
        let decoded = general_purpose::STANDARD
            .decode(&stored.secret)
            .map_err(|e| StevedoreError::validation_with_source("Malformed keystore entry", e))?;

        let secret = String::from_utf8(decoded)
            .map_err(|e| StevedoreError::validation_with_source("Invalid secret encoding", e))?;

        Ok(CredentialRecord::new(host, stored.username.clone(), secret))
    }
}

impl CredentialStore for FileCredentialStore {
    fn put(&mut self, host: &str, username: &str, secret: &str) -> Result<()> {
        let mut credentials = self.load()?;
        credentials.insert(host.to_string(), Self::encode(username, secret));
        self.save(&credentials)?;
        debug!(host, keystore = %self.path.display(), "stored credential");
        Ok(())
    }

    fn get(&self, host: &str) -> Result<Option<CredentialRecord>> {
        match self.load()?.get(host) {
            Some(stored) => Ok(Some(Self::decode(host, stored)?)),
            None => Ok(None),
        }
    }

    fn delete(&mut self, host: &str) -> Result<()> {
        let mut credentials = self.load()?;
        if credentials.remove(host).is_some() {
            self.save(&credentials)?;
            debug!(host, "removed credential");
        }
        Ok(())
    }

    fn erase(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                StevedoreError::config_with_source("Failed to remove keystore", self.path.to_str(), e)
            })?;
        }
        debug!(keystore = %self.path.display(), "erased keystore");
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }
}
