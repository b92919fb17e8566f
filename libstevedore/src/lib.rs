//! Stevedore - user-space container image management library
//!
//! This crate holds everything below the command line: image references,
//! the credential keystore, the registry search client, the local image
//! repository, host facts and settings.
//!
//! # Quick Start
//!
//! ```no_run
//! use libstevedore::config::Settings;
//! use libstevedore::store::{FsImageStore, LocalImageStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load(None)?;
//!     let store = FsImageStore::new(&settings.repository);
//!
//!     for image in store.list_images() {
//!         println!("{}", image.reference);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Main Types
//!
//! - [`ImageReference`] - `repository:tag` pairs resolved from user input
//! - [`RegistryClient`] / [`HttpRegistryClient`] - paginated registry search
//! - [`LocalImageStore`] / [`FsImageStore`] - the on-disk image repository
//! - [`CredentialStore`] / [`FileCredentialStore`] - per-registry credentials
//! - [`HostInfo`] - user and platform facts
//! - [`Settings`] - layered configuration

#![warn(clippy::all)]

/// Returns the libstevedore crate version.
///
/// # Examples
///
/// ```
/// let version = libstevedore::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use auth::{CredentialRecord, CredentialStore, Credentials, FileCredentialStore};
pub use config::Settings;
pub use digest::Digest;
pub use error::{Result, StevedoreError};
pub use host::HostInfo;
pub use reference::ImageReference;
pub use registry::{HttpRegistryClient, RegistryClient, SearchPage};
pub use store::{FsImageStore, ImportExportRequest, LocalImageStore};

pub mod auth;
pub mod config;
pub mod digest;
pub mod error;
pub mod format;
pub mod host;
pub mod reference;
pub mod registry;
pub mod store;
