//! Image reference resolution.
//!
//! A raw user string such as `alpine`, `alpine:3.19` or
//! `localhost:5000/team/app:v2` is turned into a `(repository, tag)` pair.
//! Whether a repository name is acceptable is decided by a naming policy
//! supplied by the caller, normally [`RegistryClient::is_repo_name`]. The
//! parser itself never hardcodes that policy.
//!
//! [`RegistryClient::is_repo_name`]: crate::registry::RegistryClient::is_repo_name

use serde::{Deserialize, Serialize};
use std::fmt;


/// Tag used when a reference does not name one.
pub const DEFAULT_TAG: &str = "latest";

/// A resolved `(repository, tag)` pair identifying a container image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageReference {
    repository: String,
    tag: String,
}

impl ImageReference {
    /// Builds a reference from parts that are already known to be valid.
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Resolves a raw string into a reference.
    ///
    /// Returns `None` when nothing can be resolved: empty or whitespace-only
    /// input, an empty repository or tag, or a repository rejected by
    /// `is_repo_name`. Callers must treat `None` as a usage error and never
    /// fall back to defaults.
    ///
    /// The split happens once, on the last colon. A trailing segment that
    /// contains `/` belongs to a registry port, so it is not a tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::reference::ImageReference;
    ///
    /// let any_name = |_: &str| true;
    ///
    /// let r = ImageReference::resolve("alpine:3.19", any_name).unwrap();
    /// assert_eq!((r.repository(), r.tag()), ("alpine", "3.19"));
    ///
    /// let r = ImageReference::resolve("alpine", any_name).unwrap();
    /// assert_eq!(r.tag(), "latest");
    ///
    /// assert!(ImageReference::resolve("   ", any_name).is_none());
    /// ```
    pub fn resolve<F>(raw: &str, is_repo_name: F) -> Option<Self>
    where
        F: Fn(&str) -> bool,
    {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let (repository, tag) = match raw.rsplit_once(':') {
            Some((repository, tag)) if !tag.contains('/') => (repository, tag),
            _ => (raw, DEFAULT_TAG),
        };

        if repository.is_empty() || tag.is_empty() || !is_repo_name(repository) {
            return None;
        }

        Some(Self::new(repository, tag))
    }

    /// Resolves a string that comes from trusted metadata (archive manifests,
    /// stored images) where no naming policy applies.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::resolve(raw, |_| true)
    }

    /// Returns the repository part of the reference.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the tag part of the reference.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
