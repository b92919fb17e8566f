//! Remote registry access.
//!
//! The command layer talks to registries through [`RegistryClient`] only.
//! [`HttpRegistryClient`] is the production implementation; it understands
//! two search flavours, the v1 index search API and the v2 catalog.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

mod http;
pub use http::{ClientConfig, HttpRegistryClient};

#[cfg(test)]
mod tests;

/// Operations the command layer needs from a registry.
pub trait RegistryClient {
    /// Fetches one page of search results for `term`.
    ///
    /// `page_idx` is 0-based and increases by one per call within a search.
    /// Returns `None` when the page could not be fetched.
    fn search_get_page(&mut self, term: &str, page_idx: usize) -> Option<SearchPage>;

    /// Returns true once the last page of the current search was delivered.
    fn search_ended(&self) -> bool;

    /// Naming policy for repository names, used by reference resolution.
    fn is_repo_name(&self, name: &str) -> bool;
}

/// Which search API a client queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchApi {
    /// v1 index search (`/v1/search`), returns `results`
    #[default]
    Index,
    /// v2 catalog listing (`/v2/_catalog`), returns `repositories`
    Catalog,
}

/// One entry of a v1 search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "star_count")]
    pub stars: u64,
    #[serde(default)]
    pub is_official: bool,
    #[serde(default)]
    pub is_automated: bool,
}

/// A single page of search output, shaped by the API that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPage {
    /// A page carrying a `results` key
    V1 { results: Vec<SearchHit> },
    /// A page carrying a `repositories` key
    V2 { repositories: Vec<String> },
    /// A page with neither key
    Unrecognized,
}

impl SearchPage {
    /// Classifies a decoded response body by the keys it exposes.
    ///
    /// Entries that do not decode are skipped rather than failing the page.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::registry::SearchPage;
    /// use serde_json::json;
    ///
    /// let page = SearchPage::from_json(&json!({"repositories": ["alpine"]}));
    /// assert_eq!(page, SearchPage::V2 { repositories: vec!["alpine".to_string()] });
    ///
    /// assert_eq!(SearchPage::from_json(&json!({"zzz": 1})), SearchPage::Unrecognized);
    /// ```
    pub fn from_json(body: &Value) -> Self {
        if let Some(results) = body.get("results").and_then(Value::as_array) {
            let results = results
                .iter()
                .filter_map(|hit| serde_json::from_value(hit.clone()).ok())
                .collect();
            return Self::V1 { results };
        }

        if let Some(repositories) = body.get("repositories").and_then(Value::as_array) {
            let repositories = repositories
                .iter()
                .filter_map(|name| name.as_str().map(str::to_string))
                .collect();
            return Self::V2 { repositories };
        }

        Self::Unrecognized
    }

    /// Returns true when the page carries no entries.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::V1 { results } => results.is_empty(),
            Self::V2 { repositories } => repositories.is_empty(),
            Self::Unrecognized => true,
        }
    }
}

/// Extracts the `host[:port]` part of a registry URL or bare host name.
///
/// This is the key credentials are stored under.
///
/// # Examples
///
/// ```
/// use libstevedore::registry::registry_host;
///
/// assert_eq!(registry_host("https://index.docker.io/v1").as_deref(), Some("index.docker.io"));
/// assert_eq!(registry_host("localhost:5000").as_deref(), Some("localhost:5000"));
/// assert_eq!(registry_host("   "), None);
/// ```
pub fn registry_host(url_or_host: &str) -> Option<String> {
    let trimmed = url_or_host.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
