//! Blocking HTTP implementation of [`RegistryClient`].

use super::{RegistryClient, SearchApi, SearchPage};
use crate::auth::Credentials;
use crate::error::{Result, StevedoreError};
use oci_spec::distribution::Reference as OciReference;
use reqwest::StatusCode;
use reqwest::blocking::{Client as ReqwestClient, Response};
use reqwest::header::{AUTHORIZATION, LINK};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP registry client.
///
/// # Examples
///
/// ```
/// use libstevedore::registry::{ClientConfig, SearchApi};
///
/// let config = ClientConfig::new()
///     .with_registry_url("http://localhost:5000")
///     .with_api(SearchApi::Catalog)
///     .with_page_size(50);
/// assert_eq!(config.page_size, 50);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the v1 index (default: `https://index.docker.io/v1`)
    pub index_url: String,
    /// Base URL of the v2 registry (default: `https://registry-1.docker.io`)
    pub registry_url: String,
    /// Search flavour to use
    pub api: SearchApi,
    /// Results requested per page (default: 25)
    pub page_size: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Credentials sent with every request
    pub credentials: Credentials,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            index_url: "https://index.docker.io/v1".to_string(),
            registry_url: "https://registry-1.docker.io".to_string(),
            api: SearchApi::Index,
            page_size: 25,
            timeout_seconds: 30,
            credentials: Credentials::Anonymous,
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the v1 index URL.
    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into();
        self
    }

    /// Sets the v2 registry URL.
    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into();
        self
    }

    /// Selects the search API.
    pub fn with_api(mut self, api: SearchApi) -> Self {
        self.api = api;
        self
    }

    /// Sets the number of results requested per page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the credentials attached to requests.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Registry client speaking the v1 search and v2 catalog APIs over HTTP.
///
/// Calls block until the response arrives or the configured timeout expires.
#[derive(Debug)]
pub struct HttpRegistryClient {
    http_client: ReqwestClient,
    config: ClientConfig,
    ended: bool,
    catalog_cursor: Option<String>,
}

impl HttpRegistryClient {
    /// Creates a client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty URL and a network error if the
    /// HTTP client cannot be built.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::registry::{ClientConfig, HttpRegistryClient};
    ///
    /// let client = HttpRegistryClient::new(ClientConfig::new().with_registry_url("localhost:5000/")).unwrap();
    /// assert_eq!(client.registry_url(), "https://localhost:5000");
    /// ```
    pub fn new(mut config: ClientConfig) -> Result<Self> {
        config.index_url = normalize_url(&config.index_url)?;
        config.registry_url = normalize_url(&config.registry_url)?;

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("stevedore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StevedoreError::network_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http_client,
            config,
            ended: false,
            catalog_cursor: None,
        })
    }

    /// Returns the normalized v1 index URL.
    pub fn index_url(&self) -> &str {
        &self.config.index_url
    }

    /// Returns the normalized v2 registry URL.
    pub fn registry_url(&self) -> &str {
        &self.config.registry_url
    }

    fn search_index(&mut self, term: &str, page_idx: usize) -> Result<SearchPage> {
        let url = format!("{}/search", self.config.index_url);
        let wire_page = page_idx as u64 + 1;
        let query = [
            ("q", term.to_string()),
            ("n", self.config.page_size.to_string()),
            ("page", wire_page.to_string()),
        ];

        let body: Value = self
            .get(&url, &query)?
            .json()
            .map_err(|e| StevedoreError::validation_with_source("Malformed search response", e))?;

        let page = SearchPage::from_json(&body);
        let current = body.get("page").and_then(Value::as_u64).unwrap_or(wire_page);
        self.ended = match body.get("num_pages").and_then(Value::as_u64) {
            Some(total) => current >= total,
            None => page.is_empty(),
        };
        Ok(page)
    }

    fn search_catalog(&mut self, term: &str, page_idx: usize) -> Result<SearchPage> {
        if page_idx == 0 {
            self.catalog_cursor = None;
        }

        let url = format!("{}/v2/_catalog", self.config.registry_url);
        let mut query = vec![("n", self.config.page_size.to_string())];
        if let Some(last) = &self.catalog_cursor {
            query.push(("last", last.clone()));
        }

        let response = self.get(&url, &query)?;
        let has_next = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("rel=\"next\""));

        let body: Value = response
            .json()
            .map_err(|e| StevedoreError::validation_with_source("Malformed catalog response", e))?;

        match SearchPage::from_json(&body) {
            SearchPage::V2 { repositories } => {
                self.catalog_cursor = repositories.last().cloned();
                self.ended = !has_next || self.catalog_cursor.is_none();

                let needle = term.to_lowercase();
                let repositories = repositories
                    .into_iter()
                    .filter(|name| name.to_lowercase().contains(&needle))
                    .collect();
                Ok(SearchPage::V2 { repositories })
            }
            other => {
                self.ended = true;
                Ok(other)
            }
        }
    }

    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
        let mut request = self.http_client.get(url).query(query);
        if let Some(header) = self.config.credentials.to_header_value() {
            request = request.header(AUTHORIZATION, header);
        }

        debug!(url, "registry request");
        let response = request.send().map_err(|e| {
            StevedoreError::network_with_source(format!("Request to {} failed", url), e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StevedoreError::authentication(
                format!("Registry rejected request to {}", url),
                Some(status.as_u16()),
            ),
            StatusCode::NOT_FOUND => StevedoreError::not_found("endpoint", url),
            _ => StevedoreError::network(format!("{} returned {}", url, status)),
        })
    }
}

impl RegistryClient for HttpRegistryClient {
    fn search_get_page(&mut self, term: &str, page_idx: usize) -> Option<SearchPage> {
        let result = match self.config.api {
            SearchApi::Index => self.search_index(term, page_idx),
            SearchApi::Catalog => self.search_catalog(term, page_idx),
        };

        match result {
            Ok(page) => {
                debug!(term, page_idx, ended = self.ended, "search page fetched");
                Some(page)
            }
            Err(e) => {
                warn!(term, page_idx, error = %e, "search page fetch failed");
                self.ended = true;
                None
            }
        }
    }

    fn search_ended(&self) -> bool {
        self.ended
    }

    /// Accepts a repository name only: a tag or digest suffix is rejected,
    /// while a registry port in the first component is allowed.
    fn is_repo_name(&self, name: &str) -> bool {
        let last_component = name.rsplit('/').next().unwrap_or(name);
        !name.contains('@') && !last_component.contains(':') && OciReference::from_str(name).is_ok()
    }
}

/// Normalizes a URL by ensuring it has a scheme and removing trailing slashes.
fn normalize_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(StevedoreError::validation("Registry URL cannot be empty"));
    }

    let with_scheme = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };

    Ok(with_scheme.trim_end_matches('/').to_string())
}
