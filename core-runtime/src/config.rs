//! # Core Configuration Module
//!
//! Provides configuration management for the catalog player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding the catalog API location, paging sizes and the injected
//! `HttpClient`. Validation is fail-fast: `build()` refuses values the
//! catalog API would reject.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - required unless the `desktop-shims` feature is enabled, in
//!   which case `bridge_desktop::ReqwestHttpClient` is injected.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{AlbumSort, CoreConfig, SortOrder};
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://music.example.com")
//!     .albums_per_page(24)
//!     .album_sort(AlbumSort::new("release_year", SortOrder::Desc))
//!     .build()?;
//! ```
//!
//! ## Environment overrides
//!
//! [`CoreConfigBuilder::with_env`] overlays `CPC_API_BASE_URL` and
//! `CPC_PER_PAGE` on top of whatever was set explicitly.

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::HttpClient;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000";
pub const DEFAULT_ALBUMS_PER_PAGE: u32 = 20;
pub const DEFAULT_GENRES_PER_PAGE: u32 = 50;
/// Largest page size the catalog API accepts.
pub const MAX_PER_PAGE: u32 = 100;

pub const ENV_API_BASE_URL: &str = "CPC_API_BASE_URL";
pub const ENV_PER_PAGE: &str = "CPC_PER_PAGE";

/// Sort direction for album listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side ordering requested for album pages.
///
/// The cursor is only meaningful for the ordering that produced it, so a
/// sort is fixed for the lifetime of a config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSort {
    pub sort_by: String,
    pub order: SortOrder,
}

impl AlbumSort {
    pub fn new(sort_by: impl Into<String>, order: SortOrder) -> Self {
        Self {
            sort_by: sort_by.into(),
            order,
        }
    }
}

/// Core configuration for the catalog player.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Root of the catalog API, without the `/api` prefix. Always ends in
    /// `/` and carries no query or fragment.
    pub api_base_url: Url,

    /// Albums requested per page
    pub albums_per_page: u32,

    /// Genres requested for the genre bar
    pub genres_per_page: u32,

    /// Optional server-side ordering for album pages
    pub album_sort: Option<AlbumSort>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    /// HTTP client for catalog requests
    pub http_client: Arc<dyn HttpClient>,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("albums_per_page", &self.albums_per_page)
            .field("genres_per_page", &self.genres_per_page)
            .field("album_sort", &self.album_sort)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Builds a config from defaults plus environment overrides.
    pub fn from_env() -> Result<CoreConfig> {
        Self::builder().with_env()?.build()
    }

    /// Absolute URL of an API path, e.g. `api_url("/albums")`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}api{}", self.api_base_url, path)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The base URL is an absolute http(s) URL
    /// - Page sizes are within `1..=MAX_PER_PAGE`
    /// - The event buffer is non-empty
    /// - A sort, when given, names a field
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.api_base_url.scheme(), "http" | "https")
            || self.api_base_url.host_str().is_none()
        {
            return Err(Error::Config(format!(
                "API base URL must be an absolute http(s) URL, got '{}'",
                self.api_base_url
            )));
        }

        validate_per_page("Albums per page", self.albums_per_page)?;
        validate_per_page("Genres per page", self.genres_per_page)?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if let Some(sort) = &self.album_sort {
            if sort.sort_by.trim().is_empty() {
                return Err(Error::Config(
                    "Album sort field cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        Error::Config(format!("Invalid API base URL '{}': {}", raw, e))
    })?;
    Ok(normalize_base_url(url))
}

/// Strip query and fragment and make the path a directory, so that relative
/// references resolve beneath the API root instead of replacing its last
/// segment.
pub fn normalize_base_url(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn validate_per_page(name: &str, value: u32) -> Result<()> {
    if value == 0 || value > MAX_PER_PAGE {
        return Err(Error::Config(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_PER_PAGE, value
        )));
    }
    Ok(())
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for catalog requests. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Web view / mobile: inject the host's fetch implementation."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: format!("Failed to create default ReqwestHttpClient: {}", e),
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    albums_per_page: Option<u32>,
    genres_per_page: Option<u32>,
    album_sort: Option<AlbumSort>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl CoreConfigBuilder {
    /// Sets the API root. A path is kept and treated as a directory, so
    /// `https://host/music` and `https://host/music/` are equivalent.
    ///
    /// Default: `http://localhost:4000`
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .api_base_url("https://music.example.com/");
    /// ```
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the number of albums requested per page.
    ///
    /// Default: 20
    pub fn albums_per_page(mut self, per_page: u32) -> Self {
        self.albums_per_page = Some(per_page);
        self
    }

    /// Sets the number of genres requested for the genre bar.
    ///
    /// Default: 50
    pub fn genres_per_page(mut self, per_page: u32) -> Self {
        self.genres_per_page = Some(per_page);
        self
    }

    pub fn album_sort(mut self, sort: AlbumSort) -> Self {
        self.album_sort = Some(sort);
        self
    }

    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Overlays `CPC_API_BASE_URL` and `CPC_PER_PAGE` from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnv`] when `CPC_PER_PAGE` is not a number.
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Same as [`with_env`](Self::with_env) with an explicit variable lookup.
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = Some(url.trim().to_string());
        }

        if let Some(raw) = lookup(ENV_PER_PAGE) {
            let per_page = raw.trim().parse::<u32>().map_err(|_| Error::InvalidEnv {
                key: ENV_PER_PAGE.to_string(),
                value: raw.clone(),
            })?;
            self.albums_per_page = Some(per_page);
        }

        Ok(self)
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No `HttpClient` is available
    /// - The API base URL does not parse
    /// - Any value fails [`CoreConfig::validate`]
    pub fn build(self) -> Result<CoreConfig> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let api_base_url = parse_base_url(
            self.api_base_url
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE_URL),
        )?;

        let config = CoreConfig {
            api_base_url,
            albums_per_page: self.albums_per_page.unwrap_or(DEFAULT_ALBUMS_PER_PAGE),
            genres_per_page: self.genres_per_page.unwrap_or(DEFAULT_GENRES_PER_PAGE),
            album_sort: self.album_sort,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
        };

        config.validate()?;

        Ok(config)
    }
}
