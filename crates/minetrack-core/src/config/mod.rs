//! Remote API configuration.
//!
//! Provides `RemoteConfig`, used by the sync engine and draft queue to reach
//! the directory and report endpoints. Values come from explicit settings or
//! from `MINETRACK_*` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::remote::RemoteError;
use crate::util::{is_http_url, normalize_text_option};

pub const API_BASE_URL_ENV: &str = "MINETRACK_API_BASE_URL";
pub const PAGE_SIZE_ENV: &str = "MINETRACK_PAGE_SIZE";
pub const ACCESS_TOKEN_ENV: &str = "MINETRACK_ACCESS_TOKEN";

/// Page size used when downloading a full category.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the remote directory and report API.
///
/// The access token comes from the (external) auth layer and is never
/// written back to disk.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub api_base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("api_base_url", &self.api_base_url)
            .field("page_size", &self.page_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl RemoteConfig {
    /// Build a config for the given base URL with default page size and timeout.
    pub fn new(api_base_url: &str) -> Result<Self, RemoteError> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url)?,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            access_token: None,
        })
    }

    /// Override the download page size. Zero is rejected.
    pub fn with_page_size(mut self, page_size: usize) -> Result<Self, RemoteError> {
        if page_size == 0 {
            return Err(RemoteError::InvalidConfiguration(
                "page size must be greater than zero".to_string(),
            ));
        }
        self.page_size = page_size;
        Ok(self)
    }

    #[must_use]
    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = normalize_text_option(access_token);
        self
    }

    /// Load from `MINETRACK_*` environment variables.
    ///
    /// Returns `Ok(None)` when no base URL is configured.
    pub fn from_env() -> Result<Option<Self>, RemoteError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, RemoteError> {
        let Some(base_url) = normalize_text_option(lookup(API_BASE_URL_ENV)) else {
            return Ok(None);
        };

        let mut config = Self::new(&base_url)?;
        if let Some(raw) = normalize_text_option(lookup(PAGE_SIZE_ENV)) {
            let page_size = raw.parse::<usize>().map_err(|error| {
                RemoteError::InvalidConfiguration(format!("{PAGE_SIZE_ENV}='{raw}': {error}"))
            })?;
            config = config.with_page_size(page_size)?;
        }
        Ok(Some(config.with_access_token(lookup(ACCESS_TOKEN_ENV))))
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Trim and validate an API base URL.
pub fn normalize_base_url(raw: &str) -> Result<String, RemoteError> {
    let base = raw.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "API base URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(base) {
        return Err(RemoteError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(base.to_string())
}
