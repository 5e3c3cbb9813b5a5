//! Runtime configuration
//!
//! Read from the environment (a `.env` file is loaded by the binary via
//! `dotenvy`). Every setting has a default so an empty environment works
//! against the public demo API.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::query::DEFAULT_PAGE_SIZE;
use crate::services::debounce::DEFAULT_DEBOUNCE;
use crate::services::query_cache::DEFAULT_STALE_AFTER;

/// Environment variable for the products API base URL
const ENV_API_BASE_URL: &str = "CATALOG_API_BASE_URL";

/// Environment variable for products per page
const ENV_PAGE_SIZE: &str = "CATALOG_PAGE_SIZE";

/// Environment variable for the cache staleness window
const ENV_STALE_AFTER: &str = "CATALOG_STALE_AFTER_SECS";

/// Environment variable for the optional cache entry bound
const ENV_CACHE_MAX_ENTRIES: &str = "CATALOG_CACHE_MAX_ENTRIES";

/// Environment variable for the search input quiet period
const ENV_SEARCH_DEBOUNCE: &str = "CATALOG_SEARCH_DEBOUNCE_MS";

/// Environment variable for the HTTP request timeout
const ENV_HTTP_TIMEOUT: &str = "CATALOG_HTTP_TIMEOUT_SECS";

const DEFAULT_API_BASE_URL: &str = "https://dummyjson.com";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub api_base_url: String,
    pub page_size: u32,
    pub stale_after: Duration,
    /// `None` keeps every entry until it is replaced or purged
    pub cache_max_entries: Option<usize>,
    pub search_debounce: Duration,
    pub http_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            stale_after: DEFAULT_STALE_AFTER,
            cache_max_entries: None,
            search_debounce: DEFAULT_DEBOUNCE,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl CatalogConfig {
    /// Build configuration from the process environment
    ///
    /// # Environment Variables
    ///
    /// * `CATALOG_API_BASE_URL` - products API root (default: https://dummyjson.com)
    /// * `CATALOG_PAGE_SIZE` - products per page (default: 10)
    /// * `CATALOG_STALE_AFTER_SECS` - cache staleness window (default: 300)
    /// * `CATALOG_CACHE_MAX_ENTRIES` - LRU bound on cached pages (default: unbounded)
    /// * `CATALOG_SEARCH_DEBOUNCE_MS` - search input quiet period (default: 300)
    /// * `CATALOG_HTTP_TIMEOUT_SECS` - request timeout (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_base_url = get(ENV_API_BASE_URL)
            .map(|url| url.trim().to_string())
            .unwrap_or(defaults.api_base_url);

        let page_size = match get(ENV_PAGE_SIZE) {
            Some(raw) => parse(ENV_PAGE_SIZE, &raw)?,
            None => defaults.page_size,
        };
        if page_size == 0 {
            return Err(ConfigError::Zero(ENV_PAGE_SIZE));
        }

        let stale_after = match get(ENV_STALE_AFTER) {
            Some(raw) => Duration::from_secs(parse(ENV_STALE_AFTER, &raw)?),
            None => defaults.stale_after,
        };

        let cache_max_entries = match get(ENV_CACHE_MAX_ENTRIES) {
            Some(raw) => {
                let max: usize = parse(ENV_CACHE_MAX_ENTRIES, &raw)?;
                if max == 0 {
                    return Err(ConfigError::Zero(ENV_CACHE_MAX_ENTRIES));
                }
                Some(max)
            }
            None => None,
        };

        let search_debounce = match get(ENV_SEARCH_DEBOUNCE) {
            Some(raw) => Duration::from_millis(parse(ENV_SEARCH_DEBOUNCE, &raw)?),
            None => defaults.search_debounce,
        };

        let http_timeout = match get(ENV_HTTP_TIMEOUT) {
            Some(raw) => Duration::from_secs(parse(ENV_HTTP_TIMEOUT, &raw)?),
            None => defaults.http_timeout,
        };

        Ok(Self {
            api_base_url,
            page_size,
            stale_after,
            cache_max_entries,
            search_debounce,
            http_timeout,
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: raw.to_string(),
    })
}
