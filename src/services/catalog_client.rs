//! Remote catalog client
//!
//! Maps [`QueryParams`] onto the products API and decodes its responses.
//! Holds no query state; the only memoisation is the category list, which
//! changes rarely and is kept for an hour.

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::models::product::{Category, ListingResult};
use crate::models::query::{DEFAULT_PAGE_SIZE, QueryParams, SortField, SortOrder};

const CATEGORIES_CACHE_KEY: &str = "categories";

/// How long the category list is reused before asking the server again
const CATEGORIES_TTL: Duration = Duration::from_secs(3600);

/// Longest slice of an error body kept in a `Network` error message
const MAX_ERROR_BODY: usize = 200;

/// Anything that can answer listing queries
///
/// Implemented by [`CatalogClient`] for the real API and by in-process fakes
/// in tests.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch(&self, params: &QueryParams) -> Result<ListingResult, CatalogError>;

    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError>;
}

/// Wire form of a listing query: path segments plus query pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
}

impl ListingRequest {
    /// Pick the endpoint for `params` and encode every field
    ///
    /// A non-empty search term selects `/products/search`; otherwise a
    /// category selects `/products/category/{slug}`; otherwise the plain
    /// `/products` listing. [`QueryParams`] never carries both filters.
    pub fn from_params(params: &QueryParams) -> Self {
        let mut segments = vec!["products".to_string()];
        let mut query = Vec::with_capacity(5);

        if params.is_search() {
            segments.push("search".to_string());
            query.push(("q".to_string(), params.search_term().to_string()));
        } else if let Some(category) = params.category() {
            segments.push("category".to_string());
            segments.push(category.to_string());
        }

        query.push(("skip".to_string(), params.skip().to_string()));
        query.push(("limit".to_string(), params.limit().to_string()));
        query.push(("sortBy".to_string(), params.sort_field().to_string()));
        query.push(("order".to_string(), params.sort_order().to_string()));

        Self { segments, query }
    }

    /// Rebuild the [`QueryParams`] this request encodes
    pub fn to_params(&self) -> Result<QueryParams, CatalogError> {
        let pairs: HashMap<&str, &str> = self
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let skip = parse_number(pairs.get("skip").copied(), "skip", 0)?;
        let limit = parse_number(pairs.get("limit").copied(), "limit", DEFAULT_PAGE_SIZE)?;
        let sort_field = match pairs.get("sortBy") {
            Some(value) => value.parse::<SortField>()?,
            None => SortField::default(),
        };
        let sort_order = match pairs.get("order") {
            Some(value) => value.parse::<SortOrder>()?,
            None => SortOrder::default(),
        };

        let segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        let (search_term, category) = match segments.as_slice() {
            ["products"] => (None, None),
            ["products", "search"] => (pairs.get("q").copied(), None),
            ["products", "category", slug] => (None, Some(slug.to_string())),
            _ => {
                return Err(CatalogError::InvalidParams(format!(
                    "not a listing path: /{}",
                    self.segments.join("/")
                )));
            }
        };

        Ok(QueryParams::new(skip, limit)?
            .with_search_term(search_term.unwrap_or_default())
            .with_sort(sort_field, sort_order)
            .with_category(category))
    }

    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Full URL under `base`, with path segments percent-encoded
    pub fn url(&self, base: &Url) -> Result<Url, CatalogError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidParams(format!("unusable base url: {}", base)))?
            .pop_if_empty()
            .extend(&self.segments);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

fn parse_number(value: Option<&str>, name: &str, default: u32) -> Result<u32, CatalogError> {
    match value {
        Some(raw) => raw.parse::<u32>().map_err(|_| {
            CatalogError::InvalidParams(format!("{} must be a number, got {:?}", name, raw))
        }),
        None => Ok(default),
    }
}

/// HTTP client for the products API
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: Url,
    categories: Cache<String, Arc<Vec<Category>>>,
}

impl CatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CatalogError::InvalidParams(format!("invalid base url {}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CatalogError::from)?;

        let categories = Cache::builder()
            .max_capacity(1)
            .time_to_live(CATEGORIES_TTL)
            .build();

        Ok(Self {
            client,
            base_url,
            categories,
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        Self::new(&config.api_base_url, config.http_timeout)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, CatalogError> {
        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let snippet: String = error_text.chars().take(MAX_ERROR_BODY).collect();
            return Err(CatalogError::Network {
                message: format!("catalog API error {}: {}", status, snippet),
                status: Some(status.as_u16()),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ProductSource for CatalogClient {
    async fn fetch(&self, params: &QueryParams) -> Result<ListingResult, CatalogError> {
        let request = ListingRequest::from_params(params);
        let url = request.url(&self.base_url)?;

        info!(path = %request.path(), skip = params.skip(), limit = params.limit(), "Fetching products");

        let listing: ListingResult = self.get_json(url).await.inspect_err(|e| {
            warn!(path = %request.path(), error = %e, "Product fetch failed");
        })?;

        debug!(
            count = listing.items.len(),
            total = listing.total_count,
            "Fetched products"
        );

        Ok(listing)
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError> {
        if let Some(cached) = self.categories.get(CATEGORIES_CACHE_KEY).await {
            debug!("Cache hit for categories");
            return Ok(cached.as_ref().clone());
        }

        let request = ListingRequest {
            segments: vec!["products".to_string(), "categories".to_string()],
            query: Vec::new(),
        };
        let url = request.url(&self.base_url)?;

        info!("Fetching product categories");
        let categories: Vec<Category> = self.get_json(url).await?;

        self.categories
            .insert(CATEGORIES_CACHE_KEY.to_string(), Arc::new(categories.clone()))
            .await;

        info!("Fetched {} categories", categories.len());
        Ok(categories)
    }
}
