//! Catalog query parameters
//!
//! `QueryParams` is the cache key for listing results: equality and hashing
//! cover every field, so two pages of the same search are different keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::CatalogError;

/// Default number of products per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Canonical sort fields accepted by the listing endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    #[serde(alias = "name")]
    Title,
    Price,
    Rating,
    Stock,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Price => "price",
            SortField::Rating => "rating",
            SortField::Stock => "stock",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            // "name" is the legacy spelling of the title sort
            "title" | "name" => Ok(SortField::Title),
            "price" => Ok(SortField::Price),
            "rating" => Ok(SortField::Rating),
            "stock" => Ok(SortField::Stock),
            other => Err(CatalogError::InvalidParams(format!(
                "unknown sort field: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
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

impl FromStr for SortOrder {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(CatalogError::InvalidParams(format!(
                "unknown sort order: {}",
                other
            ))),
        }
    }
}

/// Immutable description of one listing request
///
/// Built with [`QueryParams::new`] and the `with_*` methods, each of which
/// returns a new value. A zero `limit` is rejected up front so it can never
/// reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    skip: u32,
    limit: u32,
    search_term: String,
    sort_field: SortField,
    sort_order: SortOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
}

impl QueryParams {
    pub fn new(skip: u32, limit: u32) -> Result<Self, CatalogError> {
        if limit == 0 {
            return Err(CatalogError::InvalidParams(
                "limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            skip,
            limit,
            search_term: String::new(),
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
            category: None,
        })
    }

    /// Parameters for a 1-based page of `page_size` items
    pub fn for_page(page: u32, page_size: u32) -> Result<Self, CatalogError> {
        if page == 0 {
            return Err(CatalogError::InvalidParams(
                "page must be at least 1".to_string(),
            ));
        }
        let skip = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| CatalogError::InvalidParams(format!("page {} is out of range", page)))?;
        Self::new(skip, page_size)
    }

    pub fn with_skip(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_limit(mut self, limit: NonZeroU32) -> Self {
        self.limit = limit.get();
        self
    }

    /// Surrounding whitespace is dropped; a blank term selects plain listing mode
    ///
    /// A non-blank term replaces any category filter.
    pub fn with_search_term(mut self, term: impl AsRef<str>) -> Self {
        self.search_term = term.as_ref().trim().to_string();
        if self.is_search() {
            self.category = None;
        }
        self
    }

    pub fn with_sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = field;
        self.sort_order = order;
        self
    }

    /// A category replaces any search term
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if self.category.is_some() {
            self.search_term.clear();
        }
        self
    }

    pub fn skip(&self) -> u32 {
        self.skip
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn sort_field(&self) -> SortField {
        self.sort_field
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// True when the search endpoint should be used
    pub fn is_search(&self) -> bool {
        !self.search_term.is_empty()
    }

    /// 1-based page this request addresses
    pub fn page(&self) -> u32 {
        self.skip / self.limit + 1
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
            search_term: String::new(),
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
            category: None,
        }
    }
}
