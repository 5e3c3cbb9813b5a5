//! View model handed to the presentation layer

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorKind;
use crate::models::product::Product;
use crate::models::query::QueryParams;

/// One slot of the pagination bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageIndicator {
    Page(u32),
    /// Elided run of pages ("...")
    Gap,
}

/// Snapshot published after every state change
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogView {
    pub items: Vec<Product>,
    pub total_count: u64,
    pub is_loading: bool,
    pub error: Option<ErrorKind>,
    /// Rendered error message for the "Try Again" panel
    pub error_message: Option<String>,
    pub current_page: u32,
    /// `None` until the first result for the current filters arrives
    pub total_pages: Option<u32>,
    pub pagination_window: Vec<PageIndicator>,
    pub has_prev: bool,
    pub has_next: bool,
    pub params: QueryParams,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CatalogView {
    /// Initial loading view for `params`
    pub fn loading(params: QueryParams) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            is_loading: true,
            error: None,
            error_message: None,
            current_page: params.page(),
            total_pages: None,
            pagination_window: vec![PageIndicator::Page(1)],
            has_prev: false,
            has_next: false,
            params,
            updated_at: None,
        }
    }
}
