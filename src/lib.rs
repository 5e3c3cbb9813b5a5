// src/lib.rs

pub mod config;
pub mod error;
pub mod models;

pub mod services {
    pub mod pagination;
    pub mod browse_state;
    pub mod debounce;
    pub mod catalog_client;
    pub mod query_cache;
    pub mod catalog_controller;
}

pub use config::CatalogConfig;
pub use error::{CatalogError, ErrorKind};
pub use models::query::{QueryParams, SortField, SortOrder};
pub use models::view::{CatalogView, PageIndicator};
pub use services::catalog_controller::CatalogController;
