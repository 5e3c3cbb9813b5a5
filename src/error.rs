//! Catalog error types
//!
//! `CatalogError` is cloned into every waiter of a shared fetch, so variants
//! carry rendered messages rather than the underlying transport errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while building or running a catalog query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Transport failure, timeout or non-success HTTP status
    #[error("network error: {message}")]
    Network {
        message: String,
        status: Option<u16>,
    },
    /// Response body did not match the expected listing shape
    #[error("decode error: {0}")]
    Decode(String),
    /// Parameters rejected before dispatch
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

/// Presentation-facing error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Decode,
    InvalidParams,
}

impl CatalogError {
    pub fn network(message: impl Into<String>) -> Self {
        CatalogError::Network {
            message: message.into(),
            status: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Network { .. } => ErrorKind::Network,
            CatalogError::Decode(_) => ErrorKind::Decode,
            CatalogError::InvalidParams(_) => ErrorKind::InvalidParams,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return CatalogError::Decode(err.to_string());
        }
        CatalogError::Network {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Decode(err.to_string())
    }
}

/// Malformed configuration value
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(CatalogError::network("boom").kind(), ErrorKind::Network);
        assert_eq!(CatalogError::Decode("bad".into()).kind(), ErrorKind::Decode);
        assert_eq!(
            CatalogError::InvalidParams("limit".into()).kind(),
            ErrorKind::InvalidParams
        );
    }

    #[test]
    fn test_json_error_is_decode() {
        let err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        assert_eq!(CatalogError::from(err).kind(), ErrorKind::Decode);
    }
}
