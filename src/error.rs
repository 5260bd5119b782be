//! Error types for shopsync.

use thiserror::Error;

use crate::remote::ApiError;

/// Errors that escape the sync engine.
///
/// Expected remote failures (transport, rate limiting, validation) are
/// reported as push outcomes or pull statistics instead; this type covers
/// local infrastructure faults and operator mistakes.
#[derive(Error, Debug)]
pub enum ShopSyncError {
    /// Local database failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration could not be loaded or is incomplete.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record or file was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operator supplied an argument the engine cannot act on.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Remote API failure outside of a push or pull.
    #[error("Remote API error: {0}")]
    Api(#[from] ApiError),
}

impl From<rusqlite::Error> for ShopSyncError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShopSyncError::NotFound("customer 42".to_string());
        assert_eq!(err.to_string(), "Not found: customer 42");

        let err = ShopSyncError::Config("missing api.shop_domain".to_string());
        assert!(err.to_string().contains("shop_domain"));
    }

    #[test]
    fn test_from_rusqlite() {
        let err: ShopSyncError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, ShopSyncError::Database(_)));
    }

    #[test]
    fn test_from_api_error() {
        let err: ShopSyncError = ApiError::graph("Access denied").into();
        assert!(err.to_string().contains("Access denied"));
    }
}
