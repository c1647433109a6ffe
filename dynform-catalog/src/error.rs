//! Typed error type for catalog operations.

use thiserror::Error;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Error type for every catalog request and for configuration loading.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network or connection failure.
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// 404 -- unknown plugin type.
    #[error("{0}")]
    NotFound(String),

    /// 409 -- plugin already registered, or still in use.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Other API error with status code and body.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for CatalogError {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}
