use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Catalog API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed catalog response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },
}

impl CatalogError {
    /// Returns `true` when repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Bridge(e) => e.is_transient(),
            CatalogError::Api { status, .. } => *status >= 500 || *status == 429,
            CatalogError::Decode(_) | CatalogError::InvalidInput { .. } => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::Api { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
