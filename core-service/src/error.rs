use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] core_catalog::CatalogError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("A media element is already attached to this service")]
    SessionAlreadyAttached,
}

impl CoreError {
    pub fn is_transient(&self) -> bool {
        match self {
            CoreError::Bridge(e) => e.is_transient(),
            CoreError::Catalog(e) => e.is_transient(),
            CoreError::Playback(e) => e.is_transient(),
            CoreError::Runtime(_) | CoreError::SessionAlreadyAttached => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
