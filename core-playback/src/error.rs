//! # Playback Error Types

use bridge_traits::error::BridgeError;
use core_catalog::error::CatalogError;
use core_catalog::models::{TrackId, UploadStatus};
use thiserror::Error;

/// Errors that can occur during playback operations.
///
/// None of these leave the session in a broken state; every operation that
/// fails can simply be called again.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Track has no stream URL and is not ready to be resolved.
    #[error("Track {track_id} is not playable (upload status: {status})")]
    TrackNotPlayable {
        track_id: TrackId,
        status: UploadStatus,
    },

    /// The catalog answered but offered no stream for the track.
    #[error("No stream available for track {0}")]
    StreamUnavailable(TrackId),

    /// Fetching the stream URL failed.
    #[error("Stream resolution failed: {0}")]
    Resolution(#[from] CatalogError),

    /// The media element refused a command.
    #[error("Media element error: {0}")]
    Media(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Resolution(e) => e.is_transient(),
            PlaybackError::Media(e) => e.is_transient(),
            PlaybackError::TrackNotPlayable { .. } | PlaybackError::StreamUnavailable(_) => false,
        }
    }

    /// Returns `true` if this error came from the network rather than the player.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::Resolution(CatalogError::Bridge(_) | CatalogError::Api { .. })
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
