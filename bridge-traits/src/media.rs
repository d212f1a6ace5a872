//! Media Element Abstraction
//!
//! The single audio transport a playback session drives. Hosts wrap their
//! native element (an `<audio>` tag, an AVPlayer, a desktop audio sink) and
//! report its state changes back as [`MediaEvent`]s.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// State changes raised by the native element itself.
///
/// The element may start or stop on its own (OS media keys, end of stream,
/// an autoplay policy refusing `play`), so the session reconciles its
/// `is_playing` flag from these rather than assuming its own commands took
/// effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEvent {
    /// Element started or resumed output.
    Play,
    /// Element paused.
    Pause,
    /// Element reached the end of the loaded source.
    Ended,
}

/// Audio transport bound to exactly one playback session.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::media::MediaElement;
///
/// async fn start(element: &dyn MediaElement, url: &str) -> Result<()> {
///     element.load(url).await?;
///     element.play().await
/// }
/// ```
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Replace the element source with `url`. Does not start playback.
    async fn load(&self, url: &str) -> Result<()>;

    /// Start or resume output of the loaded source.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Media`](crate::BridgeError::Media) when the host
    /// refuses playback (autoplay policy, unsupported codec).
    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Seek relative to the current position. Negative values seek backwards;
    /// implementations clamp to the source bounds.
    async fn seek_by(&self, seconds: f64) -> Result<()>;
}
