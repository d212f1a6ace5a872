//! # Playback Module
//!
//! Drives a single host media element on behalf of the catalog browser.
//!
//! ## Overview
//!
//! This module handles:
//! - The playback state machine ([`PlaybackSession`])
//! - Lazy stream URL resolution through the catalog API
//! - Next/previous navigation that skips tracks whose upload is not ready
//! - Reconciliation with events raised by the media element itself

pub mod error;
pub mod navigation;
pub mod session;

pub use error::{PlaybackError, Result};
pub use navigation::TrackListSource;
pub use session::{
    PlayOutcome, PlaybackSession, PlaybackSessionId, PlaybackSnapshot, PlaybackStatus,
};
