//! Next/previous track selection within an album.
//!
//! Tracks are ordered by `track_number` with a stable sort, and navigation
//! skips anything whose upload is not ready.

use core_catalog::index::AlbumIndex;
use core_catalog::models::{AlbumId, Track, TrackId};

/// Where a session looks up the track list of the current album.
///
/// Looked up on every navigation call so the list reflects whatever the
/// catalog layer knows at that moment.
pub trait TrackListSource: Send + Sync {
    /// Tracks of `album_id`, or `None` when the album is unknown.
    fn album_tracks(&self, album_id: AlbumId) -> Option<Vec<Track>>;

    /// Called with a track whose stream URL was just resolved.
    fn track_resolved(&self, _track: &Track) {}
}

impl TrackListSource for AlbumIndex {
    fn album_tracks(&self, album_id: AlbumId) -> Option<Vec<Track>> {
        self.tracks(album_id)
    }

    fn track_resolved(&self, track: &Track) {
        self.update_track(track);
    }
}

/// Tracks in canonical playback order.
pub fn canonical_order(tracks: &[Track]) -> Vec<&Track> {
    let mut ordered: Vec<&Track> = tracks.iter().collect();
    ordered.sort_by_key(|track| track.track_number);
    ordered
}

/// First ready track after `current`. `None` when `current` is not in the
/// list or nothing after it is ready.
pub fn next_ready(tracks: &[Track], current: TrackId) -> Option<&Track> {
    let ordered = canonical_order(tracks);
    let position = ordered.iter().position(|track| track.id == current)?;
    ordered[position + 1..]
        .iter()
        .find(|track| track.is_playable())
        .copied()
}

/// Closest ready track before `current`.
pub fn prev_ready(tracks: &[Track], current: TrackId) -> Option<&Track> {
    let ordered = canonical_order(tracks);
    let position = ordered.iter().position(|track| track.id == current)?;
    ordered[..position]
        .iter()
        .rev()
        .find(|track| track.is_playable())
        .copied()
}
