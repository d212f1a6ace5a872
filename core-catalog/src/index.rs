//! In-memory index of albums seen while browsing.
//!
//! Every page the pager applies is registered here, which lets the playback
//! session look up an album's current track list by id without refetching.

use crate::models::{Album, AlbumId, Track};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct AlbumIndex {
    albums: RwLock<HashMap<AlbumId, Album>>,
}

impl AlbumIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh albums.
    ///
    /// A payload without tracks does not erase a track list learned earlier,
    /// and stream URLs resolved earlier survive a refresh that lacks them.
    pub fn register<'a, I>(&self, albums: I)
    where
        I: IntoIterator<Item = &'a Album>,
    {
        let mut index = self.albums.write();
        for album in albums {
            let mut incoming = album.clone();
            if let Some(existing) = index.get(&album.id) {
                if incoming.tracks.is_empty() {
                    incoming.tracks = existing.tracks.clone();
                } else {
                    for track in &mut incoming.tracks {
                        if track.has_stream_url() {
                            continue;
                        }
                        if let Some(known) = existing.track(track.id) {
                            if known.has_stream_url() {
                                track.stream_url = known.stream_url.clone();
                            }
                        }
                    }
                }
            }
            index.insert(album.id, incoming);
        }
    }

    /// Record a single resolved track on its album, if the album is known.
    ///
    /// Returns `true` when the track was found and updated.
    pub fn update_track(&self, track: &Track) -> bool {
        let mut index = self.albums.write();
        let Some(album) = index.get_mut(&track.album_id) else {
            return false;
        };
        match album.tracks.iter_mut().find(|t| t.id == track.id) {
            Some(slot) => {
                // Keep the slot lean; the embedded album would nest a copy of itself
                let mut updated = track.clone();
                updated.album = None;
                *slot = updated;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: AlbumId) -> Option<Album> {
        self.albums.read().get(&id).cloned()
    }

    /// Tracks of an album in canonical order.
    pub fn tracks(&self, id: AlbumId) -> Option<Vec<Track>> {
        self.albums.read().get(&id).map(Album::sorted_tracks)
    }

    pub fn contains(&self, id: AlbumId) -> bool {
        self.albums.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.albums.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.albums.read().is_empty()
    }

    pub fn clear(&self) {
        self.albums.write().clear();
    }
}
