//! Domain models for the catalog
//!
//! Entities as served by the catalog API. Identifiers are numeric on the wire
//! and wrapped in newtypes here so an album id can never be passed where a
//! cursor or track id is expected.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// =============================================================================
// ID Types
// =============================================================================

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Unique identifier for a track
    TrackId
);
numeric_id!(
    /// Unique identifier for an album
    AlbumId
);
numeric_id!(
    /// Unique identifier for a genre
    GenreId
);
numeric_id!(
    /// Unique identifier for an artist
    ArtistId
);
numeric_id!(
    /// Opaque pagination cursor.
    ///
    /// Sent back verbatim as `after_id`; only valid for the filter and sort
    /// that produced it.
    Cursor
);

// =============================================================================
// Domain Models
// =============================================================================

/// Processing state of an uploaded track. Only `Ready` tracks can stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Processing,
    Ready,
    Failed,
    /// Any status this client does not know about; treated as not playable.
    #[serde(other)]
    Unknown,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Processing => "processing",
            UploadStatus::Ready => "ready",
            UploadStatus::Failed => "failed",
            UploadStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode an explicit `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Only present on genre listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_count: Option<u32>,
}

/// A playable (or not yet playable) track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub album_id: AlbumId,
    /// Canonical position within the album; unique per album.
    pub track_number: u32,
    /// Display-only label such as "A1" or "2-03". Never used for ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_track_number: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Length of the preview sample in seconds
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_duration: f64,
    pub upload_status: UploadStatus,
    /// Present inline on some payloads, otherwise resolved via `GET /tracks/:id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    /// Embedded on single-track responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<Box<Album>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<Artist>,
}

impl Track {
    pub fn is_playable(&self) -> bool {
        self.upload_status == UploadStatus::Ready
    }

    /// Stream URL if one is present and non-empty.
    pub fn stream_url(&self) -> Option<&str> {
        self.stream_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn has_stream_url(&self) -> bool {
        self.stream_url().is_some()
    }

    /// Label shown next to the title: the alternate number if set, otherwise
    /// the track number.
    pub fn display_number(&self) -> String {
        match self.alt_track_number.as_deref() {
            Some(alt) if !alt.trim().is_empty() => alt.to_string(),
            _ => self.track_number.to_string(),
        }
    }

    /// Duration as `m:ss`, or `None` while the duration is unknown.
    ///
    /// ```
    /// # use core_catalog::models::*;
    /// # let mut track: Track = serde_json::from_str(
    /// #     r#"{"id":1,"title":"t","album_id":1,"track_number":1,"upload_status":"ready"}"#,
    /// # ).unwrap();
    /// track.duration_seconds = Some(245.0);
    /// assert_eq!(track.formatted_duration().as_deref(), Some("4:05"));
    /// ```
    pub fn formatted_duration(&self) -> Option<String> {
        let seconds = self.duration_seconds.filter(|d| d.is_finite() && *d > 0.0)? as u64;
        Some(format!("{}:{:02}", seconds / 60, seconds % 60))
    }
}

/// Album with its (possibly partial) track list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub title: String,
    pub artist_id: ArtistId,
    pub genre_id: GenreId,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<Artist>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tracks: Vec<Track>,
}

impl Album {
    /// Tracks in canonical order. The sort is stable, so payload order breaks
    /// ties if the server ever sends duplicate numbers.
    pub fn sorted_tracks(&self) -> Vec<Track> {
        let mut tracks = self.tracks.clone();
        tracks.sort_by_key(|track| track.track_number);
        tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id == id)
    }

    pub fn playable_track_count(&self) -> usize {
        self.tracks.iter().filter(|track| track.is_playable()).count()
    }

    pub fn artist_name(&self) -> Option<&str> {
        self.artist.as_ref().map(|artist| artist.name.as_str())
    }
}
