//! # Catalog Module
//!
//! Read-only access to the remote music catalog and the state needed to
//! browse it.
//!
//! ## Overview
//!
//! This module provides:
//! - Domain models for albums, tracks, genres and artists
//! - The [`CatalogApi`] seam and its JSON-over-HTTP implementation
//! - [`AlbumPager`], a cursor pagination manager supporting both infinite
//!   scroll and previous/next navigation
//! - [`AlbumIndex`], an in-memory index of every album the pager has seen

pub mod api;
pub mod error;
pub mod index;
pub mod models;
pub mod pager;
pub mod query;

pub use api::{CatalogApi, HttpCatalogClient};
pub use error::{CatalogError, Result};
pub use index::AlbumIndex;
pub use models::{Album, AlbumId, Artist, ArtistId, Cursor, Genre, GenreId, Track, TrackId, UploadStatus};
pub use pager::{AlbumPager, PageLoad, PagerSnapshot, SkipReason};
pub use query::{AlbumPage, AlbumQuery};
