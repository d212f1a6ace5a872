//! Catalog API access.
//!
//! [`CatalogApi`] is the seam the pager, the browser and the playback session
//! fetch through. [`HttpCatalogClient`] implements it over the host's
//! [`HttpClient`].

use crate::error::{CatalogError, Result};
use crate::models::{Album, Genre, Track, TrackId};
use crate::query::{resolve_stream_url, AlbumPage, AlbumQuery, AlbumsResponse, GenresResponse};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_runtime::config::{normalize_base_url, CoreConfig, MAX_PER_PAGE};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Longest error body echoed into [`CatalogError::Api`].
const MAX_ERROR_BODY: usize = 256;

/// Read access to the catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// `GET /albums` for one page.
    async fn list_albums(&self, query: &AlbumQuery) -> Result<AlbumPage>;

    /// `GET /genres?per_page=n`.
    async fn list_genres(&self, per_page: u32) -> Result<Vec<Genre>>;

    /// `GET /tracks/:id`, including the stream URL when the track is ready.
    async fn get_track(&self, id: TrackId) -> Result<Track>;
}

/// [`CatalogApi`] over JSON HTTP.
///
/// Relative stream URLs in any payload are made absolute against the API
/// origin before they are returned.
pub struct HttpCatalogClient {
    http: Arc<dyn HttpClient>,
    api_base_url: Url,
}

impl HttpCatalogClient {
    pub fn new(http: Arc<dyn HttpClient>, api_base_url: Url) -> Self {
        Self {
            http,
            api_base_url: normalize_base_url(api_base_url),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(Arc::clone(&config.http_client), config.api_base_url.clone())
    }

    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}api{}", self.api_base_url, path)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let response = self.http.execute(request).await?;
        Self::check_status(&response)?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    fn check_status(response: &HttpResponse) -> Result<()> {
        if response.is_success() {
            return Ok(());
        }

        let mut message = response
            .text()
            .unwrap_or_else(|_| "<non-UTF-8 body>".to_string());
        if message.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }

        warn!(status = response.status, "Catalog API request failed");
        Err(CatalogError::Api {
            status: response.status,
            message,
        })
    }

    fn resolve_track(&self, track: &mut Track) {
        if let Some(url) = track.stream_url() {
            match resolve_stream_url(&self.api_base_url, url) {
                Ok(resolved) => track.stream_url = Some(resolved),
                Err(err) => warn!(track_id = %track.id, error = %err, "Unresolvable stream URL"),
            }
        }
        if let Some(album) = track.album.as_deref_mut() {
            self.resolve_album(album);
        }
    }

    fn resolve_album(&self, album: &mut Album) {
        for track in &mut album.tracks {
            self.resolve_track(track);
        }
    }
}

fn validate_per_page(per_page: u32) -> Result<()> {
    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(CatalogError::InvalidInput {
            field: "per_page".to_string(),
            message: format!("must be between 1 and {}, got {}", MAX_PER_PAGE, per_page),
        });
    }
    Ok(())
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    #[instrument(skip(self, query), fields(genre = ?query.genre, after = ?query.after, per_page = query.per_page))]
    async fn list_albums(&self, query: &AlbumQuery) -> Result<AlbumPage> {
        validate_per_page(query.per_page)?;

        let request = query.to_request(&self.url("/albums"));
        let response: AlbumsResponse = self.fetch(request).await?;
        let mut page = AlbumPage::from(response);

        for album in &mut page.albums {
            self.resolve_album(album);
        }

        debug!(
            count = page.albums.len(),
            has_more = page.has_more,
            next_cursor = ?page.next_cursor,
            "Fetched album page"
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn list_genres(&self, per_page: u32) -> Result<Vec<Genre>> {
        validate_per_page(per_page)?;

        let request = HttpRequest::get(self.url("/genres")).query("per_page", Some(per_page));
        let response: GenresResponse = self.fetch(request).await?;

        debug!(count = response.genres.len(), "Fetched genres");
        Ok(response.genres)
    }

    #[instrument(skip(self), fields(track_id = %id))]
    async fn get_track(&self, id: TrackId) -> Result<Track> {
        let request = HttpRequest::get(self.url(&format!("/tracks/{}", id)));
        let mut track: Track = self.fetch(request).await?;

        if track.id != id {
            return Err(CatalogError::InvalidInput {
                field: "id".to_string(),
                message: format!("requested track {} but received {}", id, track.id),
            });
        }

        self.resolve_track(&mut track);
        debug!(has_stream_url = track.has_stream_url(), "Fetched track");
        Ok(track)
    }
}
