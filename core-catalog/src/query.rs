//! Album listing queries and catalog wire formats.
//!
//! [`AlbumQuery`] describes one `GET /albums` call; the response types mirror
//! the JSON the catalog API returns and are lenient about missing sections.

use crate::models::{null_as_default, Album, Cursor, Genre, GenreId};
use bridge_traits::http::HttpRequest;
use core_runtime::config::AlbumSort;
use serde::{Deserialize, Serialize};
use url::Url;

/// Parameters of a single album page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumQuery {
    /// `None` lists all genres
    pub genre: Option<GenreId>,
    /// `None` requests the first page
    pub after: Option<Cursor>,
    pub per_page: u32,
    pub sort: Option<AlbumSort>,
}

impl AlbumQuery {
    /// First page of all genres.
    pub fn new(per_page: u32) -> Self {
        Self {
            genre: None,
            after: None,
            per_page,
            sort: None,
        }
    }

    pub fn genre(mut self, genre: Option<GenreId>) -> Self {
        self.genre = genre;
        self
    }

    pub fn after(mut self, cursor: Option<Cursor>) -> Self {
        self.after = cursor;
        self
    }

    pub fn sort(mut self, sort: Option<AlbumSort>) -> Self {
        self.sort = sort;
        self
    }

    /// Build the HTTP request against `albums_url` (`{base}/api/albums`).
    /// Absent parameters are left out of the query string entirely.
    pub fn to_request(&self, albums_url: &str) -> HttpRequest {
        HttpRequest::get(albums_url)
            .query("genre", self.genre)
            .query("per_page", Some(self.per_page))
            .query("after_id", self.after)
            .query("sort_by", self.sort.as_ref().map(|s| s.sort_by.as_str()))
            .query("sort_order", self.sort.as_ref().map(|s| s.order))
    }
}

/// Pagination block of an albums response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

/// `GET /albums` response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlbumsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub albums: Vec<Album>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pagination: PaginationInfo,
}

/// `GET /genres` response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenresResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<Genre>,
}

/// One page of albums as consumed by the pager.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlbumPage {
    pub albums: Vec<Album>,
    pub has_more: bool,
    pub next_cursor: Option<Cursor>,
    /// Page size the server actually applied, when reported
    pub per_page: Option<u32>,
}

impl AlbumPage {
    pub fn new(albums: Vec<Album>, has_more: bool, next_cursor: Option<Cursor>) -> Self {
        Self {
            albums,
            has_more,
            next_cursor,
            per_page: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl From<AlbumsResponse> for AlbumPage {
    fn from(response: AlbumsResponse) -> Self {
        Self {
            albums: response.albums,
            has_more: response.pagination.has_more,
            // Zero is sent in place of null by some servers
            next_cursor: response.pagination.next_cursor.filter(|c| c.get() != 0),
            per_page: response.pagination.per_page,
        }
    }
}

/// Turn a possibly relative stream URL into an absolute one.
///
/// Follows RFC 3986 reference resolution against the API root, so
/// protocol-relative and absolute URLs of any scheme case are handled.
///
/// ```
/// use core_catalog::query::resolve_stream_url;
/// use url::Url;
///
/// let base = Url::parse("http://localhost:4000/").unwrap();
/// assert_eq!(
///     resolve_stream_url(&base, "/streams/7.mp3").unwrap(),
///     "http://localhost:4000/streams/7.mp3"
/// );
/// assert_eq!(
///     resolve_stream_url(&base, "https://cdn.example.com/7.mp3").unwrap(),
///     "https://cdn.example.com/7.mp3"
/// );
/// ```
pub fn resolve_stream_url(api_base_url: &Url, url: &str) -> Result<String, url::ParseError> {
    api_base_url
        .join(url.trim())
        .map(|resolved| resolved.to_string())
}
