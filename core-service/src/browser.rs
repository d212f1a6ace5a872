//! Genre selection and the album pager it drives.
//!
//! The browser owns the active filter. It fetches page 1 for every selection
//! and hands it to the pager, which never fetches a first page on its own.
//! Selections can overlap; only the latest one is applied.

use core_catalog::{
    AlbumIndex, AlbumPager, AlbumQuery, CatalogApi, Genre, GenreId, PageLoad,
};
use core_runtime::config::{AlbumSort, CoreConfig};
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::Result;

#[derive(Debug, Default)]
struct Selection {
    seq: u64,
    genre: Option<GenreId>,
}

pub struct Browser {
    catalog: Arc<dyn CatalogApi>,
    index: Arc<AlbumIndex>,
    events: EventBus,
    per_page: u32,
    genres_per_page: u32,
    sort: Option<AlbumSort>,
    selection: Mutex<Selection>,
    pager: Mutex<Option<Arc<AlbumPager>>>,
}

impl Browser {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        index: Arc<AlbumIndex>,
        events: EventBus,
        config: &CoreConfig,
    ) -> Self {
        Self {
            catalog,
            index,
            events,
            per_page: config.albums_per_page,
            genres_per_page: config.genres_per_page,
            sort: config.album_sort.clone(),
            selection: Mutex::new(Selection::default()),
            pager: Mutex::new(None),
        }
    }

    /// Fetch page 1 of `genre` and start a fresh pager on it.
    #[instrument(skip(self))]
    pub async fn open(&self, genre: Option<GenreId>) -> Result<Arc<AlbumPager>> {
        let (seq, previous) = self.begin_selection(genre);
        let page = match self.catalog.list_albums(&self.first_page(genre)).await {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "First page of genre failed to load");
                self.revert_selection(seq, previous);
                return Err(err.into());
            }
        };

        let pager = Arc::new(
            AlbumPager::new(Arc::clone(&self.catalog), self.per_page, genre, page)
                .with_sort(self.sort.clone())
                .with_index(Arc::clone(&self.index))
                .with_event_bus(self.events.clone()),
        );

        if self.selection.lock().seq == seq {
            *self.pager.lock() = Some(Arc::clone(&pager));
        } else {
            debug!("Selection changed while opening; pager not installed");
        }
        Ok(pager)
    }

    /// Switch the album list to `genre`.
    ///
    /// Returns [`PageLoad::Discarded`] when a later selection was made while
    /// this one was in flight.
    #[instrument(skip(self))]
    pub async fn select_genre(&self, genre: Option<GenreId>) -> Result<PageLoad> {
        let Some(pager) = self.pager() else {
            let pager = self.open(genre).await?;
            return Ok(PageLoad::Applied {
                count: pager.items().len(),
            });
        };

        let (seq, _) = self.begin_selection(genre);
        let result = self.catalog.list_albums(&self.first_page(genre)).await;

        if self.selection.lock().seq != seq {
            debug!("Discarding superseded genre selection");
            return Ok(PageLoad::Discarded);
        }

        let page = result.inspect_err(|err| {
            warn!(error = %err, "First page of genre failed to load");
            self.revert_selection(seq, pager.filter());
        })?;
        let count = page.albums.len();
        pager.reset_filter(genre, page);
        Ok(PageLoad::Applied { count })
    }

    /// Genres for the genre bar.
    pub async fn genres(&self) -> Result<Vec<Genre>> {
        Ok(self.catalog.list_genres(self.genres_per_page).await?)
    }

    /// Most recently requested genre. A selection that fails to load falls
    /// back to the genre on display.
    pub fn selected_genre(&self) -> Option<GenreId> {
        self.selection.lock().genre
    }

    pub fn pager(&self) -> Option<Arc<AlbumPager>> {
        self.pager.lock().clone()
    }

    /// Returns the new selection number and the genre it replaced.
    fn begin_selection(&self, genre: Option<GenreId>) -> (u64, Option<GenreId>) {
        let mut selection = self.selection.lock();
        selection.seq = selection.seq.wrapping_add(1);
        let previous = std::mem::replace(&mut selection.genre, genre);
        (selection.seq, previous)
    }

    fn revert_selection(&self, seq: u64, genre: Option<GenreId>) {
        let mut selection = self.selection.lock();
        if selection.seq == seq {
            selection.genre = genre;
        }
    }

    fn first_page(&self, genre: Option<GenreId>) -> AlbumQuery {
        AlbumQuery::new(self.per_page)
            .genre(genre)
            .sort(self.sort.clone())
    }
}
