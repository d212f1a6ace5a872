//! Pager behaviour against a scripted catalog.

use async_trait::async_trait;
use core_catalog::{
    Album, AlbumId, AlbumIndex, AlbumPage, AlbumPager, AlbumQuery, CatalogApi, CatalogError,
    Cursor, Genre, GenreId, PageLoad, Result, SkipReason, Track, TrackId,
};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

type PageKey = (Option<u64>, Option<u64>);

/// Serves canned pages keyed by `(genre, after_id)` and records every query.
#[derive(Default)]
struct ScriptedCatalog {
    pages: Mutex<HashMap<PageKey, AlbumPage>>,
    failing: Mutex<HashSet<PageKey>>,
    gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<AlbumQuery>>,
}

impl ScriptedCatalog {
    fn page(&self, genre: Option<u64>, after: Option<u64>, page: AlbumPage) {
        self.pages.lock().insert((genre, after), page);
    }

    fn fail(&self, genre: Option<u64>, after: Option<u64>) {
        self.failing.lock().insert((genre, after));
    }

    fn heal(&self, genre: Option<u64>, after: Option<u64>) {
        self.failing.lock().remove(&(genre, after));
    }

    /// Hold every response until the returned handle is notified.
    fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    fn release(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.notify_one();
        }
    }

    fn calls(&self) -> Vec<AlbumQuery> {
        self.calls.lock().clone()
    }

    async fn wait_for_calls(&self, count: usize) {
        for _ in 0..200 {
            if self.calls.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} catalog calls", count);
    }
}

#[async_trait]
impl CatalogApi for ScriptedCatalog {
    async fn list_albums(&self, query: &AlbumQuery) -> Result<AlbumPage> {
        self.calls.lock().push(query.clone());

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let key = (query.genre.map(GenreId::get), query.after.map(Cursor::get));
        if self.failing.lock().contains(&key) {
            return Err(CatalogError::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(self.pages.lock().get(&key).cloned().unwrap_or_default())
    }

    async fn list_genres(&self, _per_page: u32) -> Result<Vec<Genre>> {
        Ok(Vec::new())
    }

    async fn get_track(&self, id: TrackId) -> Result<Track> {
        Err(CatalogError::Api {
            status: 404,
            message: format!("no track {}", id),
        })
    }
}

fn album(id: u64, genre: u64) -> Album {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "title": format!("Album {}", id),
        "artist_id": 1,
        "genre_id": genre,
    }))
    .unwrap()
}

fn page(ids: &[u64], genre: u64, next: Option<u64>) -> AlbumPage {
    AlbumPage::new(
        ids.iter().map(|id| album(*id, genre)).collect(),
        next.is_some(),
        next.map(Cursor),
    )
}

fn ids(pager: &AlbumPager) -> Vec<u64> {
    pager.album_ids().into_iter().map(AlbumId::get).collect()
}

/// Four pages of two albums each for the unfiltered listing.
fn four_page_catalog() -> Arc<ScriptedCatalog> {
    let catalog = Arc::new(ScriptedCatalog::default());
    catalog.page(None, None, page(&[1, 2], 1, Some(2)));
    catalog.page(None, Some(2), page(&[3, 4], 1, Some(4)));
    catalog.page(None, Some(4), page(&[5, 6], 1, Some(6)));
    catalog.page(None, Some(6), page(&[7, 8], 1, None));
    catalog
}

fn pager_over(catalog: &Arc<ScriptedCatalog>) -> AlbumPager {
    let first = catalog.pages.lock()[&(None, None)].clone();
    AlbumPager::new(catalog.clone(), 2, None, first)
}

#[tokio::test]
async fn test_load_more_appends_next_page() {
    let catalog = Arc::new(ScriptedCatalog::default());
    catalog.page(None, Some(102), page(&[103], 1, None));
    let pager = AlbumPager::new(catalog.clone(), 20, None, page(&[101, 102], 1, Some(102)));

    let outcome = pager.load_more().await.unwrap();

    assert_eq!(outcome, PageLoad::Applied { count: 1 });
    assert_eq!(ids(&pager), vec![101, 102, 103]);
    assert!(!pager.has_more());
    assert!(pager.is_exhausted());
    assert!(pager.back_stack().is_empty());

    let calls = catalog.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].after, Some(Cursor(102)));
    assert_eq!(calls[0].genre, None);
}

#[tokio::test]
async fn test_load_more_never_duplicates_albums() {
    let catalog = Arc::new(ScriptedCatalog::default());
    catalog.page(None, Some(2), page(&[2, 3, 3, 4], 1, None));
    let pager = AlbumPager::new(catalog.clone(), 2, None, page(&[1, 2], 1, Some(2)));

    let outcome = pager.load_more().await.unwrap();

    assert_eq!(outcome, PageLoad::Applied { count: 2 });
    assert_eq!(ids(&pager), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_guards_skip_without_fetching() {
    let catalog = Arc::new(ScriptedCatalog::default());
    let exhausted = AlbumPager::new(catalog.clone(), 2, None, page(&[1], 1, None));
    assert_eq!(
        exhausted.load_more().await.unwrap(),
        PageLoad::Skipped(SkipReason::Exhausted)
    );
    assert_eq!(
        exhausted.load_prev().await.unwrap(),
        PageLoad::Skipped(SkipReason::AtFirstPage)
    );

    let no_cursor = AlbumPager::new(
        catalog.clone(),
        2,
        None,
        AlbumPage::new(vec![album(1, 1)], true, None),
    );
    assert_eq!(
        no_cursor.load_next().await.unwrap(),
        PageLoad::Skipped(SkipReason::NoCursor)
    );

    assert!(catalog.calls().is_empty());
}

#[tokio::test]
async fn test_paged_navigation_is_symmetric() {
    let catalog = four_page_catalog();
    let pager = pager_over(&catalog);

    for expected in [vec![3, 4], vec![5, 6], vec![7, 8]] {
        assert!(pager.load_next().await.unwrap().is_applied());
        assert_eq!(ids(&pager), expected);
    }
    assert_eq!(pager.page_number(), 4);
    assert_eq!(pager.current_cursor(), Some(Cursor(6)));
    assert_eq!(
        pager.back_stack(),
        vec![None, Some(Cursor(2)), Some(Cursor(4))]
    );
    assert_eq!(
        pager.load_next().await.unwrap(),
        PageLoad::Skipped(SkipReason::Exhausted)
    );

    for expected in [vec![5, 6], vec![3, 4], vec![1, 2]] {
        assert!(pager.load_prev().await.unwrap().is_applied());
        assert_eq!(ids(&pager), expected);
    }
    assert_eq!(pager.current_cursor(), None);
    assert!(pager.back_stack().is_empty());
    assert_eq!(pager.page_number(), 1);
    assert!(pager.has_more());
    assert_eq!(pager.next_cursor(), Some(Cursor(2)));

    // The return to page 1 is fetched without a cursor
    assert_eq!(catalog.calls().last().map(|q| q.after), Some(None));
}

#[tokio::test]
async fn test_reset_filter_clears_navigation_state() {
    let catalog = four_page_catalog();
    let pager = pager_over(&catalog);
    pager.load_next().await.unwrap();
    pager.load_next().await.unwrap();

    pager.reset_filter(Some(GenreId(7)), page(&[70, 71], 7, Some(71)));

    assert_eq!(pager.filter(), Some(GenreId(7)));
    assert_eq!(ids(&pager), vec![70, 71]);
    assert!(pager.back_stack().is_empty());
    assert_eq!(pager.current_cursor(), None);
    assert_eq!(pager.next_cursor(), Some(Cursor(71)));
    assert_eq!(pager.page_number(), 1);
}

#[tokio::test]
async fn test_failed_load_leaves_state_untouched() {
    let catalog = four_page_catalog();
    catalog.fail(None, Some(2));
    let pager = pager_over(&catalog);

    let err = pager.load_more().await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(ids(&pager), vec![1, 2]);
    assert_eq!(pager.next_cursor(), Some(Cursor(2)));
    assert!(pager.has_more());
    assert!(!pager.is_loading());

    catalog.heal(None, Some(2));
    assert_eq!(
        pager.load_more().await.unwrap(),
        PageLoad::Applied { count: 2 }
    );
    assert_eq!(ids(&pager), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_failed_load_prev_restores_back_stack() {
    let catalog = four_page_catalog();
    let pager = pager_over(&catalog);
    pager.load_next().await.unwrap();
    pager.load_next().await.unwrap();
    let stack = pager.back_stack();

    catalog.fail(None, Some(2));
    assert!(pager.load_prev().await.is_err());

    assert_eq!(pager.back_stack(), stack);
    assert_eq!(pager.current_cursor(), Some(Cursor(4)));
    assert_eq!(ids(&pager), vec![5, 6]);

    catalog.heal(None, Some(2));
    assert!(pager.load_prev().await.unwrap().is_applied());
    assert_eq!(ids(&pager), vec![3, 4]);
}

#[tokio::test]
async fn test_second_trigger_while_in_flight_is_skipped() {
    let catalog = four_page_catalog();
    let pager = Arc::new(pager_over(&catalog));
    catalog.hold();

    let first = {
        let pager = Arc::clone(&pager);
        tokio::spawn(async move { pager.load_more().await })
    };
    catalog.wait_for_calls(1).await;
    assert!(pager.is_loading());

    assert_eq!(
        pager.load_more().await.unwrap(),
        PageLoad::Skipped(SkipReason::InFlight)
    );
    assert_eq!(
        pager.load_prev().await.unwrap(),
        PageLoad::Skipped(SkipReason::InFlight)
    );

    catalog.release();
    assert_eq!(first.await.unwrap().unwrap(), PageLoad::Applied { count: 2 });
    assert_eq!(catalog.calls().len(), 1);
    assert!(!pager.is_loading());
}

#[tokio::test]
async fn test_aborted_load_prev_restores_back_stack() {
    let catalog = four_page_catalog();
    let pager = Arc::new(pager_over(&catalog));
    pager.load_next().await.unwrap();
    assert_eq!(pager.back_stack(), vec![None]);
    catalog.hold();

    let cancelled = {
        let pager = Arc::clone(&pager);
        tokio::spawn(async move { pager.load_prev().await })
    };
    catalog.wait_for_calls(2).await;
    assert!(pager.is_loading());
    assert!(pager.back_stack().is_empty());

    cancelled.abort();
    assert!(cancelled.await.unwrap_err().is_cancelled());
    catalog.release();

    assert!(!pager.is_loading());
    assert_eq!(pager.back_stack(), vec![None]);
    assert_eq!(pager.current_cursor(), Some(Cursor(2)));
    assert_eq!(ids(&pager), vec![3, 4]);

    assert!(pager.load_prev().await.unwrap().is_applied());
    assert_eq!(ids(&pager), vec![1, 2]);
    assert_eq!(pager.page_number(), 1);
}

#[tokio::test]
async fn test_aborted_load_more_allows_retry() {
    let catalog = four_page_catalog();
    let pager = Arc::new(pager_over(&catalog));
    catalog.hold();

    let cancelled = {
        let pager = Arc::clone(&pager);
        tokio::spawn(async move { pager.load_more().await })
    };
    catalog.wait_for_calls(1).await;
    cancelled.abort();
    assert!(cancelled.await.unwrap_err().is_cancelled());
    catalog.release();

    assert!(!pager.is_loading());
    assert_eq!(ids(&pager), vec![1, 2]);
    assert_eq!(
        pager.load_more().await.unwrap(),
        PageLoad::Applied { count: 2 }
    );
    assert_eq!(ids(&pager), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_response_for_old_filter_is_discarded() {
    let catalog = four_page_catalog();
    let pager = Arc::new(pager_over(&catalog));
    catalog.hold();

    let stale = {
        let pager = Arc::clone(&pager);
        tokio::spawn(async move { pager.load_more().await })
    };
    catalog.wait_for_calls(1).await;

    pager.reset_filter(Some(GenreId(9)), page(&[90, 91], 9, None));
    catalog.release();

    assert_eq!(stale.await.unwrap().unwrap(), PageLoad::Discarded);
    assert_eq!(ids(&pager), vec![90, 91]);
    assert_eq!(pager.filter(), Some(GenreId(9)));
    assert!(!pager.has_more());
    assert!(!pager.is_loading());
}

#[tokio::test]
async fn test_reported_page_size_is_adopted() {
    let catalog = Arc::new(ScriptedCatalog::default());
    let mut first = page(&[1, 2], 1, Some(2));
    first.per_page = Some(10);
    let pager = AlbumPager::new(catalog.clone(), 20, None, first);
    assert_eq!(pager.per_page(), 10);

    pager.load_more().await.unwrap();
    assert_eq!(catalog.calls()[0].per_page, 10);

    let mut bogus = page(&[5], 2, Some(5));
    bogus.per_page = Some(1000);
    pager.reset_filter(Some(GenreId(2)), bogus);
    assert_eq!(pager.per_page(), 20);
}

#[tokio::test]
async fn test_loaded_albums_are_indexed() {
    let catalog = four_page_catalog();
    let index = Arc::new(AlbumIndex::new());
    let pager = pager_over(&catalog).with_index(Arc::clone(&index));
    assert_eq!(index.len(), 2);

    pager.load_more().await.unwrap();
    assert!(index.contains(AlbumId(4)));

    pager.reset_filter(Some(GenreId(3)), page(&[30], 3, None));
    assert!(index.contains(AlbumId(30)));
    assert_eq!(index.len(), 5);
}

#[tokio::test]
async fn test_page_outcomes_are_published() {
    let catalog = four_page_catalog();
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();
    let pager = pager_over(&catalog).with_event_bus(bus.clone());

    pager.load_next().await.unwrap();
    match rx.try_recv().unwrap() {
        CoreEvent::Catalog(CatalogEvent::PageChanged {
            page_number,
            item_count,
            has_more,
            ..
        }) => {
            assert_eq!(page_number, 2);
            assert_eq!(item_count, 2);
            assert!(has_more);
        }
        other => panic!("unexpected event {:?}", other),
    }

    catalog.fail(None, Some(4));
    let _ = pager.load_more().await;
    assert!(matches!(
        rx.try_recv().unwrap(),
        CoreEvent::Catalog(CatalogEvent::PageFailed {
            recoverable: true,
            ..
        })
    ));

    pager.reset_filter(Some(GenreId(2)), page(&[20], 2, None));
    assert!(matches!(
        rx.try_recv().unwrap(),
        CoreEvent::Catalog(CatalogEvent::FilterChanged {
            genre_id: Some(2),
            item_count: 1,
            has_more: false,
        })
    ));
}
