//! End-to-end behaviour of the service façade.

use async_trait::async_trait;
use bridge_desktop::HeadlessMediaElement;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::media::MediaEvent;
use bytes::Bytes;
use core_catalog::{
    AlbumPage, AlbumQuery, CatalogApi, CatalogError, Cursor, Genre, GenreId, PageLoad, Track,
    TrackId,
};
use core_playback::PlaybackStatus;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CatalogEvent, CoreEvent, PlaybackEvent};
use core_service::{CoreError, CoreService};
use mockall::mock;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

mock! {
    HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

fn json(body: serde_json::Value) -> BridgeResult<HttpResponse> {
    Ok(HttpResponse {
        status: 200,
        headers: HashMap::new(),
        body: Bytes::from(body.to_string()),
    })
}

fn config(http: MockHttpClient) -> CoreConfig {
    CoreConfig::builder()
        .api_base_url("http://catalog.test")
        .albums_per_page(2)
        .http_client(Arc::new(http))
        .build()
        .unwrap()
}

/// Routes `/albums`, `/genres` and `/tracks/:id` to canned JSON.
fn catalog_http() -> MockHttpClient {
    let mut http = MockHttpClient::new();
    http.expect_execute().returning(|request| {
        let path = request.url.trim_start_matches("http://catalog.test/api");
        match (path, request.query_value("after_id")) {
            ("/genres", _) => json(serde_json::json!({
                "genres": [{"id": 1, "name": "Jazz"}, {"id": 2, "name": "Rock"}]
            })),
            ("/albums", None) => json(serde_json::json!({
                "albums": [
                    {"id": 101, "title": "First", "artist_id": 1, "genre_id": 1, "tracks": [
                        {"id": 1, "title": "Intro", "album_id": 101, "track_number": 1, "upload_status": "ready"},
                        {"id": 2, "title": "Outro", "album_id": 101, "track_number": 2, "upload_status": "ready"}
                    ]},
                    {"id": 102, "title": "Second", "artist_id": 1, "genre_id": 1}
                ],
                "pagination": {"per_page": 2, "has_more": true, "next_cursor": 102}
            })),
            ("/albums", Some("102")) => json(serde_json::json!({
                "albums": [{"id": 103, "title": "Third", "artist_id": 2, "genre_id": 1}],
                "pagination": {"per_page": 2, "has_more": false, "next_cursor": null}
            })),
            (track, _) if track.starts_with("/tracks/") => {
                let id: u64 = track["/tracks/".len()..].parse().unwrap();
                json(serde_json::json!({
                    "id": id, "title": format!("Track {}", id), "album_id": 101,
                    "track_number": id, "upload_status": "ready",
                    "stream_url": format!("/streams/{}.mp3?token=abc", id)
                }))
            }
            (other, _) => panic!("unexpected request {}", other),
        }
    });
    http
}

#[tokio::test]
async fn test_browse_and_load_more_over_http() {
    let service = CoreService::new(config(catalog_http()));
    let browser = service.browser();

    let pager = browser.open(None).await.unwrap();
    assert_eq!(pager.album_ids().iter().map(|id| id.get()).collect::<Vec<_>>(), vec![101, 102]);
    assert_eq!(pager.next_cursor(), Some(Cursor(102)));

    assert_eq!(pager.load_more().await.unwrap(), PageLoad::Applied { count: 1 });
    assert_eq!(
        pager.album_ids().iter().map(|id| id.get()).collect::<Vec<_>>(),
        vec![101, 102, 103]
    );
    assert!(!pager.has_more());
    assert!(service.album_index().contains(core_catalog::AlbumId(103)));

    let genres = browser.genres().await.unwrap();
    assert_eq!(genres.len(), 2);
}

#[tokio::test]
async fn test_play_through_headless_element() {
    let service = CoreService::new(config(catalog_http()));
    let pager = service.browser().open(None).await.unwrap();

    let (element, media_events) = HeadlessMediaElement::new();
    let element = Arc::new(element);
    let session = service.attach_media_element(element.clone()).unwrap();

    let first = pager.items()[0].sorted_tracks()[0].clone();
    session.play(first).await.unwrap();

    assert_eq!(
        element.state().source.as_deref(),
        Some("http://catalog.test/streams/1.mp3?token=abc")
    );
    assert!(session.is_playing());

    session.next().await.unwrap();
    assert_eq!(session.current_track().map(|t| t.id), Some(TrackId(2)));

    element.finish();
    let pump = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.pump_media_events(media_events).await })
    };
    for _ in 0..200 {
        if session.status() == PlaybackStatus::Paused {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(session.status(), PlaybackStatus::Paused);
    pump.abort();
}

#[tokio::test]
async fn test_only_one_media_element_per_service() {
    let service = CoreService::new(config(catalog_http()));
    assert!(service.try_playback().is_none());

    let (first, _rx1) = HeadlessMediaElement::new();
    let (second, _rx2) = HeadlessMediaElement::new();
    service.attach_media_element(Arc::new(first)).unwrap();

    let err = service.attach_media_element(Arc::new(second)).unwrap_err();
    assert!(matches!(err, CoreError::SessionAlreadyAttached));
    assert!(service.try_playback().is_some());
}

#[test]
#[should_panic(expected = "before attach_media_element")]
fn test_playback_before_attach_panics() {
    let service = CoreService::new(config(MockHttpClient::new()));
    let _ = service.playback();
}

// ============================================================================
// Genre selection races
// ============================================================================

/// Serves one album per genre, optionally holding or failing a genre's
/// response.
#[derive(Default)]
struct GatedCatalog {
    gates: Mutex<HashMap<u64, Arc<Notify>>>,
    failing: Mutex<HashSet<u64>>,
    calls: Mutex<Vec<Option<u64>>>,
}

impl GatedCatalog {
    fn fail(&self, genre: u64) {
        self.failing.lock().insert(genre);
    }

    fn hold(&self, genre: u64) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(genre, Arc::clone(&gate));
        gate
    }

    async fn wait_for_calls(&self, count: usize) {
        for _ in 0..200 {
            if self.calls.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} album requests", count);
    }
}

#[async_trait]
impl CatalogApi for GatedCatalog {
    async fn list_albums(&self, query: &AlbumQuery) -> core_catalog::Result<AlbumPage> {
        let genre = query.genre.map(GenreId::get);
        self.calls.lock().push(genre);

        let gate = genre.and_then(|g| self.gates.lock().get(&g).cloned());
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if genre.is_some_and(|g| self.failing.lock().contains(&g)) {
            return Err(CatalogError::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }

        let id = 1000 + genre.unwrap_or(0);
        let album = serde_json::from_value(serde_json::json!({
            "id": id, "title": "A", "artist_id": 1, "genre_id": genre.unwrap_or(0)
        }))?;
        Ok(AlbumPage::new(vec![album], false, None))
    }

    async fn list_genres(&self, _per_page: u32) -> core_catalog::Result<Vec<Genre>> {
        Ok(Vec::new())
    }

    async fn get_track(&self, id: TrackId) -> core_catalog::Result<Track> {
        Err(CatalogError::Api {
            status: 404,
            message: format!("no track {}", id),
        })
    }
}

#[tokio::test]
async fn test_superseded_genre_selection_is_discarded() {
    let catalog = Arc::new(GatedCatalog::default());
    let service = CoreService::with_catalog(config(MockHttpClient::new()), catalog.clone());
    let browser = service.browser();
    let mut events = service.subscribe().filter(|event| {
        matches!(event, CoreEvent::Catalog(CatalogEvent::FilterChanged { .. }))
    });

    browser.open(None).await.unwrap();
    let slow = catalog.hold(1);

    let first = {
        let browser = Arc::clone(&browser);
        tokio::spawn(async move { browser.select_genre(Some(GenreId(1))).await })
    };
    catalog.wait_for_calls(2).await;

    assert_eq!(
        browser.select_genre(Some(GenreId(2))).await.unwrap(),
        PageLoad::Applied { count: 1 }
    );
    slow.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), PageLoad::Discarded);

    let pager = browser.pager().unwrap();
    assert_eq!(pager.filter(), Some(GenreId(2)));
    assert_eq!(pager.album_ids(), vec![core_catalog::AlbumId(1002)]);
    assert_eq!(browser.selected_genre(), Some(GenreId(2)));

    match events.try_recv() {
        Some(Ok(CoreEvent::Catalog(CatalogEvent::FilterChanged { genre_id, .. }))) => {
            assert_eq!(genre_id, Some(2));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn test_failed_genre_selection_keeps_displayed_genre() {
    let catalog = Arc::new(GatedCatalog::default());
    catalog.fail(3);
    let service = CoreService::with_catalog(config(MockHttpClient::new()), catalog.clone());
    let browser = service.browser();

    browser.open(Some(GenreId(1))).await.unwrap();
    let err = browser.select_genre(Some(GenreId(3))).await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(browser.selected_genre(), Some(GenreId(1)));
    let pager = browser.pager().unwrap();
    assert_eq!(pager.filter(), Some(GenreId(1)));
    assert_eq!(pager.album_ids(), vec![core_catalog::AlbumId(1001)]);

    assert!(browser.open(Some(GenreId(3))).await.is_err());
    assert_eq!(browser.selected_genre(), Some(GenreId(1)));
}

#[tokio::test]
async fn test_playback_events_reach_subscribers() {
    let service = CoreService::new(config(catalog_http()));
    let mut events = service
        .subscribe()
        .filter(|event| matches!(event, CoreEvent::Playback(_)));

    let (element, _rx) = HeadlessMediaElement::new();
    let session = service.attach_media_element(Arc::new(element)).unwrap();
    let track: Track = serde_json::from_value(serde_json::json!({
        "id": 5, "title": "Track 5", "album_id": 101, "track_number": 5, "upload_status": "ready"
    }))
    .unwrap();
    session.play(track).await.unwrap();
    session.handle_media_event(MediaEvent::Pause);

    let received: Vec<CoreEvent> =
        std::iter::from_fn(|| events.try_recv().and_then(Result::ok)).collect();
    assert_eq!(
        received,
        vec![
            CoreEvent::Playback(PlaybackEvent::Loading { track_id: 5 }),
            CoreEvent::Playback(PlaybackEvent::Started {
                track_id: 5,
                title: "Track 5".to_string(),
            }),
            CoreEvent::Playback(PlaybackEvent::Paused { track_id: 5 }),
        ]
    );
}
