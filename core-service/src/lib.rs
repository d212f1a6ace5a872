//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges (HTTP client, media element)
//! into the catalog browser and the playback session. Desktop apps typically
//! enable the `desktop-shims` feature, which supplies a `reqwest` HTTP client
//! and a headless media element from `bridge-desktop`.

pub mod browser;
pub mod error;

pub use browser::Browser;
pub use error::{CoreError, Result};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{HeadlessMediaElement, ReqwestHttpClient};

use std::sync::Arc;

use bridge_traits::media::MediaElement;
use core_catalog::{AlbumIndex, CatalogApi, HttpCatalogClient};
use core_playback::{PlaybackSession, TrackListSource};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use parking_lot::Mutex;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    catalog: Arc<dyn CatalogApi>,
    index: Arc<AlbumIndex>,
    events: EventBus,
    browser: Arc<Browser>,
    session: Arc<Mutex<Option<Arc<PlaybackSession>>>>,
}

impl CoreService {
    /// Create a service talking to the catalog API described by `config`.
    pub fn new(config: CoreConfig) -> Self {
        let catalog: Arc<dyn CatalogApi> = Arc::new(HttpCatalogClient::from_config(&config));
        Self::with_catalog(config, catalog)
    }

    /// Create a service over an explicit catalog implementation.
    pub fn with_catalog(config: CoreConfig, catalog: Arc<dyn CatalogApi>) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        let index = Arc::new(AlbumIndex::new());
        let browser = Arc::new(Browser::new(
            Arc::clone(&catalog),
            Arc::clone(&index),
            events.clone(),
            &config,
        ));

        Self {
            config: Arc::new(config),
            catalog,
            index,
            events,
            browser,
            session: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn catalog(&self) -> Arc<dyn CatalogApi> {
        Arc::clone(&self.catalog)
    }

    pub fn album_index(&self) -> Arc<AlbumIndex> {
        Arc::clone(&self.index)
    }

    pub fn browser(&self) -> Arc<Browser> {
        Arc::clone(&self.browser)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Hand the service its media element and create the playback session.
    ///
    /// A service drives exactly one element; a second call fails with
    /// [`CoreError::SessionAlreadyAttached`].
    pub fn attach_media_element(
        &self,
        media: Arc<dyn MediaElement>,
    ) -> Result<Arc<PlaybackSession>> {
        let mut slot = self.session.lock();
        if slot.is_some() {
            return Err(CoreError::SessionAlreadyAttached);
        }

        let session = Arc::new(
            PlaybackSession::new(
                Arc::clone(&self.catalog),
                media,
                Arc::clone(&self.index) as Arc<dyn TrackListSource>,
            )
            .with_event_bus(self.events.clone()),
        );
        info!(session = %session.id(), "Playback session created");
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// The playback session.
    ///
    /// # Panics
    ///
    /// Panics if no media element has been attached yet; that is a wiring bug
    /// in the host, not a runtime condition.
    pub fn playback(&self) -> Arc<PlaybackSession> {
        match self.try_playback() {
            Some(session) => session,
            None => panic!("CoreService::playback called before attach_media_element"),
        }
    }

    pub fn try_playback(&self) -> Option<Arc<PlaybackSession>> {
        self.session.lock().clone()
    }
}

/// Build a service from the environment using the desktop HTTP client.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// let core = core_service::bootstrap_desktop()?;
/// let genres = core.browser().genres().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop() -> Result<CoreService> {
    let config = CoreConfig::from_env()?;
    Ok(CoreService::new(config))
}
