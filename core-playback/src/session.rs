//! # Playback Session
//!
//! A four-state controller (`Idle`, `Loading`, `Playing`, `Paused`) that owns
//! the media element and resolves stream URLs lazily.
//!
//! ## Stream resolution
//!
//! Album listings rarely carry stream URLs. Playing such a track enters
//! `Loading`, fetches `GET /tracks/:id` and then hands the URL to the media
//! element. Every resolution is tagged with a sequence number; a response
//! whose number is no longer current was superseded by a later `play` and
//! is dropped on arrival.
//!
//! ## Media events
//!
//! The element can start or stop on its own. Its events are fed back through
//! [`PlaybackSession::handle_media_event`] so `is_playing` follows the
//! element rather than the last command issued.

use crate::error::{PlaybackError, Result};
use crate::navigation::{next_ready, prev_ready, TrackListSource};
use bridge_traits::error::BridgeError;
use bridge_traits::media::{MediaElement, MediaEvent};
use core_catalog::api::CatalogApi;
use core_catalog::models::{Track, TrackId};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::redact_stream_url;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Identifies a session in logs and spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackSessionId(pub Uuid);

impl PlaybackSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// No current track
    Idle,
    /// Resolving a stream URL
    Loading,
    Playing,
    Paused,
}

/// What a call to [`PlaybackSession::play`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A new source was loaded and started.
    Started,
    /// The already loaded source resumed (or was already playing).
    Resumed,
    /// The same track is already being resolved; no second fetch was made.
    AlreadyLoading,
    /// A later `play` took over before this one finished.
    Superseded,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub loading_track_id: Option<TrackId>,
}

impl PlaybackSnapshot {
    /// Whether `track_id` is the current track, for highlighting in a list.
    pub fn is_current(&self, track_id: TrackId) -> bool {
        self.current_track
            .as_ref()
            .is_some_and(|track| track.id == track_id)
    }

    pub fn is_loading(&self, track_id: TrackId) -> bool {
        self.loading_track_id == Some(track_id)
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingResolution {
    track_id: TrackId,
    seq: u64,
    /// Status to fall back to if resolution fails
    resume: PlaybackStatus,
}

#[derive(Debug)]
struct SessionInner {
    current: Option<Track>,
    status: PlaybackStatus,
    pending: Option<PendingResolution>,
    /// Track whose source the media element currently holds
    loaded: Option<TrackId>,
    seq: u64,
}

impl SessionInner {
    fn next_seq(&mut self) -> u64 {
        self.seq = self.seq.wrapping_add(1);
        self.seq
    }
}

/// Await a [`PlaybackSession::play`] future was suspended on when dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayStage {
    Resolving,
    Loading,
    Starting,
}

/// Rolls the session back when a `play` future is dropped mid-await, so the
/// same track can be played again.
///
/// Does nothing once a later command has taken over.
struct CancelGuard<'a> {
    inner: &'a Mutex<SessionInner>,
    seq: u64,
    stage: PlayStage,
    armed: bool,
}

impl<'a> CancelGuard<'a> {
    fn new(inner: &'a Mutex<SessionInner>, seq: u64, stage: PlayStage) -> Self {
        Self {
            inner,
            seq,
            stage,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock();
        match self.stage {
            PlayStage::Resolving => {
                let Some(pending) = inner.pending.filter(|pending| pending.seq == self.seq) else {
                    return;
                };
                inner.pending = None;
                inner.status = pending.resume;
            }
            PlayStage::Loading | PlayStage::Starting => {
                if inner.seq != self.seq {
                    return;
                }
                inner.status = PlaybackStatus::Paused;
                if self.stage == PlayStage::Loading {
                    inner.loaded = None;
                }
            }
        }
        debug!(stage = ?self.stage, "Play cancelled");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Next,
    Prev,
}

/// Playback controller for a single media element.
pub struct PlaybackSession {
    id: PlaybackSessionId,
    api: Arc<dyn CatalogApi>,
    media: Arc<dyn MediaElement>,
    tracks: Arc<dyn TrackListSource>,
    events: Option<EventBus>,
    inner: Mutex<SessionInner>,
}

impl PlaybackSession {
    pub fn new(
        api: Arc<dyn CatalogApi>,
        media: Arc<dyn MediaElement>,
        tracks: Arc<dyn TrackListSource>,
    ) -> Self {
        Self {
            id: PlaybackSessionId::new(),
            api,
            media,
            tracks,
            events: None,
            inner: Mutex::new(SessionInner {
                current: None,
                status: PlaybackStatus::Idle,
                pending: None,
                loaded: None,
                seq: 0,
            }),
        }
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn id(&self) -> PlaybackSessionId {
        self.id
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Play `track`, resolving its stream URL first if needed.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::TrackNotPlayable`] for a track without a stream URL
    ///   whose upload is not ready; the session is unchanged.
    /// - [`PlaybackError::Resolution`] / [`PlaybackError::StreamUnavailable`]
    ///   when resolution fails; the session returns to its state before
    ///   loading began.
    /// - [`PlaybackError::Media`] when the element refuses; the track stays
    ///   current but paused.
    ///
    /// Dropping the returned future before it completes leaves the session
    /// as a failure at the same point would, so `play` can simply be retried.
    #[instrument(skip(self, track), fields(session = %self.id, track_id = %track.id))]
    pub async fn play(&self, track: Track) -> Result<PlayOutcome> {
        if track.has_stream_url() {
            return self.start(track).await;
        }

        let known = {
            let inner = self.inner.lock();
            inner
                .current
                .as_ref()
                .filter(|current| current.id == track.id && current.has_stream_url())
                .cloned()
        };
        if let Some(known) = known {
            return self.start(known).await;
        }

        if !track.is_playable() {
            warn!(status = %track.upload_status, "Track is not playable");
            return Err(PlaybackError::TrackNotPlayable {
                track_id: track.id,
                status: track.upload_status,
            });
        }

        self.resolve_and_start(track).await
    }

    /// Pause output. While a stream is resolving this only pauses the track
    /// still on the element; the resolved track starts once it arrives.
    ///
    /// If the element refuses, a playing track is reported as playing again.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn pause(&self) -> Result<()> {
        let (pause_media, paused, seq) = {
            let mut inner = self.inner.lock();
            let (pause_media, paused) = match inner.status {
                PlaybackStatus::Playing => {
                    inner.status = PlaybackStatus::Paused;
                    (true, inner.current.as_ref().map(|track| track.id))
                }
                PlaybackStatus::Loading => {
                    if let Some(pending) = inner.pending.as_mut() {
                        if pending.resume == PlaybackStatus::Playing {
                            pending.resume = PlaybackStatus::Paused;
                        }
                    }
                    (inner.loaded.is_some(), None)
                }
                PlaybackStatus::Paused | PlaybackStatus::Idle => (false, None),
            };
            (pause_media, paused, inner.seq)
        };

        if !pause_media {
            debug!("Nothing playing; pause ignored");
            return Ok(());
        }

        if let Err(err) = self.media.pause().await {
            if paused.is_some() {
                let mut inner = self.inner.lock();
                if inner.seq == seq && inner.status == PlaybackStatus::Paused {
                    inner.status = PlaybackStatus::Playing;
                }
            }
            warn!(error = %err, "Media element refused to pause");
            return Err(err.into());
        }
        if let Some(track_id) = paused {
            info!(%track_id, "Playback paused");
            self.emit(PlaybackEvent::Paused {
                track_id: track_id.get(),
            });
        }
        Ok(())
    }

    /// Pause when playing, otherwise (re)play the current track.
    pub async fn toggle(&self) -> Result<()> {
        let (status, current) = {
            let inner = self.inner.lock();
            (inner.status, inner.current.clone())
        };

        match (status, current) {
            (PlaybackStatus::Playing, _) => self.pause().await,
            (_, Some(track)) => self.play(track).await.map(|_| ()),
            (_, None) => {
                debug!("No current track; toggle ignored");
                Ok(())
            }
        }
    }

    /// Play the next ready track of the current album. No-op at the end.
    pub async fn next(&self) -> Result<Option<PlayOutcome>> {
        self.step(Step::Next).await
    }

    /// Play the previous ready track of the current album. No-op at the start.
    pub async fn prev(&self) -> Result<Option<PlayOutcome>> {
        self.step(Step::Prev).await
    }

    /// Seek relative to the current position; ignored when nothing is loaded.
    pub async fn seek_by(&self, seconds: f64) -> Result<()> {
        if self.inner.lock().loaded.is_none() {
            debug!(seconds, "No source loaded; seek ignored");
            return Ok(());
        }
        self.media.seek_by(seconds).await?;
        Ok(())
    }

    /// Reconcile state with something the media element did on its own.
    pub fn handle_media_event(&self, event: MediaEvent) {
        let emitted = {
            let mut inner = self.inner.lock();
            let current = inner.current.as_ref().map(|track| track.id.get());
            match (event, inner.status) {
                (MediaEvent::Play, PlaybackStatus::Paused) => {
                    inner.status = PlaybackStatus::Playing;
                    current.map(|track_id| PlaybackEvent::Resumed { track_id })
                }
                (MediaEvent::Pause, PlaybackStatus::Playing) => {
                    inner.status = PlaybackStatus::Paused;
                    current.map(|track_id| PlaybackEvent::Paused { track_id })
                }
                (MediaEvent::Ended, PlaybackStatus::Playing | PlaybackStatus::Paused) => {
                    inner.status = PlaybackStatus::Paused;
                    current.map(|track_id| PlaybackEvent::Completed { track_id })
                }
                (MediaEvent::Play | MediaEvent::Pause, PlaybackStatus::Loading) => {
                    let resume = if event == MediaEvent::Play {
                        PlaybackStatus::Playing
                    } else {
                        PlaybackStatus::Paused
                    };
                    if let Some(pending) = inner.pending.as_mut() {
                        if pending.resume != PlaybackStatus::Idle {
                            pending.resume = resume;
                        }
                    }
                    None
                }
                _ => None,
            }
        };

        debug!(?event, "Media event");
        if let Some(event) = emitted {
            self.emit(event);
        }
    }

    /// Feed element events into [`handle_media_event`](Self::handle_media_event)
    /// until the sender is dropped.
    pub async fn pump_media_events(&self, mut events: UnboundedReceiver<MediaEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_media_event(event);
        }
        debug!(session = %self.id, "Media event channel closed");
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let inner = self.inner.lock();
        PlaybackSnapshot {
            status: inner.status,
            current_track: inner.current.clone(),
            is_playing: inner.status == PlaybackStatus::Playing,
            loading_track_id: inner.pending.map(|pending| pending.track_id),
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.inner.lock().status
    }

    pub fn current_track(&self) -> Option<Track> {
        self.inner.lock().current.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().status == PlaybackStatus::Playing
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn step(&self, step: Step) -> Result<Option<PlayOutcome>> {
        let Some(current) = self.current_track() else {
            debug!(?step, "No current track; navigation ignored");
            return Ok(None);
        };

        let tracks = self
            .tracks
            .album_tracks(current.album_id)
            .filter(|tracks| !tracks.is_empty())
            .or_else(|| current.album.as_ref().map(|album| album.tracks.clone()));
        let Some(tracks) = tracks else {
            debug!(album_id = %current.album_id, "Album track list unknown; navigation ignored");
            return Ok(None);
        };

        let target = match step {
            Step::Next => next_ready(&tracks, current.id),
            Step::Prev => prev_ready(&tracks, current.id),
        };
        match target {
            Some(track) => self.play(track.clone()).await.map(Some),
            None => {
                debug!(?step, track_id = %current.id, "No ready track in that direction");
                Ok(None)
            }
        }
    }

    async fn resolve_and_start(&self, track: Track) -> Result<PlayOutcome> {
        let track_id = track.id;
        let seq = {
            let mut inner = self.inner.lock();
            if inner
                .pending
                .is_some_and(|pending| pending.track_id == track_id)
            {
                debug!("Stream already resolving");
                return Ok(PlayOutcome::AlreadyLoading);
            }

            // A superseded load keeps the original fallback
            let resume = inner.pending.map_or(inner.status, |pending| pending.resume);
            let seq = inner.next_seq();
            inner.pending = Some(PendingResolution {
                track_id,
                seq,
                resume,
            });
            inner.status = PlaybackStatus::Loading;
            seq
        };

        let mut guard = CancelGuard::new(&self.inner, seq, PlayStage::Resolving);
        info!("Resolving stream URL");
        self.emit(PlaybackEvent::Loading {
            track_id: track_id.get(),
        });

        let result = self.api.get_track(track_id).await;
        guard.disarm();

        let resolved = {
            let mut inner = self.inner.lock();
            let pending = match inner.pending.take() {
                Some(pending) if pending.seq == seq => pending,
                other => {
                    inner.pending = other;
                    debug!("Discarding superseded stream resolution");
                    return Ok(PlayOutcome::Superseded);
                }
            };

            match result {
                Ok(resolved) if resolved.has_stream_url() => Ok(resolved),
                Ok(_) => {
                    inner.status = pending.resume;
                    Err(PlaybackError::StreamUnavailable(track_id))
                }
                Err(err) => {
                    inner.status = pending.resume;
                    Err(PlaybackError::Resolution(err))
                }
            }
        };

        match resolved {
            Ok(mut resolved) => {
                if resolved.album.is_none() {
                    resolved.album = track.album;
                }
                self.tracks.track_resolved(&resolved);
                self.start(resolved).await
            }
            Err(err) => {
                warn!(error = %err, "Stream resolution failed");
                self.emit(PlaybackEvent::Error {
                    track_id: Some(track_id.get()),
                    message: err.to_string(),
                    recoverable: true,
                });
                Err(err)
            }
        }
    }

    /// Load (if needed) and play a track that has a stream URL.
    async fn start(&self, track: Track) -> Result<PlayOutcome> {
        let Some(url) = track.stream_url().map(str::to_owned) else {
            return Err(PlaybackError::StreamUnavailable(track.id));
        };
        let track_id = track.id;
        let title = track.title.clone();

        let (seq, reload) = {
            let mut inner = self.inner.lock();
            let reload = inner.loaded != Some(track_id);
            if !reload && inner.status == PlaybackStatus::Playing {
                debug!(%track_id, "Track already playing");
                return Ok(PlayOutcome::Resumed);
            }
            let seq = inner.next_seq();
            inner.pending = None;
            inner.current = Some(track);
            (seq, reload)
        };

        let stage = if reload {
            PlayStage::Loading
        } else {
            PlayStage::Starting
        };
        let mut guard = CancelGuard::new(&self.inner, seq, stage);

        if reload {
            let loaded = self.media.load(&url).await;
            guard.disarm();
            if let Err(err) = loaded {
                return Err(self.media_failed(seq, track_id, err, true));
            }
            {
                let mut inner = self.inner.lock();
                if inner.seq != seq {
                    return Ok(PlayOutcome::Superseded);
                }
                inner.loaded = Some(track_id);
            }
            guard = CancelGuard::new(&self.inner, seq, PlayStage::Starting);
        }

        let played = self.media.play().await;
        guard.disarm();
        if let Err(err) = played {
            return Err(self.media_failed(seq, track_id, err, false));
        }

        // The element's own `Play` event may already have moved the status
        let was_playing = {
            let mut inner = self.inner.lock();
            if inner.seq != seq {
                return Ok(PlayOutcome::Superseded);
            }
            let was_playing = inner.status == PlaybackStatus::Playing;
            inner.status = PlaybackStatus::Playing;
            was_playing
        };

        if reload {
            info!(%track_id, url = %redact_stream_url(&url), "Playback started");
            self.emit(PlaybackEvent::Started {
                track_id: track_id.get(),
                title,
            });
            Ok(PlayOutcome::Started)
        } else {
            if !was_playing {
                info!(%track_id, "Playback resumed");
                self.emit(PlaybackEvent::Resumed {
                    track_id: track_id.get(),
                });
            }
            Ok(PlayOutcome::Resumed)
        }
    }

    fn media_failed(
        &self,
        seq: u64,
        track_id: TrackId,
        err: BridgeError,
        source_lost: bool,
    ) -> PlaybackError {
        {
            let mut inner = self.inner.lock();
            if inner.seq == seq {
                inner.status = PlaybackStatus::Paused;
                if source_lost {
                    inner.loaded = None;
                }
            }
        }

        warn!(%track_id, error = %err, "Media element refused playback");
        self.emit(PlaybackEvent::Error {
            track_id: Some(track_id.get()),
            message: err.to_string(),
            recoverable: err.is_transient(),
        });
        PlaybackError::Media(err)
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(events) = &self.events {
            // No subscribers is not an error
            let _ = events.emit(CoreEvent::Playback(event));
        }
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("status", &inner.status)
            .field("current", &inner.current.as_ref().map(|track| track.id))
            .field("loading", &inner.pending.map(|pending| pending.track_id))
            .finish()
    }
}
