//! Headless media element
//!
//! Desktop hosts without an audio stack of their own (CLI tools, integration
//! harnesses) can drive a playback session against this element. It keeps the
//! transport state in memory and reports every command as a [`MediaEvent`] on a
//! channel, the same way a native element would.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{MediaElement, MediaEvent},
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct HeadlessState {
    pub source: Option<String>,
    pub playing: bool,
    pub position_seconds: f64,
}

pub struct HeadlessMediaElement {
    state: Mutex<HeadlessState>,
    events: mpsc::UnboundedSender<MediaEvent>,
}

impl HeadlessMediaElement {
    /// Create the element and the receiving half of its event channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MediaEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                state: Mutex::new(HeadlessState::default()),
                events: tx,
            },
            rx,
        )
    }

    pub fn state(&self) -> HeadlessState {
        self.state.lock().clone()
    }

    /// Simulate the source running out.
    pub fn finish(&self) {
        {
            let mut state = self.state.lock();
            state.playing = false;
        }
        self.notify(MediaEvent::Ended);
    }

    fn notify(&self, event: MediaEvent) {
        // Receiver dropped means nobody reconciles; commands still apply.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl MediaElement for HeadlessMediaElement {
    async fn load(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.source = Some(url.to_string());
        state.playing = false;
        state.position_seconds = 0.0;
        debug!("Headless element source replaced");
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.source.is_none() {
                return Err(BridgeError::Media("no source loaded".to_string()));
            }
            state.playing = true;
        }
        self.notify(MediaEvent::Play);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.state.lock().playing = false;
        self.notify(MediaEvent::Pause);
        Ok(())
    }

    async fn seek_by(&self, seconds: f64) -> Result<()> {
        let mut state = self.state.lock();
        state.position_seconds = (state.position_seconds + seconds).max(0.0);
        Ok(())
    }
}
