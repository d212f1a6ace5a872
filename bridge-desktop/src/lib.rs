//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with retry and exponential backoff
//! - `MediaElement` as an in-memory headless transport, for hosts that
//!   render audio elsewhere or not at all
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{HeadlessMediaElement, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let (element, media_events) = HeadlessMediaElement::new();
//!
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod http;
mod media;

pub use http::{DesktopHttpConfig, ReqwestHttpClient};
pub use media::{HeadlessMediaElement, HeadlessState};
