//! # Host Bridge Traits
//!
//! Host capability traits that must be implemented by each embedding platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the catalog player core and the
//! host. Each trait represents a capability the core requires but that is
//! implemented differently per host (desktop, web view, mobile shell).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async JSON-over-HTTP requests against the catalog API
//!
//! ### Playback
//! - [`MediaElement`](media::MediaElement) - The single audio transport bound to a playback session
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Capability     | Desktop                         | Web view / mobile        |
//! |----------------|---------------------------------|--------------------------|
//! | `HttpClient`   | `bridge-desktop::ReqwestHttpClient` | injected by host     |
//! | `MediaElement` | injected by host                | native audio element     |
//! | `LoggerSink`   | optional                        | optional                 |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should convert platform errors to `BridgeError` and keep
//! messages actionable (status codes, URLs with secrets stripped).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so that a single handle can be
//! shared between the playback session and the pagination components.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod media;
pub mod log;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use media::{MediaElement, MediaEvent};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
