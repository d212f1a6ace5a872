//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the catalog player core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! Every other `core-*` crate depends on this one for its error conventions,
//! logging setup and the [`EventBus`](events::EventBus) it publishes on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
