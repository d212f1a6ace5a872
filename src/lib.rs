//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-catalog`, `core-playback`). Host
//! applications can depend on `cpc-workspace` and enable the documented
//! features without needing to wire each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "catalog")]
pub use core_catalog as catalog;

#[cfg(feature = "playback")]
pub use core_playback as playback;
