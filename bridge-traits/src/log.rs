//! Host Log Forwarding
//!
//! The core logs through `tracing`. Hosts that want those records in their
//! own pipeline (the web view console, OSLog, a log file) implement
//! [`LoggerSink`]; `core_runtime::logging` converts each event into a
//! [`LogEntry`] and hands it over.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One forwarded log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Emitting crate or module, e.g. `core_catalog::pager`
    pub target: String,
    pub message: String,
    /// Structured fields, ordered by name
    pub fields: BTreeMap<String, String>,
    /// Id of the innermost span, when spans are forwarded
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }
}

impl fmt::Display for LogEntry {
    /// `2026-01-02 10:00:00.000 INFO core_catalog::pager: message key=value`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.level,
            self.target,
            self.message
        )?;
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Receives log records forwarded from the core.
///
/// Entries arrive already redacted when redaction is enabled in the logging
/// config; implementations must still never persist stream URLs with their
/// query string.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::log::{LoggerSink, LogEntry, LogLevel};
///
/// async fn report(logger: &dyn LoggerSink, error: &str) {
///     let entry = LogEntry::new(LogLevel::Error, "core_playback", error)
///         .with_field("track_id", "42");
///     logger.log(entry).await.ok();
/// }
/// ```
#[async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Entries below this level are dropped before they are built.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Sink that prints entries to stdout; for development and demos.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

#[async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level >= self.min_level {
            println!("{}", entry);
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels_are_ordered() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(ConsoleLogger::default().min_level(), LogLevel::Info);
    }

    #[test]
    fn test_entry_renders_fields_in_name_order() {
        let entry = LogEntry::new(LogLevel::Warn, "core_catalog::pager", "Album page failed")
            .with_field("status", "503")
            .with_field("genre", "4")
            .with_span_id("span-9");

        let line = entry.to_string();
        assert!(line.ends_with("WARN core_catalog::pager: Album page failed genre=4 status=503"));
        assert_eq!(entry.span_id.as_deref(), Some("span-9"));
    }

    #[tokio::test]
    async fn test_console_logger() {
        let logger = ConsoleLogger::new(LogLevel::Info);
        logger
            .log(LogEntry::new(LogLevel::Debug, "test", "Filtered out"))
            .await
            .unwrap();
        logger
            .log(LogEntry::new(LogLevel::Info, "test", "Shown").with_field("page", "2"))
            .await
            .unwrap();
        logger.flush().await.unwrap();
    }
}
