//! Integration tests for logging system

use bridge_traits::log::LogLevel;
use core_runtime::logging::{
    init_logging, redact_if_sensitive, redact_stream_url, strip_path, LogFormat, LoggingConfig,
};
use core_runtime::Error;

#[test]
fn test_logging_initializes_once() {
    // Only one global subscriber per process
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_spans(false);

    init_logging(config.clone()).unwrap();

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::Logging(_))));

    tracing::debug!(target: "core_catalog::pager", page = 2u64, "Logging is live");
}

#[test]
fn test_sensitive_fields_are_redacted() {
    assert_eq!(redact_if_sensitive("api_key", "k-1"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("auth_token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("url_signature", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("album_id", "42"), "42");
}

#[test]
fn test_signed_stream_urls_lose_query() {
    let signed = "https://cdn.example.com/streams/albums/3/01.mp3?Expires=1700000000&Signature=xyz";
    let redacted = redact_stream_url(signed);

    assert_eq!(redacted, "https://cdn.example.com/streams/albums/3/01.mp3");
    assert!(!redacted.contains("Signature"));
    assert_eq!(strip_path(&redacted), "01.mp3");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Warn)
        .with_redaction(false)
        .with_filter("core_playback=trace")
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact);
    assert_eq!(config.filter.as_deref(), Some("core_playback=trace"));
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
