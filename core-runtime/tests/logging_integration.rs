//! Integration tests for the logging setup

use bridge_traits::log::LogLevel;
use core_runtime::logging::{
    init_logging, redact_if_sensitive, redact_url, LogFormat, LoggingConfig,
};
use core_runtime::Error;

#[test]
fn test_logging_initialization_once() {
    // Only one global subscriber per process: the second call must fail cleanly
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    assert!(init_logging(config.clone()).is_ok());
    assert!(matches!(
        init_logging(config),
        Err(Error::LoggingInitialized)
    ));

    tracing::debug!(target: "core_playback::session", "logging ready");
}

#[test]
fn test_signed_media_urls_are_redacted() {
    let url = "https://cdn.example.com/audio/track-01.mp3?Expires=1700000000&Signature=abc";
    let redacted = redact_url(url);

    assert_eq!(redacted, "https://cdn.example.com/audio/track-01.mp3?[REDACTED]");
    assert!(!redacted.contains("Signature"));
}

#[test]
fn test_credentials_are_redacted() {
    assert_eq!(redact_if_sensitive("cms_token", "sk-123"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("password", "hunter2"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("api_key", "k"), "[REDACTED]");
}

#[test]
fn test_plain_values_pass_through() {
    assert_eq!(redact_if_sensitive("album_id", "alb-7"), "alb-7");
    assert_eq!(redact_if_sensitive("title", "Night Drive"), "Night Drive");
    assert_eq!(redact_if_sensitive("track_index", "3"), "3");
}
