//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = QuillConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_non_http_base_url() {
    let mut config = QuillConfig::default();
    config.assistant.base_url = "ftp://example.com".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("assistant.base_url"));
}

#[test]
fn catches_relative_paths() {
    let mut config = QuillConfig::default();
    config.assistant.stream_path = "chat/stream".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("assistant.stream_path"));
}

#[test]
fn catches_zero_request_timeout() {
    let mut config = QuillConfig::default();
    config.assistant.request_timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("assistant.request_timeout_secs"));
}

#[test]
fn catches_context_window_too_large() {
    let mut config = QuillConfig::default();
    config.assistant.max_context_turns = 500;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("assistant.max_context_turns"));
}

#[test]
fn catches_blank_failure_message() {
    let mut config = QuillConfig::default();
    config.assistant.failure_message = "   ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("assistant.failure_message"));
}

#[test]
fn catches_max_delay_below_base_delay() {
    let mut config = QuillConfig::default();
    config.connection.reconnect_delay_ms = 5000;
    config.connection.max_reconnect_delay_ms = 1000;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("connection.max_reconnect_delay_ms"));
}

#[test]
fn constant_backoff_is_valid() {
    let mut config = QuillConfig::default();
    config.connection.reconnect_delay_ms = 2000;
    config.connection.max_reconnect_delay_ms = 2000;
    assert!(validate(&config).is_ok());
}

#[test]
fn collects_multiple_errors() {
    let mut config = QuillConfig::default();
    config.assistant.ask_path = "chat".into();
    config.connection.connect_timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("assistant.ask_path"));
    assert!(err.contains("connection.connect_timeout_secs"));
    assert!(err.contains("; "));
}
