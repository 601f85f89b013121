//! Validation for the assistant and connection sections.

use crate::schema::QuillConfig;

use super::helpers::{validate_path, validate_range};

/// Validate endpoint and timeout settings of the assistant section.
pub(crate) fn validate_assistant(errors: &mut Vec<String>, config: &QuillConfig) {
    let assistant = &config.assistant;

    if !(assistant.base_url.starts_with("http://") || assistant.base_url.starts_with("https://"))
    {
        errors.push(format!(
            "assistant.base_url = {:?} must start with http:// or https://",
            assistant.base_url
        ));
    }
    validate_path(errors, "assistant.ask_path", &assistant.ask_path);
    validate_path(errors, "assistant.stream_path", &assistant.stream_path);
    validate_path(errors, "assistant.channel_path", &assistant.channel_path);

    validate_range(
        errors,
        "assistant.request_timeout_secs",
        assistant.request_timeout_secs,
        1,
        600,
    );
    validate_range(
        errors,
        "assistant.connect_timeout_secs",
        assistant.connect_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "assistant.max_context_turns",
        assistant.max_context_turns,
        0,
        200,
    );

    if assistant.failure_message.trim().is_empty() {
        errors.push("assistant.failure_message must not be empty".into());
    }
}

/// Validate the persistent channel reconnect policy.
pub(crate) fn validate_connection(errors: &mut Vec<String>, config: &QuillConfig) {
    let connection = &config.connection;

    validate_range(
        errors,
        "connection.connect_timeout_secs",
        connection.connect_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "connection.reconnect_delay_ms",
        connection.reconnect_delay_ms,
        10,
        60_000,
    );
    if connection.max_reconnect_delay_ms < connection.reconnect_delay_ms {
        errors.push(format!(
            "connection.max_reconnect_delay_ms = {} must be >= connection.reconnect_delay_ms = {}",
            connection.max_reconnect_delay_ms, connection.reconnect_delay_ms
        ));
    }
    validate_range(
        errors,
        "connection.max_reconnect_delay_ms",
        connection.max_reconnect_delay_ms,
        10,
        300_000,
    );
}
