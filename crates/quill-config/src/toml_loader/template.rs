//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Quill Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[assistant]
# single-shot | chunked-stream | persistent-channel
transport = "chunked-stream"
# base_url = "http://localhost:8000"
# ask_path = "/chat"
# stream_path = "/chat/stream"
# channel_path = "/ws"          # client id is appended: /ws/<client-id>
# request_timeout_secs = 120    # 1-600
# connect_timeout_secs = 10     # 1-120
# max_context_turns = 20        # 0-200
# failure_message = "Sorry, I couldn't get an answer right now. Please try again."

[connection]
# connect_timeout_secs = 15         # 1-120
# reconnect_delay_ms = 1000         # 10-60000, doubles after each failure
# max_reconnect_delay_ms = 30000    # >= reconnect_delay_ms

[logging]
# level = "INFO"                # TRACE, DEBUG, INFO, WARNING, ERROR
# filter = "reqwest=warn,tungstenite=warn"
"##
    .to_string()
}
