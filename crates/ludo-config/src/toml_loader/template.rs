//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Ludo relay configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[server]
# host = "0.0.0.0"
# ws_port = 8000          # overridden by $PORT
# api_port = 8001         # overridden by $LUDO_API_PORT

[relay]
# outbound_buffer = 256   # 1-65536 queued frames per connection
# send_timeout_ms = 1000  # 10-60000
# handshake_timeout_secs = 10   # 1-120
# max_frame_bytes = 1048576     # 1024-16777216

[rooms]
# max_players = 4         # 2-4

[logging]
# level = "INFO"          # DEBUG, INFO, WARNING, ERROR
# json = false
"##
    .to_string()
}
