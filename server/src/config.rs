use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8081/cad/api";
pub const DEFAULT_SYNC_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MANIFEST_REFRESH_SECS: u64 = 3600; // hourly
pub const DEFAULT_BROADCAST_BUFFER: usize = 256;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const SSE_KEEPALIVE_SECS: u64 = 15;

pub fn api_base_url() -> String {
    std::env::var("CAD_API_BASE_URL")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
}

pub fn api_token() -> Option<String> {
    std::env::var("CAD_API_TOKEN")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Patrol group to sync on startup. Without one the coordinator idles in `SyncMode::None`.
pub fn initial_patrol_group() -> Option<String> {
    std::env::var("CAD_PATROL_GROUP")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn sync_poll_interval() -> Duration {
    positive_secs("SYNC_POLL_INTERVAL_SECS", DEFAULT_SYNC_POLL_INTERVAL_SECS)
}

pub fn manifest_refresh_interval() -> Duration {
    positive_secs("MANIFEST_REFRESH_SECS", DEFAULT_MANIFEST_REFRESH_SECS)
}

pub fn upstream_http_timeout() -> Duration {
    positive_secs(
        "UPSTREAM_HTTP_TIMEOUT_SECS",
        DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS,
    )
}

pub fn upstream_connect_timeout() -> Duration {
    positive_secs(
        "UPSTREAM_CONNECT_TIMEOUT_SECS",
        DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS,
    )
}

pub fn event_broadcast_buffer() -> usize {
    std::env::var("EVENT_BROADCAST_BUFFER")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BROADCAST_BUFFER)
}

pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub fn db_max_connections() -> u32 {
    std::env::var("DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
}

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

fn positive_secs(key: &str, default_secs: u64) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}
