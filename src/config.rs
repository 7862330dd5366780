use lazy_static::lazy_static;

pub struct Config {
    pub api_base_url: String,
    /// `DATABASE_URL` if set (postgres://... or sqlite://...), otherwise falls
    /// back to a local sqlite file at `SPACETRADERS_DB_PATH`.
    pub database_url: String,
    pub daemon_socket_path: String,
    /// Waypoint cache entry lifetime, in seconds. Default 2h per the
    /// open question on cache staleness vs. request volume.
    pub waypoint_cache_ttl_secs: u64,
    pub rate_limit_capacity: u32,
    pub rate_limit_window_ms: u64,
    pub container_restart_backoff_base_ms: u64,
    pub container_restart_backoff_max_ms: u64,
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

lazy_static! {
    pub static ref CONFIG: Config = {
        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            let path = std::env::var("SPACETRADERS_DB_PATH")
                .unwrap_or_else(|_| "spacetraders.db".to_string());
            format!("sqlite://{}?mode=rwc", path)
        });
        let daemon_socket_path = std::env::var("SPACETRADERS_DAEMON_SOCKET")
            .unwrap_or_else(|_| "var/daemon.sock".to_string());
        Config {
            api_base_url: std::env::var("SPACETRADERS_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.spacetraders.io/v2".to_string()),
            database_url,
            daemon_socket_path,
            waypoint_cache_ttl_secs: env_u64("SPACETRADERS_WAYPOINT_CACHE_TTL_SECS", 7200),
            rate_limit_capacity: env_u32("SPACETRADERS_RATE_LIMIT_CAPACITY", 2),
            rate_limit_window_ms: env_u64("SPACETRADERS_RATE_LIMIT_WINDOW_MS", 1000),
            container_restart_backoff_base_ms: env_u64("SPACETRADERS_RESTART_BACKOFF_BASE_MS", 500),
            container_restart_backoff_max_ms: env_u64("SPACETRADERS_RESTART_BACKOFF_MAX_MS", 60_000),
        }
    };
}
