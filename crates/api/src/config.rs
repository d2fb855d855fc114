use crate::ws::keepalive::DEFAULT_KEEPALIVE_INTERVAL_SECS;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight requests to drain (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Interval between keepalive pings to unlocked devices (default: `60`).
    pub keepalive_interval_secs: u64,
    /// Argon2id PHC hash of the administrator password. When unset every
    /// administrative request is rejected.
    pub admin_password_hash: Option<String>,
    /// PostgreSQL connection string. When unset the in-memory stores are used.
    pub database_url: Option<String>,
    /// Clear expiring keys and stale session records at startup (default: `true`).
    pub reset_stores_on_start: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `8080`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                    |
    /// | `KEEPALIVE_INTERVAL_SECS` | `60`                    |
    /// | `ADMIN_PASSWORD_HASH`     | unset                   |
    /// | `DATABASE_URL`            | unset                   |
    /// | `RESET_STORES_ON_START`   | `true`                  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let keepalive_interval_secs: u64 = std::env::var("KEEPALIVE_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_KEEPALIVE_INTERVAL_SECS.to_string())
            .parse()
            .expect("KEEPALIVE_INTERVAL_SECS must be a valid u64");
        assert!(
            keepalive_interval_secs > 0,
            "KEEPALIVE_INTERVAL_SECS must be greater than 0"
        );

        let admin_password_hash = non_empty_var("ADMIN_PASSWORD_HASH");
        if admin_password_hash.is_none() {
            tracing::warn!("ADMIN_PASSWORD_HASH is not set; administrative API is disabled");
        }

        let database_url = non_empty_var("DATABASE_URL");

        let reset_stores_on_start: bool = std::env::var("RESET_STORES_ON_START")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("RESET_STORES_ON_START must be true or false");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            keepalive_interval_secs,
            admin_password_hash,
            database_url,
            reset_stores_on_start,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
