use std::time::Duration;

use hostwatch_core::alerting::DEFAULT_CALL_TIMEOUT;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long open connections may drain after a shutdown signal.
    pub shutdown_timeout_secs: u64,
    /// PostgreSQL URL. When absent alerts live in memory only.
    pub database_url: Option<String>,
    /// Reported hostname; defaults to the OS hostname.
    pub hostname: Option<String>,
    /// Bound on a single storage or sampling call, in seconds (default: `10`).
    pub store_call_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                    |
    /// | `DATABASE_URL`            | unset (in-memory store) |
    /// | `HOSTWATCH_HOSTNAME`      | unset (OS hostname)     |
    /// | `STORE_CALL_TIMEOUT_SECS` | `10`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
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

        let store_call_timeout_secs: u64 = std::env::var("STORE_CALL_TIMEOUT_SECS")
            .map(|v| v.parse().expect("STORE_CALL_TIMEOUT_SECS must be a valid u64"))
            .unwrap_or(DEFAULT_CALL_TIMEOUT.as_secs());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url: non_empty_var("DATABASE_URL"),
            hostname: non_empty_var("HOSTWATCH_HOSTNAME"),
            store_call_timeout_secs,
        }
    }

    pub fn store_call_timeout(&self) -> Duration {
        Duration::from_secs(self.store_call_timeout_secs.max(1))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
