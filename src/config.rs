//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`), with defaults matching the paths the
//! original getwork convention hardcodes.

use std::net::SocketAddr;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8332`).
    pub listen_addr: SocketAddr,

    /// Primary getwork endpoint path.
    pub getwork_path: String,

    /// Long-poll endpoint path, advertised via `X-Long-Polling`.
    pub longpoll_path: String,

    /// Seconds a long-poll request is held before answering with the
    /// unchanged work template.
    pub longpoll_timeout_secs: u64,

    /// Realm announced in the `WWW-Authenticate: Basic` challenge.
    pub auth_realm: String,

    /// Capacity of each pool session's new-work broadcast channel.
    pub job_bus_capacity: usize,

    /// Worker limit for the built-in backend. `0` means unlimited.
    pub max_workers: usize,

    /// Password required by the built-in backend, if any.
    pub pool_password: Option<String>,

    /// Hex header data served by the built-in backend.
    pub work_data: String,

    /// Hex share target served by the built-in backend.
    pub work_target: String,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `GETWORK_LISTEN_ADDR` is set but cannot be
    /// parsed as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("GETWORK_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8332".to_string())
            .parse()?;

        let getwork_path =
            std::env::var("GETWORK_PATH").unwrap_or_else(|_| "/".to_string());
        let longpoll_path =
            std::env::var("GETWORK_LONGPOLL_PATH").unwrap_or_else(|_| "/longpolling".to_string());

        let longpoll_timeout_secs = parse_env("GETWORK_LONGPOLL_TIMEOUT_SECS", 60);
        let auth_realm =
            std::env::var("GETWORK_AUTH_REALM").unwrap_or_else(|_| "getwork-gateway".to_string());
        let job_bus_capacity = parse_env("GETWORK_JOB_BUS_CAPACITY", 16);
        let max_workers = parse_env("GETWORK_MAX_WORKERS", 0);
        let pool_password = std::env::var("GETWORK_POOL_PASSWORD").ok();

        let work_data =
            std::env::var("GETWORK_WORK_DATA").unwrap_or_else(|_| "00".repeat(128));
        let work_target =
            std::env::var("GETWORK_WORK_TARGET").unwrap_or_else(|_| format!("{}ff", "00".repeat(31)));

        Ok(Self {
            listen_addr,
            getwork_path,
            longpoll_path,
            longpoll_timeout_secs,
            auth_realm,
            job_bus_capacity,
            max_workers,
            pool_password,
            work_data,
            work_target,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
