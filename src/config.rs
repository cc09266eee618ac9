//! JSON configuration file loading.
//!
//! The process reads one JSON document at startup (default `config.json`)
//! with four sections: `server`, `database`, `auth`, and `log`. Sections may
//! be omitted entirely and fall back to defaults; a section that is present
//! but malformed (wrong type, missing required key) is a startup error.
//!
//! ```json
//! {
//!   "server":   { "host": "0.0.0.0", "port": 8080, "threads": 4 },
//!   "database": { "host": "127.0.0.1", "port": 3306, "user": "root",
//!                 "password": "...", "dbname": "tunedeck",
//!                 "pool_size": 5, "connection_timeout_secs": 3 },
//!   "auth":     { "secret": "...", "expire_secs": 86400, "issuer": "tunedeck" },
//!   "log":      { "level": "info", "path": "logs/app.log" }
//! }
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Listener configuration: bind address, port, worker-thread count.
/// Immutable after process start.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Number of scheduler worker threads driving the coroutine runtime.
    #[serde(default = "default_server_threads")]
    pub threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_user")]
    pub user: String,
    pub password: String,
    pub dbname: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Timeout applied to every pool acquisition.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 signing secret for issued tokens.
    pub secret: String,
    #[serde(default = "default_expire_secs")]
    pub expire_secs: u64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file path; when absent, log lines go to stdout.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            path: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_server_host(),
            port: default_server_port(),
            threads: default_server_threads(),
        }
    }
}

/// Top-level application configuration.
///
/// `database` and `auth` have no sensible defaults (credentials and signing
/// secrets must be explicit), so the whole load fails if those sections are
/// missing.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Load and parse the configuration file. Any failure here is fatal to
    /// process startup.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to open config file {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Parse a configuration document from a JSON string.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_json::from_str(raw)?;
        Ok(config)
    }

    /// Address string the listener binds to, e.g. `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_server_threads() -> usize {
    4
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_user() -> String {
    "root".to_string()
}

fn default_pool_size() -> usize {
    5
}

fn default_connection_timeout_secs() -> u64 {
    3
}

fn default_expire_secs() -> u64 {
    86_400
}

fn default_issuer() -> String {
    "tunedeck".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
