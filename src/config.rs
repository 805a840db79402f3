//! Application configuration.
//!
//! Settings are layered: built-in defaults suitable for local/demo operation,
//! then optional `config/default.toml` and `config/<env>.toml` files, then
//! environment variables (`VITALBOARD_SERVER__PORT` and friends, with `__`
//! separating section from key).

use config::{ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
    pub websocket: WebSocketConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Insert a fixed set of demo patients at startup when the directory is
    /// empty.
    pub seed_demo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// WebSocket endpoint of the telemetry broker.
    pub broker_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Seconds between heartbeat pings to connected viewers.
    pub ping_interval: u64,
}

pub fn load_config() -> Result<Config, ConfigError> {
    let env = std::env::var("VITALBOARD_ENV").unwrap_or_else(|_| "development".into());

    config::Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080_i64)?
        .set_default("database.url", "sqlite:vitalboard.db")?
        .set_default("database.seed_demo", false)?
        .set_default("telemetry.broker_url", "ws://localhost:9001")?
        .set_default("telemetry.username", "")?
        .set_default("telemetry.password", "")?
        .set_default("websocket.ping_interval", 30_i64)?
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{env}")).required(false))
        .add_source(Environment::with_prefix("VITALBOARD").separator("__"))
        .build()?
        .try_deserialize()
}
