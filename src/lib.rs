//! Vitalboard core library
//!
//! Backend for a real-time patient vitals dashboard: telemetry messages from
//! an IoT broker flow through the ingestion pipeline into the reading store,
//! and every update fans out to connected viewers over WebSocket. A small
//! read-only HTTP API serves the patient directory and recent readings.

use actix::Addr;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod telemetry;
pub mod websocket;

/// Shared application state handed to every request handler.
pub struct AppState {
    pub db: db::Database,
    pub broadcaster: Addr<websocket::Broadcaster>,
    pub config: config::Config,
}
