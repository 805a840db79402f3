//! Real-time push channel for connected dashboard viewers.

pub mod server;
pub mod session;

pub use server::{Broadcaster, EventSink, OutboundEvent};
pub use session::ws_route;
