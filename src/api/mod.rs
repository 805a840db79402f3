//! Read-only HTTP query surface.

pub mod handlers;
pub mod routes;

pub use routes::configure;
