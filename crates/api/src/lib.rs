//! HTTP API: access-control middleware, token endpoints and service wiring.

pub mod app;
pub mod context;
pub mod middleware;
