//! HTTP gateway for the GuiasMEI backend.
//!
//! Serves health/readiness endpoints, the Sicoob webhook intake and the
//! assistant chat API, and runs the notification worker as a background
//! task alongside the server.

pub mod routes;
pub mod server;
pub mod webhook;

pub use server::{build_router, start, AppState};
