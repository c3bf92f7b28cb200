//! HTTP server for AgriGuard

pub mod http;

pub use http::{handle_request, run, AppState};
