//! AgriGuard - crop disease diagnosis backend
//!
//! Turns a classifier label for a maize leaf photo into actionable
//! knowledge: the disease record, its vectors and pathogens, and
//! priority-ordered treatments.
//!
//! ## Services
//!
//! - **Resolution**: disease records from MongoDB, or from a static JSON
//!   file when MongoDB is unreachable at startup
//! - **Classification**: uploads sent to an inference service, joined with
//!   the disease record, logged with the stored image
//! - **Accounts**: farmer registration and JWT sessions

pub mod auth;
pub mod classifier;
pub mod config;
pub mod db;
pub mod diseases;
pub mod predictions;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{AgriError, Result};
