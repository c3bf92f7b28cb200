//! Shared types

pub mod error;

pub use error::{AgriError, Result};
