//! Error types for AgriGuard
//!
//! One enum for the whole service. Disease lookups downgrade most of these
//! to "nothing found" before they reach a route; startup configuration
//! errors are the only ones allowed to stop the process.

use hyper::StatusCode;

/// Main error type for AgriGuard operations
#[derive(Debug, thiserror::Error)]
pub enum AgriError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored record lacks its id or name
    #[error("Malformed record '{id}': {reason}")]
    MalformedRecord { id: String, reason: String },

    /// Backing store unreachable after startup
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl AgriError {
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::MalformedRecord { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Classifier(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<std::io::Error> for AgriError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AgriError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for AgriError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for AgriError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for AgriError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON encode error: {}", err))
    }
}

impl From<bson::de::Error> for AgriError {
    fn from(err: bson::de::Error) -> Self {
        Self::Database(format!("BSON decode error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for AgriError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

impl From<reqwest::Error> for AgriError {
    fn from(err: reqwest::Error) -> Self {
        Self::Classifier(err.to_string())
    }
}

/// Result type alias for AgriGuard operations
pub type Result<T> = std::result::Result<T, AgriError>;
