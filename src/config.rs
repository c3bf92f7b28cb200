//! Configuration for AgriGuard
//!
//! CLI arguments and environment variable handling using clap. A `.env`
//! file is loaded by `main` before parsing.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::JwtValidator;
use crate::diseases::StoreConfig;

/// AgriGuard - crop disease diagnosis backend
#[derive(Parser, Debug, Clone)]
#[command(name = "agriguard")]
#[command(about = "Crop disease classification and treatment knowledge service")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Enable development mode (fixed JWT secret when none is given)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI; empty skips the document store entirely
    #[arg(long, env = "MONGODB_URL", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "DATABASE_NAME", default_value = "agriguard_db")]
    pub database_name: String,

    /// Bound on the startup probe of the document store
    #[arg(long, env = "MONGODB_PROBE_TIMEOUT_MS", default_value = "5000")]
    pub probe_timeout_ms: u64,

    /// Static disease database used when MongoDB is unavailable
    #[arg(long, env = "DISEASES_JSON", default_value = "data/diseases_database.json")]
    pub diseases_json: PathBuf,

    /// Keep serving with no disease data if the static file cannot be read
    #[arg(long, env = "SERVE_EMPTY", default_value = "false")]
    pub serve_empty: bool,

    /// Inference service endpoint (classification disabled when unset)
    #[arg(long, env = "CLASSIFIER_URL")]
    pub classifier_url: Option<String>,

    /// Comma-separated model labels, in class id order
    /// Falls back to the disease id list of the active store
    #[arg(long, env = "CLASS_NAMES")]
    pub class_names: Option<String>,

    /// Inference request timeout in milliseconds
    #[arg(long, env = "CLASSIFIER_TIMEOUT_MS", default_value = "30000")]
    pub classifier_timeout_ms: u64,

    /// JWT secret for token signing (account routes disabled without one)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_TTL_SECS", default_value = "86400")]
    pub access_token_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "REFRESH_TOKEN_TTL_SECS", default_value = "2592000")]
    pub refresh_token_ttl_secs: u64,

    /// Root of permanent upload storage
    #[arg(long, env = "IMAGE_STORAGE_DIR", default_value = "storage/images")]
    pub image_dir: PathBuf,

    /// Root of the prediction JSON logs
    #[arg(long, env = "PREDICTIONS_DIR", default_value = "storage/predictions")]
    pub predictions_dir: PathBuf,

    /// Largest accepted upload body
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value = "16777216")]
    pub max_upload_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            mongodb_uri: Some(self.mongodb_uri.trim().to_string()).filter(|uri| !uri.is_empty()),
            database_name: self.database_name.clone(),
            probe_timeout: self.probe_timeout(),
            static_path: self.diseases_json.clone(),
            serve_empty: self.serve_empty,
        }
    }

    /// Explicit class names, if configured
    pub fn class_name_list(&self) -> Option<Vec<String>> {
        let names: Vec<String> = self
            .class_names
            .as_deref()?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        (!names.is_empty()).then_some(names)
    }

    /// Token validator; `None` when no secret is available outside dev mode
    pub fn jwt_validator(&self) -> Option<JwtValidator> {
        match self.jwt_secret.clone() {
            Some(secret) => JwtValidator::new(
                secret,
                self.access_token_ttl_secs,
                self.refresh_token_ttl_secs,
            )
            .ok(),
            None if self.dev_mode => Some(JwtValidator::new_dev(
                self.access_token_ttl_secs,
                self.refresh_token_ttl_secs,
            )),
            None => None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(secret) = &self.jwt_secret {
            if secret.len() < 32 {
                return Err("JWT_SECRET must be at least 32 characters".to_string());
            }
        }

        if self.probe_timeout_ms == 0 {
            return Err("MONGODB_PROBE_TIMEOUT_MS must be greater than zero".to_string());
        }

        if let Some(url) = &self.classifier_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("CLASSIFIER_URL must be an http(s) URL".to_string());
            }
        }

        Ok(())
    }
}
