//! Prediction history
//!
//! Each classification is kept as a `PredictionRecord`: in daily and global
//! JSON logs on disk, and in MongoDB when the document store is active. The
//! uploaded image is kept next to it under a dated folder.

pub mod images;
pub mod log;
pub mod stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::{Classification, DiseaseSummary};
use crate::diseases::StoreSource;

pub use images::{allowed_file, secure_filename, ImageStore, SavedImage};
pub use log::{HistoryPage, HistoryQuery, PredictionLog, GLOBAL_LOG_CAPACITY};
pub use stats::PredictionStats;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetadata {
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub image_saved: bool,
    #[serde(default)]
    pub authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub prediction_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub original_filename: String,
    #[serde(default)]
    pub processed_filename: Option<String>,
    /// Relative to the image root
    #[serde(default)]
    pub image_path: Option<String>,
    pub file_size: u64,
    pub classification: Classification,
    #[serde(default)]
    pub disease_info: Option<DiseaseSummary>,
    pub database_source: StoreSource,
    #[serde(default)]
    pub metadata: PredictionMetadata,
}

impl PredictionRecord {
    /// `YYYY-MM-DD` of the prediction, used to pick its daily log
    pub fn date(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }
}
