//! Health and model status endpoints
//!
//! - GET /api/health       - Liveness plus which store is serving
//! - GET /api/stats/model  - Classifier and disease database overview

use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::diseases::StoreSource;
use crate::routes::response::{json_response, success_response, timestamp, BoxBody};
use crate::server::AppState;

/// What the service can currently classify and resolve
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model_loaded: bool,
    pub classes_supported: Vec<String>,
    pub diseases_in_db: usize,
    pub database_source: StoreSource,
    pub mongodb_available: bool,
}

impl ModelInfo {
    pub async fn collect(state: &AppState) -> Self {
        let source = state.diseases.source();
        Self {
            model_loaded: state.classifier.is_some(),
            classes_supported: state.class_names().await,
            diseases_in_db: state.diseases.get_all_diseases().await.len(),
            database_source: source,
            mongodb_available: source == StoreSource::Document,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    #[serde(flatten)]
    pub model: ModelInfo,
    pub timestamp: String,
}

/// GET /api/health
pub async fn health_check(state: &AppState) -> Response<BoxBody> {
    let response = HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        uptime: state.started_at.elapsed().as_secs(),
        model: ModelInfo::collect(state).await,
        timestamp: timestamp(),
    };

    json_response(StatusCode::OK, &response)
}

#[derive(Serialize)]
struct ModelStats {
    #[serde(flatten)]
    model: ModelInfo,
    total_classes: usize,
}

#[derive(Serialize)]
struct ModelStatsResponse {
    model_stats: ModelStats,
    metadata: Value,
    build_time: &'static str,
    timestamp: String,
}

/// GET /api/stats/model
pub async fn model_stats(state: &AppState) -> Response<BoxBody> {
    let model = ModelInfo::collect(state).await;
    let total_classes = model.classes_supported.len();

    success_response(ModelStatsResponse {
        model_stats: ModelStats {
            model,
            total_classes,
        },
        metadata: state.diseases.get_metadata().await,
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        timestamp: timestamp(),
    })
}
