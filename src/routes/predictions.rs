//! Prediction history endpoints
//!
//! - GET /api/predictions/history  - `?date=YYYY-MM-DD&limit=&offset=`
//! - GET /api/predictions/stats
//! - GET /api/predictions/{id}
//! - GET /api/images/{path}        - Stored uploads

use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::warn;

use crate::classifier::remote::content_type_for;
use crate::predictions::{HistoryQuery, PredictionRecord, PredictionStats};
use crate::routes::response::{
    agri_error_response, bytes_response, error_response, parse_query, success_response,
    timestamp, BoxBody,
};
use crate::server::AppState;

#[derive(Serialize)]
struct PredictionDetails {
    prediction: PredictionRecord,
}

#[derive(Serialize)]
struct StatsResponse {
    stats: PredictionStats,
    timestamp: String,
}

/// GET /api/predictions/history
pub async fn prediction_history(state: &AppState, query: Option<&str>) -> Response<BoxBody> {
    let query: HistoryQuery = match parse_query(query) {
        Ok(q) => q,
        Err(e) => return agri_error_response(&e),
    };

    match state.predictions.history(&query).await {
        Ok(page) => success_response(page),
        Err(e) => agri_error_response(&e),
    }
}

/// GET /api/predictions/{id}
pub async fn prediction_details(state: &AppState, id: &str) -> Response<BoxBody> {
    match state.predictions.find(id).await {
        Ok(Some(prediction)) => success_response(PredictionDetails { prediction }),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            "Prediction not found",
            Some("PREDICTION_NOT_FOUND"),
        ),
        Err(e) => agri_error_response(&e),
    }
}

/// GET /api/predictions/stats
pub async fn prediction_stats(state: &AppState) -> Response<BoxBody> {
    match state.predictions.stats().await {
        Ok(stats) => success_response(StatsResponse {
            stats,
            timestamp: timestamp(),
        }),
        Err(e) => agri_error_response(&e),
    }
}

/// GET /api/images/{path}
pub async fn serve_image(state: &AppState, relative: &str) -> Response<BoxBody> {
    match state.images.read(relative).await {
        Ok(Some(bytes)) => bytes_response(content_type_for(relative), bytes),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Image not found", None),
        Err(e) => {
            warn!(path = %relative, error = %e, "Image read failed");
            agri_error_response(&e)
        }
    }
}
