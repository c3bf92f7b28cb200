//! Image classification endpoint
//!
//! POST /api/classify
//!
//! Expects:
//! - Body: raw image bytes (png, jpg, jpeg)
//! - Header `X-Filename`: original file name, used for the extension check
//! - Header `X-User-Id`: optional, ignored when a valid access token is sent
//!
//! Flow:
//! 1. Classify through the configured inference service
//! 2. Store the image permanently under its date folder
//! 3. Join the predicted class with the disease database
//! 4. Append to the prediction logs (and MongoDB when active)

use bytes::Bytes;
use chrono::{DateTime, Utc};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::auth::{extract_token_from_header, TokenType};
use crate::classifier::{Classification, Diagnosis, DiseaseSummary};
use crate::db::{PredictionDoc, PREDICTION_COLLECTION};
use crate::diseases::StoreSource;
use crate::predictions::{allowed_file, PredictionMetadata, PredictionRecord};
use crate::routes::response::{
    agri_error_response, error_response, header_str, json_response, read_body, BoxBody,
};
use crate::server::AppState;
use crate::types::{AgriError, Result};

/// A received upload with its request context
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Bytes,
    pub filename: String,
    pub user_id: Option<String>,
    pub authenticated: bool,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageInfo {
    pub image_saved: bool,
    pub prediction_logged: bool,
    pub mongodb_saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyResponse {
    pub success: bool,
    pub prediction_id: String,
    pub timestamp: DateTime<Utc>,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disease_info: Option<DiseaseSummary>,
    pub database_source: StoreSource,
    pub storage_info: StorageInfo,
}

/// Handle POST /api/classify
pub async fn handle_classify(
    req: Request<Incoming>,
    state: &AppState,
    addr: SocketAddr,
) -> Response<BoxBody> {
    let headers = req.headers().clone();

    let filename = match header_str(&headers, "x-filename") {
        Some(name) => name.to_string(),
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "No image selected (missing X-Filename header)",
                Some("NO_FILENAME"),
            )
        }
    };

    if !allowed_file(&filename) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid file type",
            Some("INVALID_FILE_TYPE"),
        );
    }

    let bytes = match read_body(req.into_body(), state.args.max_upload_bytes).await {
        Ok(b) => b,
        Err(e) => return agri_error_response(&e),
    };

    let token_user = extract_token_from_header(header_str(&headers, "authorization"))
        .zip(state.jwt.as_ref())
        .and_then(|(token, jwt)| jwt.verify_token(token, TokenType::Access).claims)
        .map(|claims| claims.user_id);

    let upload = Upload {
        bytes,
        filename,
        authenticated: token_user.is_some(),
        user_id: token_user.or_else(|| header_str(&headers, "x-user-id").map(str::to_string)),
        user_agent: header_str(&headers, "user-agent").map(str::to_string),
        client_ip: Some(addr.ip().to_string()),
    };

    match classify_upload(state, upload).await {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => {
            warn!(error = %e, "Classification failed");
            agri_error_response(&e)
        }
    }
}

/// Classify, store and log one upload
pub async fn classify_upload(state: &AppState, upload: Upload) -> Result<ClassifyResponse> {
    let classifier = state.classifier.as_ref().ok_or_else(|| {
        AgriError::StoreUnavailable("Classification service not configured".into())
    })?;

    if upload.bytes.is_empty() {
        return Err(AgriError::BadRequest("No image provided".into()));
    }

    let classification = classifier.classify(&upload.bytes, &upload.filename).await?;

    let prediction_id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();

    let saved = match state.images.save(&upload.bytes, &upload.filename, now).await {
        Ok(saved) => Some(saved),
        Err(e) => {
            warn!(prediction_id = %prediction_id, error = %e, "Permanent image save failed");
            None
        }
    };

    let diagnosis = Diagnosis::resolve(&state.diseases, classification).await;

    let record = PredictionRecord {
        prediction_id: prediction_id.clone(),
        user_id: upload.user_id,
        timestamp: now,
        original_filename: upload.filename,
        processed_filename: saved.as_ref().map(|s| s.permanent_filename.clone()),
        image_path: saved.as_ref().map(|s| s.relative_path.clone()),
        file_size: upload.bytes.len() as u64,
        classification: diagnosis.classification.clone(),
        disease_info: diagnosis.disease_info.clone(),
        database_source: state.diseases.source(),
        metadata: PredictionMetadata {
            user_agent: upload.user_agent,
            client_ip: upload.client_ip,
            image_saved: saved.is_some(),
            authenticated: upload.authenticated,
        },
    };

    let prediction_logged = match state.predictions.append(&record).await {
        Ok(_) => true,
        Err(e) => {
            warn!(prediction_id = %prediction_id, error = %e, "Prediction log write failed");
            false
        }
    };

    let mongodb_saved = mirror_to_mongo(state, &record).await;

    info!(
        prediction_id = %prediction_id,
        class = %record.classification.predicted_class,
        confidence = record.classification.confidence,
        "Image classified"
    );

    Ok(ClassifyResponse {
        success: true,
        prediction_id,
        timestamp: now,
        classification: diagnosis.classification,
        disease_info: diagnosis.disease_info,
        database_source: record.database_source,
        storage_info: StorageInfo {
            image_saved: saved.is_some(),
            prediction_logged,
            mongodb_saved,
        },
    })
}

async fn mirror_to_mongo(state: &AppState, record: &PredictionRecord) -> bool {
    let Some(mongo) = &state.mongo else {
        return false;
    };

    let result = async {
        let collection = mongo.collection::<PredictionDoc>(PREDICTION_COLLECTION).await?;
        collection.insert_one(PredictionDoc::new(record.clone())).await
    }
    .await;

    match result {
        Ok(_) => true,
        Err(e) => {
            warn!(prediction_id = %record.prediction_id, error = %e, "Prediction not saved to MongoDB");
            false
        }
    }
}
