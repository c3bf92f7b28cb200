//! HTTP routes for AgriGuard

pub mod auth_routes;
pub mod classify;
pub mod diseases;
pub mod health;
pub mod predictions;
pub mod response;

pub use auth_routes::handle_auth_request;
pub use classify::{classify_upload, handle_classify, ClassifyResponse, StorageInfo, Upload};
pub use diseases::{
    database_stats, disease_details, disease_treatments, disease_vectors, list_diseases,
    search_diseases, supported_classes,
};
pub use health::{health_check, model_stats, ModelInfo};
pub use predictions::{prediction_details, prediction_history, prediction_stats, serve_image};
pub use response::BoxBody;
