//! End-to-end classification flow with a fixed classifier
//!
//! Exercises upload -> classification -> disease join -> image storage ->
//! prediction logs, without a network or a model.

use agriguard::classifier::{Classification, Classifier};
use agriguard::config::Args;
use agriguard::diseases::{Category, SelectedStore, StaticFileStore, StoreSource};
use agriguard::predictions::HistoryQuery;
use agriguard::routes::{classify_upload, Upload};
use agriguard::types::{AgriError, Result};
use agriguard::AppState;
use async_trait::async_trait;
use bytes::Bytes;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const DATABASE: &str = r#"{
    "diseases": {
        "MLN": {
            "name": "Maize Lethal Necrosis",
            "urgency": "critical",
            "treatment": [
                {"priority": "low", "product": "Rotation"},
                {"priority": "critical", "product": "Rogueing"}
            ]
        }
    },
    "classes": {
        "saine": {"name": "Healthy", "recommendations": ["Keep monitoring"]}
    }
}"#;

/// Always answers with the same probabilities
struct FixedClassifier {
    labels: Vec<String>,
    probabilities: Vec<f64>,
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, _image: &[u8], _filename: &str) -> Result<Classification> {
        Classification::from_probabilities(&self.probabilities, &self.labels)
    }

    fn class_names(&self) -> Vec<String> {
        self.labels.clone()
    }
}

async fn setup(probabilities: Vec<f64>) -> (AppState, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let images = temp_dir.path().join("images");
    let predictions = temp_dir.path().join("predictions");

    let args = Args::parse_from([
        "agriguard",
        "--mongodb-uri",
        "",
        "--image-dir",
        images.to_str().unwrap(),
        "--predictions-dir",
        predictions.to_str().unwrap(),
    ]);
    let selected = SelectedStore {
        store: Arc::new(StaticFileStore::from_json(DATABASE).unwrap()),
        mongo: None,
    };

    let mut state = AppState::new(args, selected).await.unwrap();
    state.classifier = Some(Arc::new(FixedClassifier {
        labels: vec!["saine".into(), "MLN".into(), "rouille".into()],
        probabilities,
    }));
    (state, temp_dir)
}

fn upload(filename: &str) -> Upload {
    Upload {
        bytes: Bytes::from_static(b"\x89PNG fake image bytes"),
        filename: filename.to_string(),
        user_id: Some("user-42".into()),
        authenticated: false,
        user_agent: Some("integration-test".into()),
        client_ip: Some("127.0.0.1".into()),
    }
}

/// A disease prediction carries priority-ordered treatments and is logged
#[tokio::test]
async fn test_classify_known_disease() {
    let (state, _temp) = setup(vec![0.05, 0.92, 0.03]).await;

    let response = tokio_test::assert_ok!(classify_upload(&state, upload("leaf.png")).await);

    assert!(response.success);
    assert_eq!(response.classification.predicted_class, "MLN");
    assert_eq!(response.database_source, StoreSource::Static);
    assert!(response.storage_info.image_saved);
    assert!(response.storage_info.prediction_logged);
    assert!(!response.storage_info.mongodb_saved);

    let info = response.disease_info.expect("MLN is in the database");
    assert_eq!(info.category, Category::Disease);
    let products: Vec<String> = info
        .treatment_recommendations
        .unwrap()
        .into_iter()
        .map(|t| t.product)
        .collect();
    assert_eq!(products, vec!["Rogueing", "Rotation"]);

    let logged = state
        .predictions
        .find(&response.prediction_id)
        .await
        .unwrap()
        .expect("prediction is in the global log");
    assert_eq!(logged.user_id.as_deref(), Some("user-42"));
    assert_eq!(logged.original_filename, "leaf.png");

    let relative = logged.image_path.expect("image path recorded");
    let stored = state.images.read(&relative).await.unwrap().unwrap();
    assert_eq!(stored, b"\x89PNG fake image bytes");
}

/// A healthy prediction carries recommendations instead of treatments
#[tokio::test]
async fn test_classify_healthy_leaf() {
    let (state, _temp) = setup(vec![0.97, 0.02, 0.01]).await;

    let response = classify_upload(&state, upload("leaf.jpg")).await.unwrap();
    let info = response.disease_info.unwrap();
    assert_eq!(info.category, Category::HealthyState);
    assert_eq!(info.recommendations.unwrap(), vec!["Keep monitoring"]);
    assert!(info.treatment_recommendations.is_none());
}

/// A label with no database entry still classifies, just without details
#[tokio::test]
async fn test_classify_unknown_label() {
    let (state, _temp) = setup(vec![0.1, 0.1, 0.8]).await;

    let response = classify_upload(&state, upload("leaf.jpeg")).await.unwrap();
    assert_eq!(response.classification.predicted_class, "rouille");
    assert!(response.disease_info.is_none());

    let value = serde_json::to_value(&response).unwrap();
    assert!(value.get("disease_info").is_none());
}

/// Predictions show up in history, newest first
#[tokio::test]
async fn test_history_after_uploads() {
    let (state, _temp) = setup(vec![0.05, 0.92, 0.03]).await;

    let first = classify_upload(&state, upload("a.png")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = classify_upload(&state, upload("b.png")).await.unwrap();

    let page = state.predictions.history(&HistoryQuery::default()).await.unwrap();
    assert_eq!(page.total_predictions, 2);
    assert_eq!(page.predictions[0].prediction_id, second.prediction_id);
    assert_eq!(page.predictions[1].prediction_id, first.prediction_id);
}

#[tokio::test]
async fn test_empty_upload_rejected() {
    let (state, _temp) = setup(vec![0.05, 0.92, 0.03]).await;

    let mut empty = upload("leaf.png");
    empty.bytes = Bytes::new();
    let err = classify_upload(&state, empty).await.unwrap_err();
    assert!(matches!(err, AgriError::BadRequest(_)));
}

#[tokio::test]
async fn test_classifier_missing_is_unavailable() {
    let (mut state, _temp) = setup(vec![0.05, 0.92, 0.03]).await;
    state.classifier = None;

    let err = classify_upload(&state, upload("leaf.png")).await.unwrap_err();
    assert!(matches!(err, AgriError::StoreUnavailable(_)));
    assert_eq!(err.status_code(), 503);
}
