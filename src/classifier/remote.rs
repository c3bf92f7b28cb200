//! HTTP client for an external inference service
//!
//! The image bytes are POSTed as-is; the service answers with
//! `{"probabilities": [..], "names": [..]}`. `names` is optional and, when
//! missing, the configured class names are used.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{AgriError, Result};

use super::{Classification, Classifier};

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    probabilities: Vec<f64>,
    #[serde(default)]
    names: Option<Vec<String>>,
}

pub struct RemoteClassifier {
    url: String,
    class_names: Vec<String>,
    http_client: reqwest::Client,
}

impl RemoteClassifier {
    pub fn new(url: impl Into<String>, class_names: Vec<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgriError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            class_names,
            http_client,
        })
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(&self, image: &[u8], filename: &str) -> Result<Classification> {
        debug!(url = %self.url, filename = %filename, size = image.len(), "Sending image for inference");

        let response = self
            .http_client
            .post(&self.url)
            .header("Content-Type", content_type_for(filename))
            .header("X-Filename", filename)
            .body(image.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Inference service rejected image");
            return Err(AgriError::Classifier(format!(
                "inference service returned {}",
                status
            )));
        }

        let inference: InferenceResponse = response.json().await?;
        let names = inference.names.as_deref().unwrap_or(&self.class_names);
        Classification::from_probabilities(&inference.probabilities, names)
    }

    fn class_names(&self) -> Vec<String> {
        self.class_names.clone()
    }
}

/// MIME type from the upload's extension
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
