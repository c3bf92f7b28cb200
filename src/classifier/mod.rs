//! Image classification seam
//!
//! The model itself runs elsewhere; AgriGuard only needs class
//! probabilities back. `Classification` turns those into the ranked
//! result the rest of the service works with.

pub mod diagnosis;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{AgriError, Result};

pub use diagnosis::{Diagnosis, DiseaseSummary};
pub use remote::RemoteClassifier;

/// Predictions kept in `top_predictions`
pub const TOP_K: usize = 5;

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &[u8], filename: &str) -> Result<Classification>;

    /// Labels the model can emit, in class id order
    fn class_names(&self) -> Vec<String>;
}

/// How much to trust a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::VeryHigh,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::VeryLow,
    ];

    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.9 {
            Severity::VeryHigh
        } else if confidence >= 0.8 {
            Severity::High
        } else if confidence >= 0.6 {
            Severity::Medium
        } else if confidence >= 0.4 {
            Severity::Low
        } else {
            Severity::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::VeryHigh => "very_high",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::VeryLow => "very_low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPrediction {
    pub class: String,
    pub class_id: usize,
    pub confidence: f64,
    pub confidence_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub predicted_class: String,
    pub class_id: usize,
    pub confidence: f64,
    pub confidence_percentage: f64,
    pub severity: Severity,
    #[serde(rename = "top5_predictions")]
    pub top_predictions: Vec<ClassPrediction>,
}

impl Classification {
    /// Rank raw class probabilities.
    ///
    /// `names[i]` labels `probabilities[i]`. Confidences are rounded to two
    /// decimals; severity is decided on the unrounded value.
    pub fn from_probabilities(probabilities: &[f64], names: &[String]) -> Result<Self> {
        if probabilities.is_empty() {
            return Err(AgriError::Classifier("no class probabilities returned".into()));
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(AgriError::Classifier("non-finite class probability".into()));
        }

        let mut ranked: Vec<(usize, f64)> = probabilities.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let label = |class_id: usize| -> Result<String> {
            names.get(class_id).cloned().ok_or_else(|| {
                AgriError::Classifier(format!(
                    "Invalid class id {} (only {} classes known)",
                    class_id,
                    names.len()
                ))
            })
        };

        let (best_id, best) = ranked[0];
        let top_predictions = ranked
            .iter()
            .take(TOP_K)
            .map(|&(class_id, p)| {
                Ok(ClassPrediction {
                    class: label(class_id)?,
                    class_id,
                    confidence: round2(p),
                    confidence_percentage: round2(p * 100.0),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            predicted_class: label(best_id)?,
            class_id: best_id,
            confidence: round2(best),
            confidence_percentage: round2(best * 100.0),
            severity: Severity::from_confidence(best),
            top_predictions,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
