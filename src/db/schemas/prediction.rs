//! Prediction document schema
//!
//! Mirror of the on-disk prediction log, written when the document store
//! is active.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::predictions::PredictionRecord;

/// Collection name for predictions
pub const PREDICTION_COLLECTION: &str = "predictions";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PredictionDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub prediction: PredictionRecord,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl PredictionDoc {
    pub fn new(prediction: PredictionRecord) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            prediction,
            is_active: true,
        }
    }
}

impl IntoIndexes for PredictionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "prediction.prediction_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("prediction_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "prediction.user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PredictionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
