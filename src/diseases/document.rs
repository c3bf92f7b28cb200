//! MongoDB-backed disease store
//!
//! Only documents with `is_active: true` are visible.

use async_trait::async_trait;
use bson::doc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::db::{DiseaseDoc, MongoClient, MongoCollection, DISEASE_COLLECTION};
use crate::types::Result;

use super::store::{DiseaseStore, RawRecord, StoreSource};

pub struct DocumentStore {
    collection: MongoCollection<DiseaseDoc>,
}

impl DocumentStore {
    /// Bind to the disease collection; reads only, no index writes
    pub fn new(mongo: &MongoClient) -> Self {
        Self {
            collection: mongo.collection_unindexed::<DiseaseDoc>(DISEASE_COLLECTION),
        }
    }

    /// Best-effort index creation; a failure is logged and otherwise ignored
    pub async fn ensure_indexes(&self) -> bool {
        match self.collection.ensure_indexes().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Disease indexes not created, serving without them");
                false
            }
        }
    }
}

#[async_trait]
impl DiseaseStore for DocumentStore {
    fn source(&self) -> StoreSource {
        StoreSource::Document
    }

    async fn fetch(&self, id: &str) -> Result<Option<RawRecord>> {
        let found = self
            .collection
            .find_one(doc! { "disease_id": id })
            .await?;
        debug!(id = %id, found = found.is_some(), "Document lookup");
        Ok(found.map(|d| RawRecord::Document(Box::new(d))))
    }

    async fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        let docs = self.collection.find_many(doc! {}).await?;
        Ok(docs
            .into_iter()
            .map(|d| RawRecord::Document(Box::new(d)))
            .collect())
    }

    async fn metadata(&self) -> Result<Option<Value>> {
        let first = self
            .collection
            .find_one(doc! { "metadata": { "$exists": true } })
            .await?;
        Ok(first.and_then(|d| d.metadata))
    }
}
