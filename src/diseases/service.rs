//! Disease resolution service
//!
//! Turns classifier labels into canonical disease knowledge. Every
//! operation degrades instead of failing: a missing id, an unreachable store
//! and a corrupt record all come back as `None` or an empty list, with the
//! cause logged.
//!
//! ```text
//!   label ──► DiseaseService ──► DiseaseStore (document | static)
//!                  │                   │
//!                  │◄── RawRecord ─────┘
//!                  ▼
//!             normalize() ──► DiseaseRecord
//! ```

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::normalize::normalize;
use super::record::{Category, DiseaseRecord, TreatmentOption, VectorInfo};
use super::search::{self, SearchResults};
use super::stats::DatabaseStats;
use super::store::{DiseaseStore, RawRecord, StoreSource};
use super::treatments::TreatmentQuery;

// =============================================================================
// Snapshot
// =============================================================================

/// Every record of the active store, read in one pass
#[derive(Debug, Clone)]
pub struct DatabaseSnapshot {
    /// Store iteration order
    pub records: Vec<DiseaseRecord>,
    pub source: StoreSource,
    pub total: usize,
}

impl DatabaseSnapshot {
    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&DiseaseRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

/// Serialized as `{diseases: {id: record}, source, total}`
impl Serialize for DatabaseSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct ById<'a>(&'a [DiseaseRecord]);

        impl Serialize for ById<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for record in self.0 {
                    map.serialize_entry(&record.id, record)?;
                }
                map.end()
            }
        }

        let mut state = serializer.serialize_struct("DatabaseSnapshot", 3)?;
        state.serialize_field("diseases", &ById(&self.records))?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("total", &self.total)?;
        state.end()
    }
}

// =============================================================================
// Service
// =============================================================================

pub struct DiseaseService {
    store: Arc<dyn DiseaseStore>,
}

impl DiseaseService {
    pub fn new(store: Arc<dyn DiseaseStore>) -> Self {
        Self { store }
    }

    /// Store selected at startup
    pub fn source(&self) -> StoreSource {
        self.store.source()
    }

    /// Canonical record for `id`, `None` when unknown or unreadable
    pub async fn get_disease_info(&self, id: &str) -> Option<DiseaseRecord> {
        let raw = match self.store.fetch(id).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(id = %id, source = %self.source(), "Disease not found");
                return None;
            }
            Err(e) => {
                warn!(id = %id, source = %self.source(), error = %e, "Disease lookup failed");
                return None;
            }
        };
        self.normalize_logged(&raw)
    }

    /// Treatments for `id`, priority-ordered.
    ///
    /// `urgency_filter` keeps only options whose priority equals it exactly.
    pub async fn get_treatments(
        &self,
        id: &str,
        urgency_filter: Option<&str>,
    ) -> Vec<TreatmentOption> {
        self.query_treatments(id, &TreatmentQuery::by_priority(urgency_filter))
            .await
    }

    pub async fn query_treatments(&self, id: &str, query: &TreatmentQuery) -> Vec<TreatmentOption> {
        match self.get_disease_info(id).await {
            Some(record) => query.apply(record.treatment_options),
            None => Vec::new(),
        }
    }

    pub async fn get_vectors(&self, id: &str) -> Vec<VectorInfo> {
        self.get_disease_info(id)
            .await
            .map(|r| r.vectors)
            .unwrap_or_default()
    }

    /// Ids of every readable record in the active store
    pub async fn get_all_diseases(&self) -> Vec<String> {
        self.load_all().await.into_iter().map(|r| r.id).collect()
    }

    pub async fn get_database_snapshot(&self) -> DatabaseSnapshot {
        let records = self.load_all().await;
        DatabaseSnapshot {
            total: records.len(),
            source: self.source(),
            records,
        }
    }

    /// Dataset metadata, with a generated stand-in when the store has none
    pub async fn get_metadata(&self) -> Value {
        match self.store.metadata().await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => fallback_metadata(),
            Err(e) => {
                warn!(source = %self.source(), error = %e, "Metadata lookup failed");
                fallback_metadata()
            }
        }
    }

    pub async fn search(
        &self,
        query: &str,
        category: Option<Category>,
        limit: usize,
    ) -> SearchResults {
        let snapshot = self.get_database_snapshot().await;
        search::search(&snapshot.records, query, category, limit)
    }

    pub async fn database_stats(&self) -> DatabaseStats {
        DatabaseStats::from_snapshot(&self.get_database_snapshot().await)
    }

    /// One `fetch_all`, unreadable records dropped
    async fn load_all(&self) -> Vec<DiseaseRecord> {
        match self.store.fetch_all().await {
            Ok(raws) => raws
                .iter()
                .filter_map(|raw| self.normalize_logged(raw))
                .collect(),
            Err(e) => {
                warn!(source = %self.source(), error = %e, "Listing diseases failed");
                Vec::new()
            }
        }
    }

    fn normalize_logged(&self, raw: &RawRecord) -> Option<DiseaseRecord> {
        match normalize(raw, raw.category()) {
            Ok(record) => Some(record),
            Err(e) => {
                error!(id = %raw.id_hint(), source = %self.source(), error = %e, "Malformed disease record");
                None
            }
        }
    }
}

/// `data_source` reported when a store carries no metadata of its own
pub const FALLBACK_DATA_SOURCE: &str = "json_fallback";

fn fallback_metadata() -> Value {
    json!({
        "version": "1.0",
        "data_source": FALLBACK_DATA_SOURCE,
        "last_updated": chrono::Utc::now().to_rfc3339(),
    })
}
