//! Aggregate counts over a database snapshot

use serde::Serialize;
use std::collections::BTreeMap;

use super::service::DatabaseSnapshot;
use super::store::StoreSource;

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_entries: usize,
    pub database_source: StoreSource,
    pub categories: BTreeMap<String, usize>,
    pub urgency_levels: BTreeMap<String, usize>,
    pub crops_affected: BTreeMap<String, usize>,
}

impl DatabaseStats {
    pub fn from_snapshot(snapshot: &DatabaseSnapshot) -> Self {
        let mut categories = BTreeMap::new();
        let mut urgency_levels = BTreeMap::new();
        let mut crops_affected = BTreeMap::new();

        for record in &snapshot.records {
            *categories
                .entry(record.category.as_str().to_string())
                .or_insert(0) += 1;
            *urgency_levels
                .entry(record.urgency.as_str().to_string())
                .or_insert(0) += 1;
            for crop in &record.crops_affected {
                *crops_affected.entry(crop.clone()).or_insert(0) += 1;
            }
        }

        Self {
            total_entries: snapshot.total,
            database_source: snapshot.source,
            categories,
            urgency_levels,
            crops_affected,
        }
    }
}
