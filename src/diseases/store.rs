//! Backing store seam
//!
//! The resolution service only ever talks to a `DiseaseStore`. Which
//! implementation sits behind it is decided once, at startup, by the
//! availability selector.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::db::DiseaseDoc;
use crate::types::Result;

use super::record::Category;

/// Which backing store answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreSource {
    Document,
    Static,
}

impl StoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreSource::Document => "document",
            StoreSource::Static => "static",
        }
    }
}

impl fmt::Display for StoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical section of the static file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Diseases,
    Classes,
    LegacyPests,
}

impl Section {
    /// Lookup order: the first section holding an id wins
    pub const PRIORITY: [Section; 3] = [Section::Diseases, Section::Classes, Section::LegacyPests];

    pub fn key(&self) -> &'static str {
        match self {
            Section::Diseases => "diseases",
            Section::Classes => "classes",
            Section::LegacyPests => "legacy_pests",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Section::Diseases => Category::Disease,
            Section::Classes => Category::HealthyState,
            Section::LegacyPests => Category::Pest,
        }
    }
}

/// A record as the store holds it, before normalization
#[derive(Debug, Clone)]
pub enum RawRecord {
    Document(Box<DiseaseDoc>),
    Static {
        id: String,
        section: Section,
        entry: Value,
    },
}

impl RawRecord {
    /// Category decided by where the record came from
    pub fn category(&self) -> Category {
        match self {
            RawRecord::Document(doc) => Category::from_document_type(&doc.kind),
            RawRecord::Static { section, .. } => section.category(),
        }
    }

    /// Best-effort id, for logging
    pub fn id_hint(&self) -> &str {
        match self {
            RawRecord::Document(doc) => doc.disease_id.as_deref().unwrap_or("<no id>"),
            RawRecord::Static { id, .. } => id,
        }
    }
}

/// Read access to one backing store
#[async_trait]
pub trait DiseaseStore: Send + Sync {
    fn source(&self) -> StoreSource;

    /// Single record by id, `None` when absent
    async fn fetch(&self, id: &str) -> Result<Option<RawRecord>>;

    /// Every record, each id at most once
    async fn fetch_all(&self) -> Result<Vec<RawRecord>>;

    /// Dataset metadata, if the store carries any
    async fn metadata(&self) -> Result<Option<Value>> {
        Ok(None)
    }
}
