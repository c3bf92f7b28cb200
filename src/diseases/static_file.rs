//! Static JSON fallback store
//!
//! ```text
//! {
//!   "diseases":     { "<id>": { ... } },   -> disease
//!   "classes":      { "<id>": { ... } },   -> healthy_state
//!   "legacy_pests": { "<id>": { ... } },   -> pest
//!   "metadata":     { ... }
//! }
//! ```
//!
//! Loaded once at startup and never written by the serving path.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::types::{AgriError, Result};

use super::store::{DiseaseStore, RawRecord, Section, StoreSource};

/// Parsed contents of the static file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticDatabase {
    #[serde(default)]
    pub diseases: Map<String, Value>,
    #[serde(default)]
    pub classes: Map<String, Value>,
    #[serde(default)]
    pub legacy_pests: Map<String, Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl StaticDatabase {
    fn section(&self, section: Section) -> &Map<String, Value> {
        match section {
            Section::Diseases => &self.diseases,
            Section::Classes => &self.classes,
            Section::LegacyPests => &self.legacy_pests,
        }
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        Section::PRIORITY
            .iter()
            .all(|s| self.section(*s).is_empty())
    }

    fn ids(&self) -> HashSet<&str> {
        Section::PRIORITY
            .iter()
            .flat_map(|s| self.section(*s).keys().map(String::as_str))
            .collect()
    }
}

/// In-memory store over the static file
#[derive(Debug, Clone, Default)]
pub struct StaticFileStore {
    database: StaticDatabase,
    path: Option<PathBuf>,
}

impl StaticFileStore {
    /// Read and parse the file; any failure is a configuration error
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AgriError::Config(format!(
                "Cannot read disease database {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut store = Self::from_json(&contents).map_err(|e| {
            AgriError::Config(format!(
                "Cannot parse disease database {}: {}",
                path.display(),
                e
            ))
        })?;
        store.path = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            diseases = store.database.diseases.len(),
            classes = store.database.classes.len(),
            legacy_pests = store.database.legacy_pests.len(),
            "Loaded static disease database"
        );
        Ok(store)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let database: StaticDatabase = serde_json::from_str(json)
            .map_err(|e| AgriError::Config(format!("Invalid disease database: {}", e)))?;
        Ok(Self {
            database,
            path: None,
        })
    }

    /// A store with no records, for the serve-empty mode
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn database(&self) -> &StaticDatabase {
        &self.database
    }

    fn lookup(&self, id: &str) -> Option<RawRecord> {
        Section::PRIORITY.iter().find_map(|section| {
            self.database
                .section(*section)
                .get(id)
                .map(|entry| RawRecord::Static {
                    id: id.to_string(),
                    section: *section,
                    entry: entry.clone(),
                })
        })
    }
}

#[async_trait]
impl DiseaseStore for StaticFileStore {
    fn source(&self) -> StoreSource {
        StoreSource::Static
    }

    async fn fetch(&self, id: &str) -> Result<Option<RawRecord>> {
        let found = self.lookup(id);
        debug!(id = %id, found = found.is_some(), "Static lookup");
        Ok(found)
    }

    async fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for section in Section::PRIORITY {
            for (id, entry) in self.database.section(section) {
                if !seen.insert(id.as_str()) {
                    warn!(
                        id = %id,
                        section = section.key(),
                        "Id already defined in a higher-priority section, skipping"
                    );
                    continue;
                }
                records.push(RawRecord::Static {
                    id: id.clone(),
                    section,
                    entry: entry.clone(),
                });
            }
        }

        Ok(records)
    }

    async fn metadata(&self) -> Result<Option<Value>> {
        Ok(self.database.metadata.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diseases::record::Category;

    const SAMPLE: &str = r#"{
        "diseases": {
            "MLN": {"name": "Maize Lethal Necrosis"},
            "dup": {"name": "From diseases"}
        },
        "classes": {
            "saine": {"name": "Healthy"},
            "dup": {"name": "From classes"}
        },
        "legacy_pests": {
            "chenille": {"name": "Fall armyworm"},
            "dup": {"name": "From pests"}
        },
        "metadata": {"version": "2.1"}
    }"#;

    fn store() -> StaticFileStore {
        StaticFileStore::from_json(SAMPLE).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_assigns_section_category() {
        let store = store();
        for (id, category) in [
            ("MLN", Category::Disease),
            ("saine", Category::HealthyState),
            ("chenille", Category::Pest),
        ] {
            let raw = store.fetch(id).await.unwrap().unwrap();
            assert_eq!(raw.category(), category, "id {}", id);
        }
        assert!(store.fetch("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disease_section_wins_on_duplicate_id() {
        let store = store();
        match store.fetch("dup").await.unwrap().unwrap() {
            RawRecord::Static { section, entry, .. } => {
                assert_eq!(section, Section::Diseases);
                assert_eq!(entry["name"], "From diseases");
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_all_yields_each_id_once() {
        let store = store();
        let all = store.fetch_all().await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id_hint()).collect();
        assert_eq!(ids, vec!["MLN", "dup", "saine", "chenille"]);
        assert_eq!(store.database().len(), 4);
    }

    #[tokio::test]
    async fn test_metadata_passthrough() {
        let meta = store().metadata().await.unwrap().unwrap();
        assert_eq!(meta["version"], "2.1");
        assert!(StaticFileStore::empty().metadata().await.unwrap().is_none());
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = StaticFileStore::load("/nonexistent/diseases.json").unwrap_err();
        assert!(matches!(err, AgriError::Config(_)));
    }

    #[test]
    fn test_load_invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            StaticFileStore::load(&path).unwrap_err(),
            AgriError::Config(_)
        ));
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let store = StaticFileStore::from_json(r#"{"classes": {}}"#).unwrap();
        assert!(store.database().is_empty());
    }
}
