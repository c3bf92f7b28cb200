//! Startup store selection
//!
//! Probes the document store once. If it answers within the timeout it
//! serves every request until shutdown; otherwise the static file does.
//! There is no re-probe and no failback.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::MongoClient;
use crate::types::{AgriError, Result};

use super::document::DocumentStore;
use super::static_file::StaticFileStore;
use super::store::DiseaseStore;

/// Default bound on the document store probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// `None` or empty skips the probe
    pub mongodb_uri: Option<String>,
    pub database_name: String,
    pub probe_timeout: Duration,
    pub static_path: PathBuf,
    /// Start with no disease data instead of failing on a bad static file
    pub serve_empty: bool,
}

/// Outcome of selection; `mongo` is kept for the other collections
pub struct SelectedStore {
    pub store: Arc<dyn DiseaseStore>,
    pub mongo: Option<MongoClient>,
}

/// Pick the backing store for this process.
///
/// Errors only when the static file is needed, unreadable, and
/// `serve_empty` is off.
pub async fn select_store(config: &StoreConfig) -> Result<SelectedStore> {
    match config.mongodb_uri.as_deref().filter(|uri| !uri.is_empty()) {
        Some(uri) => match probe(uri, config).await {
            Ok(mongo) => {
                info!(
                    database = %config.database_name,
                    "Document store available, serving disease data from MongoDB"
                );
                return Ok(adopt_document_store(mongo, config).await);
            }
            Err(e) => {
                warn!(
                    error = %e,
                    timeout_ms = config.probe_timeout.as_millis() as u64,
                    "Document store unavailable, falling back to static file"
                );
            }
        },
        None => info!("No document store configured, using static file"),
    }

    let store = load_static(config)?;
    Ok(SelectedStore {
        store: Arc::new(store),
        mongo: None,
    })
}

/// Connect and ping only; nothing is written during the probe
async fn probe(uri: &str, config: &StoreConfig) -> Result<MongoClient> {
    tokio::time::timeout(
        config.probe_timeout,
        MongoClient::new(uri, &config.database_name, config.probe_timeout),
    )
    .await
    .map_err(|_| {
        AgriError::StoreUnavailable(format!(
            "probe timed out after {} ms",
            config.probe_timeout.as_millis()
        ))
    })?
}

/// Commit to a document store that answered the probe.
///
/// Index creation runs afterwards, bounded by the probe timeout; its
/// outcome never changes the selection.
async fn adopt_document_store(mongo: MongoClient, config: &StoreConfig) -> SelectedStore {
    let store = DocumentStore::new(&mongo);
    if tokio::time::timeout(config.probe_timeout, store.ensure_indexes())
        .await
        .is_err()
    {
        warn!("Disease index creation timed out, serving without it");
    }

    SelectedStore {
        store: Arc::new(store),
        mongo: Some(mongo),
    }
}

fn load_static(config: &StoreConfig) -> Result<StaticFileStore> {
    match StaticFileStore::load(&config.static_path) {
        Ok(store) => Ok(store),
        Err(e) if config.serve_empty => {
            warn!(
                path = %config.static_path.display(),
                error = %e,
                "Serving an empty disease database"
            );
            Ok(StaticFileStore::empty())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diseases::store::StoreSource;

    fn config(path: PathBuf) -> StoreConfig {
        StoreConfig {
            mongodb_uri: None,
            database_name: "agriguard_test".into(),
            probe_timeout: Duration::from_millis(300),
            static_path: path,
            serve_empty: false,
        }
    }

    #[tokio::test]
    async fn test_missing_static_file_is_fatal() {
        let result = select_store(&config("/nonexistent/db.json".into())).await;
        assert!(matches!(result, Err(AgriError::Config(_))));
    }

    #[tokio::test]
    async fn test_serve_empty_tolerates_missing_file() {
        let mut cfg = config("/nonexistent/db.json".into());
        cfg.serve_empty = true;
        let selected = select_store(&cfg).await.unwrap();
        assert_eq!(selected.store.source(), StoreSource::Static);
        assert!(selected.store.fetch_all().await.unwrap().is_empty());
        assert!(selected.mongo.is_none());
    }

    #[tokio::test]
    async fn test_empty_uri_skips_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, r#"{"diseases": {"MSV": {"name": "Streak"}}}"#).unwrap();

        let mut cfg = config(path);
        cfg.mongodb_uri = Some(String::new());
        let selected = select_store(&cfg).await.unwrap();
        assert_eq!(selected.store.source(), StoreSource::Static);
        assert!(selected.store.fetch("MSV").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_index_failure_keeps_document_store() {
        let mut cfg = config("/nonexistent/db.json".into());
        cfg.probe_timeout = Duration::from_millis(200);
        // Nothing listens here, so index creation cannot succeed
        let mongo = MongoClient::lazy("mongodb://127.0.0.1:1", "agriguard_test", cfg.probe_timeout)
            .await
            .unwrap();

        let selected = adopt_document_store(mongo, &cfg).await;
        assert_eq!(selected.store.source(), StoreSource::Document);
        assert!(selected.mongo.is_some());
    }
}
