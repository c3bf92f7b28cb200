//! JSON prediction logs
//!
//! ```text
//! <root>/daily/predictions_<YYYY-MM-DD>.json   {date, predictions}
//! <root>/all_predictions.json                  {total_predictions, predictions}
//! ```
//!
//! The global log keeps only the newest `GLOBAL_LOG_CAPACITY` records.
//! Writers are serialized; files are replaced atomically so readers never
//! see a half-written log.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::types::{AgriError, Result};

use super::stats::PredictionStats;
use super::PredictionRecord;

pub const GLOBAL_LOG_CAPACITY: usize = 1000;

const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Default, Serialize, Deserialize)]
struct DailyLog {
    #[serde(default)]
    date: String,
    #[serde(default)]
    predictions: Vec<PredictionRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GlobalLog {
    #[serde(default)]
    total_predictions: usize,
    #[serde(default)]
    predictions: Vec<PredictionRecord>,
}

/// `?date=&limit=&offset=`
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            date: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub total_predictions: usize,
    pub returned_predictions: usize,
    pub offset: usize,
    pub limit: usize,
    pub predictions: Vec<PredictionRecord>,
}

pub struct PredictionLog {
    root: PathBuf,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl PredictionLog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_capacity(root, GLOBAL_LOG_CAPACITY)
    }

    pub fn with_capacity(root: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            root: root.into(),
            capacity,
            write_lock: Mutex::new(()),
        }
    }

    fn daily_path(&self, date: &str) -> PathBuf {
        self.root
            .join("daily")
            .join(format!("predictions_{}.json", date))
    }

    fn global_path(&self) -> PathBuf {
        self.root.join("all_predictions.json")
    }

    /// Append to the daily and global logs; returns the daily log path
    pub async fn append(&self, record: &PredictionRecord) -> Result<PathBuf> {
        let _guard = self.write_lock.lock().await;

        let date = record.date();
        let daily_path = self.daily_path(&date);
        let mut daily: DailyLog = read_json(&daily_path).await?;
        daily.date = date;
        daily.predictions.push(record.clone());
        write_json(&daily_path, &daily).await?;

        let global_path = self.global_path();
        let mut global: GlobalLog = read_json(&global_path).await?;
        global.predictions.push(record.clone());
        if global.predictions.len() > self.capacity {
            let excess = global.predictions.len() - self.capacity;
            global.predictions.drain(..excess);
        }
        global.total_predictions = global.predictions.len();
        write_json(&global_path, &global).await?;

        debug!(prediction_id = %record.prediction_id, "Prediction logged");
        Ok(daily_path)
    }

    /// One day in log order, or everything newest first
    pub async fn history(&self, query: &HistoryQuery) -> Result<HistoryPage> {
        let predictions = match &query.date {
            Some(date) => {
                NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                    AgriError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", date))
                })?;
                read_json::<DailyLog>(&self.daily_path(date))
                    .await?
                    .predictions
            }
            None => {
                let mut all = read_json::<GlobalLog>(&self.global_path()).await?.predictions;
                all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                all
            }
        };

        let total_predictions = predictions.len();
        let page: Vec<PredictionRecord> = predictions
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();

        Ok(HistoryPage {
            date: query.date.clone(),
            total_predictions,
            returned_predictions: page.len(),
            offset: query.offset,
            limit: query.limit,
            predictions: page,
        })
    }

    /// Search the global log by id
    pub async fn find(&self, prediction_id: &str) -> Result<Option<PredictionRecord>> {
        let global: GlobalLog = read_json(&self.global_path()).await?;
        Ok(global
            .predictions
            .into_iter()
            .find(|p| p.prediction_id == prediction_id))
    }

    pub async fn stats(&self) -> Result<PredictionStats> {
        let global: GlobalLog = read_json(&self.global_path()).await?;
        Ok(PredictionStats::from_records(&global.predictions))
    }
}

/// Missing file reads as the default value
async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            AgriError::Internal(format!("Corrupt prediction log {}: {}", path.display(), e))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| AgriError::Internal(format!("Cannot encode prediction log: {}", e)))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classification, Severity};
    use crate::diseases::StoreSource;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, day: u32, hour: u32, class: &str, confidence: f64) -> PredictionRecord {
        PredictionRecord {
            prediction_id: id.to_string(),
            user_id: None,
            timestamp: Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap(),
            original_filename: "leaf.jpg".into(),
            processed_filename: None,
            image_path: None,
            file_size: 10,
            classification: Classification {
                predicted_class: class.to_string(),
                class_id: 0,
                confidence,
                confidence_percentage: confidence * 100.0,
                severity: Severity::from_confidence(confidence),
                top_predictions: vec![],
            },
            disease_info: None,
            database_source: StoreSource::Static,
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_append_writes_daily_and_global_logs() {
        let dir = tempfile::tempdir().unwrap();
        let log = PredictionLog::new(dir.path());

        let path = log.append(&record("p1", 1, 8, "MLN", 0.9)).await.unwrap();
        log.append(&record("p2", 2, 8, "saine", 0.7)).await.unwrap();

        assert!(path.ends_with("daily/predictions_2025-06-01.json"));
        let page = log
            .history(&HistoryQuery {
                date: Some("2025-06-01".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total_predictions, 1);
        assert_eq!(page.predictions[0].prediction_id, "p1");

        let found = log.find("p2").await.unwrap().unwrap();
        assert_eq!(found.classification.predicted_class, "saine");
        assert!(log.find("p3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_global_history_is_newest_first_and_paged() {
        let dir = tempfile::tempdir().unwrap();
        let log = PredictionLog::new(dir.path());
        for (id, hour) in [("a", 1), ("c", 3), ("b", 2)] {
            log.append(&record(id, 5, hour, "MSV", 0.5)).await.unwrap();
        }

        let page = log
            .history(&HistoryQuery {
                date: None,
                limit: 2,
                offset: 0,
            })
            .await
            .unwrap();
        let ids: Vec<&str> = page.predictions.iter().map(|p| p.prediction_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(page.total_predictions, 3);
        assert_eq!(page.returned_predictions, 2);

        let rest = log
            .history(&HistoryQuery {
                date: None,
                limit: 2,
                offset: 2,
            })
            .await
            .unwrap();
        assert_eq!(rest.predictions[0].prediction_id, "a");
    }

    #[tokio::test]
    async fn test_global_log_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let log = PredictionLog::with_capacity(dir.path(), 2);
        for (i, id) in ["old", "mid", "new"].iter().enumerate() {
            log.append(&record(id, 7, i as u32, "MLN", 0.8)).await.unwrap();
        }
        assert!(log.find("old").await.unwrap().is_none());
        assert_eq!(log.stats().await.unwrap().total_predictions, 2);

        // the daily log is not capped
        let day = log
            .history(&HistoryQuery {
                date: Some("2025-06-07".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(day.total_predictions, 3);
    }

    #[tokio::test]
    async fn test_empty_and_invalid_queries() {
        let dir = tempfile::tempdir().unwrap();
        let log = PredictionLog::new(dir.path());
        assert_eq!(log.history(&HistoryQuery::default()).await.unwrap().total_predictions, 0);

        let err = log
            .history(&HistoryQuery {
                date: Some("../../etc".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AgriError::BadRequest(_)));
    }
}
