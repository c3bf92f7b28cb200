//! Summary statistics over the global prediction log

use serde::Serialize;
use std::collections::BTreeMap;

use crate::classifier::Severity;

use super::PredictionRecord;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PredictionStats {
    pub total_predictions: usize,
    pub predictions_by_class: BTreeMap<String, usize>,
    pub predictions_by_date: BTreeMap<String, usize>,
    pub average_confidence: f64,
    /// Count per severity band, every band present
    pub confidence_distribution: BTreeMap<&'static str, usize>,
}

impl PredictionStats {
    pub fn from_records(records: &[PredictionRecord]) -> Self {
        let mut stats = PredictionStats {
            total_predictions: records.len(),
            confidence_distribution: Severity::ALL.iter().map(|s| (s.as_str(), 0)).collect(),
            ..Default::default()
        };

        for record in records {
            let classification = &record.classification;
            *stats
                .predictions_by_class
                .entry(classification.predicted_class.clone())
                .or_insert(0) += 1;
            *stats.predictions_by_date.entry(record.date()).or_insert(0) += 1;
            *stats
                .confidence_distribution
                .entry(Severity::from_confidence(classification.confidence).as_str())
                .or_insert(0) += 1;
        }

        if !records.is_empty() {
            let sum: f64 = records.iter().map(|r| r.classification.confidence).sum();
            stats.average_confidence = sum / records.len() as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats_list_every_band() {
        let stats = PredictionStats::from_records(&[]);
        assert_eq!(stats.total_predictions, 0);
        assert_eq!(stats.average_confidence, 0.0);
        assert_eq!(stats.confidence_distribution.len(), 5);
        assert!(stats.confidence_distribution.values().all(|&n| n == 0));
    }
}
