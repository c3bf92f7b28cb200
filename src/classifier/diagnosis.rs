//! Classification joined with disease knowledge
//!
//! The predicted class is the disease id. The record is flattened into the
//! response shape clients consume, with the disease-only and
//! healthy-only fields present only for their category.

use serde::{Deserialize, Serialize};

use crate::diseases::treatments::sort_by_priority;
use crate::diseases::{
    Category, DiseaseRecord, DiseaseService, Pathogen, TreatmentOption, Urgency, VectorInfo,
};

use super::Classification;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseSummary {
    pub category: Category,
    pub name: String,
    pub scientific_name: String,
    pub description: String,
    pub urgency: Urgency,
    pub symptoms: Vec<String>,
    pub crops_affected: Vec<String>,
    pub impact: String,
    pub geographic_distribution: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathogens: Option<Vec<Pathogen>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vectors: Option<Vec<VectorInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prevention_measures: Option<Vec<String>>,
    /// Priority-ordered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_recommendations: Option<Vec<TreatmentOption>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
}

impl From<DiseaseRecord> for DiseaseSummary {
    fn from(record: DiseaseRecord) -> Self {
        let mut summary = DiseaseSummary {
            category: record.category,
            name: record.name,
            scientific_name: record.scientific_name,
            description: record.description,
            urgency: record.urgency,
            symptoms: record.symptoms,
            crops_affected: record.crops_affected,
            impact: record.impact,
            geographic_distribution: record.geographic_distribution,
            pathogens: None,
            vectors: None,
            prevention_measures: None,
            treatment_recommendations: None,
            recommendations: None,
        };

        match record.category {
            Category::Disease => {
                let mut treatments = record.treatment_options;
                sort_by_priority(&mut treatments);
                summary.pathogens = Some(record.pathogens);
                summary.vectors = Some(record.vectors);
                summary.prevention_measures = Some(record.prevention_measures);
                summary.treatment_recommendations = Some(treatments);
            }
            Category::HealthyState => {
                summary.recommendations = Some(record.recommendations);
            }
            Category::Pest => {}
        }
        summary
    }
}

/// A classification plus what is known about the predicted class
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub classification: Classification,
    /// `None` when the label has no record in the active store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disease_info: Option<DiseaseSummary>,
}

impl Diagnosis {
    pub async fn resolve(service: &DiseaseService, classification: Classification) -> Self {
        let disease_info = service
            .get_disease_info(&classification.predicted_class)
            .await
            .map(DiseaseSummary::from);
        Self {
            classification,
            disease_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Severity;
    use crate::diseases::StaticFileStore;
    use std::sync::Arc;

    const DATA: &str = r#"{
        "diseases": {
            "MLN": {
                "name": "Maize Lethal Necrosis",
                "pathogens": [{"virus": "MCMV"}],
                "treatment": [
                    {"priority": "medium", "product": "Rotation"},
                    {"priority": "critical", "product": "Rogueing"}
                ]
            }
        },
        "classes": {"saine": {"name": "Healthy", "recommendations": ["Keep monitoring"]}},
        "legacy_pests": {"chenille": {"name": "Fall armyworm"}}
    }"#;

    fn classification(label: &str) -> Classification {
        Classification {
            predicted_class: label.to_string(),
            class_id: 0,
            confidence: 0.93,
            confidence_percentage: 93.0,
            severity: Severity::VeryHigh,
            top_predictions: vec![],
        }
    }

    fn service() -> DiseaseService {
        DiseaseService::new(Arc::new(StaticFileStore::from_json(DATA).unwrap()))
    }

    #[tokio::test]
    async fn test_disease_summary_has_ordered_treatments() {
        let diagnosis = Diagnosis::resolve(&service(), classification("MLN")).await;
        let info = diagnosis.disease_info.unwrap();
        let products: Vec<&str> = info
            .treatment_recommendations
            .as_ref()
            .unwrap()
            .iter()
            .map(|t| t.product.as_str())
            .collect();
        assert_eq!(products, vec!["Rogueing", "Rotation"]);
        assert_eq!(info.pathogens.unwrap()[0].virus, "MCMV");
        assert!(info.recommendations.is_none());
    }

    #[tokio::test]
    async fn test_healthy_summary_only_has_recommendations() {
        let diagnosis = Diagnosis::resolve(&service(), classification("saine")).await;
        let value = serde_json::to_value(&diagnosis).unwrap();
        let info = &value["disease_info"];
        assert_eq!(info["category"], "healthy_state");
        assert_eq!(info["recommendations"][0], "Keep monitoring");
        assert!(info.get("treatment_recommendations").is_none());
        assert!(info.get("pathogens").is_none());
    }

    #[tokio::test]
    async fn test_pest_and_unknown_labels() {
        let pest = Diagnosis::resolve(&service(), classification("chenille")).await;
        let info = pest.disease_info.unwrap();
        assert_eq!(info.category, Category::Pest);
        assert!(info.recommendations.is_none() && info.vectors.is_none());

        let unknown = Diagnosis::resolve(&service(), classification("nothing")).await;
        assert!(unknown.disease_info.is_none());
    }
}
