//! Canonical disease records
//!
//! Whatever store a record came from, callers only ever see these shapes.
//! Every field is always present; absent data is an empty string or list.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::lenient;

// =============================================================================
// Category
// =============================================================================

/// What kind of entry a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Disease,
    HealthyState,
    Pest,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Disease => "disease",
            Category::HealthyState => "healthy_state",
            Category::Pest => "pest",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "disease" => Some(Category::Disease),
            "healthy_state" => Some(Category::HealthyState),
            "pest" => Some(Category::Pest),
            _ => None,
        }
    }

    /// Category of a document-store record, from its `type` field.
    ///
    /// Only `etat_sain` is healthy; every other type, pests included,
    /// is reported as a disease.
    pub fn from_document_type(kind: &str) -> Self {
        if kind == "etat_sain" {
            Category::HealthyState
        } else {
            Category::Disease
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Urgency
// =============================================================================

/// Urgency of a record, also used as treatment priority.
///
/// Ranked `critical < high < medium < low < none`, with any other label
/// (including an empty one) ranked after all of them. Unknown labels are
/// kept verbatim so exact-match filtering still works on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
    None,
    Unknown(String),
}

impl Urgency {
    pub fn as_str(&self) -> &str {
        match self {
            Urgency::Critical => "critical",
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
            Urgency::None => "none",
            Urgency::Unknown(label) => label,
        }
    }

    /// Sort position; lower is more urgent
    pub fn rank(&self) -> u8 {
        match self {
            Urgency::Critical => 0,
            Urgency::High => 1,
            Urgency::Medium => 2,
            Urgency::Low => 3,
            Urgency::None => 4,
            Urgency::Unknown(_) => 5,
        }
    }

    pub fn is_specified(&self) -> bool {
        !matches!(self, Urgency::Unknown(label) if label.is_empty())
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Unknown(String::new())
    }
}

impl From<&str> for Urgency {
    fn from(label: &str) -> Self {
        match label {
            "critical" => Urgency::Critical,
            "high" => Urgency::High,
            "medium" => Urgency::Medium,
            "low" => Urgency::Low,
            "none" => Urgency::None,
            other => Urgency::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Urgency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Urgency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient::urgency(deserializer)
    }
}

// =============================================================================
// Sub-records
// =============================================================================

/// A single treatment or recommended action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreatmentOption {
    #[serde(default, alias = "treatment_id", deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub product: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub dosage: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub timing: String,
    #[serde(default)]
    pub priority: Urgency,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
}

/// Plain-text entries are preventive recommendations
impl From<String> for TreatmentOption {
    fn from(description: String) -> Self {
        TreatmentOption {
            kind: "preventif".to_string(),
            category: "recommendation".to_string(),
            priority: Urgency::Medium,
            description,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pathogen {
    #[serde(default, alias = "french_name", deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, alias = "full_name", deserialize_with = "lenient::string")]
    pub scientific_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub virus: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub pathogen_type: String,
}

impl From<String> for Pathogen {
    fn from(name: String) -> Self {
        Pathogen {
            name,
            ..Default::default()
        }
    }
}

/// An organism that spreads a disease
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub scientific_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub virus_transmitted: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub transmission_mode: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub percentage_in_study: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
}

impl From<String> for VectorInfo {
    fn from(name: String) -> Self {
        VectorInfo {
            name,
            ..Default::default()
        }
    }
}

// =============================================================================
// DiseaseRecord
// =============================================================================

/// Store-agnostic disease knowledge, keyed by the classifier label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    pub id: String,
    pub category: Category,
    pub name: String,
    pub scientific_name: String,
    pub description: String,
    pub urgency: Urgency,
    pub symptoms: Vec<String>,
    pub crops_affected: Vec<String>,
    /// Only populated for diseases
    pub pathogens: Vec<Pathogen>,
    /// Only populated for diseases
    pub vectors: Vec<VectorInfo>,
    pub prevention_measures: Vec<String>,
    /// Store insertion order
    pub treatment_options: Vec<TreatmentOption>,
    pub impact: String,
    pub geographic_distribution: String,
    /// Only populated for healthy states
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_rank_order() {
        let ranks: Vec<u8> = ["critical", "high", "medium", "low", "none", "weird", ""]
            .iter()
            .map(|l| Urgency::from(*l).rank())
            .collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4, 5, 5]);
    }

    #[test]
    fn test_unknown_urgency_keeps_label() {
        let u = Urgency::from("urgent");
        assert_eq!(u.as_str(), "urgent");
        assert_eq!(serde_json::to_string(&u).unwrap(), "\"urgent\"");
        assert!(!Urgency::default().is_specified());
        assert!(Urgency::Low.is_specified());
    }

    #[test]
    fn test_category_serialization() {
        assert_eq!(
            serde_json::to_string(&Category::HealthyState).unwrap(),
            "\"healthy_state\""
        );
        assert_eq!(Category::parse("pest"), Some(Category::Pest));
        assert_eq!(Category::parse("ravageur"), None);
    }

    #[test]
    fn test_document_type_rule() {
        assert_eq!(
            Category::from_document_type("etat_sain"),
            Category::HealthyState
        );
        assert_eq!(
            Category::from_document_type("maladie_virale"),
            Category::Disease
        );
        // pests are not split out of the document store
        assert_eq!(
            Category::from_document_type("ravageur_insecte"),
            Category::Disease
        );
    }

    #[test]
    fn test_treatment_from_document_shape() {
        let t: TreatmentOption = serde_json::from_value(serde_json::json!({
            "treatment_id": "T1",
            "type": "chimique",
            "priority": "high",
            "product": "Imidaclopride",
            "cost_estimate": "moyen"
        }))
        .unwrap();
        assert_eq!(t.id, "T1");
        assert_eq!(t.kind, "chimique");
        assert_eq!(t.priority, Urgency::High);
        assert_eq!(t.dosage, "");
    }

    #[test]
    fn test_pathogen_aliases() {
        let p: Pathogen = serde_json::from_value(serde_json::json!({
            "virus": "MCMV",
            "full_name": "Maize chlorotic mottle virus",
            "french_name": "Virus de la marbrure chlorotique",
            "role": null
        }))
        .unwrap();
        assert_eq!(p.scientific_name, "Maize chlorotic mottle virus");
        assert_eq!(p.name, "Virus de la marbrure chlorotique");
        assert_eq!(p.role, "");
    }
}
