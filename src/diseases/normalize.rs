//! Raw store records to canonical `DiseaseRecord`s
//!
//! Two raw shapes exist. Documents are localized (`name.fr`,
//! `description.fr`, ...) and use canonical key names. Static-file entries
//! are already flat but name three fields differently:
//!
//! | static file  | canonical             |
//! |--------------|-----------------------|
//! | `treatment`  | `treatment_options`   |
//! | `prevention` | `prevention_measures` |
//! | `crops`      | `crops_affected`      |

use serde::Deserialize;

use crate::db::schemas::Localized;
use crate::db::DiseaseDoc;
use crate::types::{AgriError, Result};

use super::lenient;
use super::record::{Category, DiseaseRecord, Pathogen, TreatmentOption, Urgency, VectorInfo};
use super::store::RawRecord;

/// Locale picked out of localized documents
pub const DOCUMENT_LOCALE: &str = "fr";

/// Static-file entry as written by hand
#[derive(Debug, Default, Deserialize)]
struct StaticEntry {
    #[serde(default, deserialize_with = "lenient::optional_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    scientific_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    description: String,
    #[serde(default)]
    urgency: Urgency,
    #[serde(default, deserialize_with = "lenient::string_list")]
    symptoms: Vec<String>,
    #[serde(default, alias = "crops_affected", deserialize_with = "lenient::string_list")]
    crops: Vec<String>,
    #[serde(default, deserialize_with = "lenient::items")]
    pathogens: Vec<Pathogen>,
    #[serde(default, deserialize_with = "lenient::items")]
    vectors: Vec<VectorInfo>,
    #[serde(default, alias = "prevention_measures", deserialize_with = "lenient::string_list")]
    prevention: Vec<String>,
    #[serde(default, alias = "treatment_options", deserialize_with = "lenient::items")]
    treatment: Vec<TreatmentOption>,
    #[serde(default, deserialize_with = "lenient::string")]
    impact: String,
    #[serde(default, deserialize_with = "lenient::string")]
    geographic_distribution: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    recommendations: Vec<String>,
}

/// Build the canonical record for `raw`.
///
/// Fails only when the id or the name is missing.
pub fn normalize(raw: &RawRecord, category: Category) -> Result<DiseaseRecord> {
    let record = match raw {
        RawRecord::Document(doc) => from_document(doc, category)?,
        RawRecord::Static { id, entry, .. } => from_static(id, entry, category)?,
    };
    Ok(apply_category_rules(record))
}

fn from_document(doc: &DiseaseDoc, category: Category) -> Result<DiseaseRecord> {
    let id = doc
        .disease_id
        .clone()
        .ok_or_else(|| AgriError::malformed("<unknown>", "missing disease_id"))?;

    let names = doc
        .name
        .as_ref()
        .ok_or_else(|| AgriError::malformed(&id, "missing name"))?;
    let name = names
        .get(DOCUMENT_LOCALE)
        .cloned()
        .ok_or_else(|| AgriError::malformed(&id, format!("missing name.{}", DOCUMENT_LOCALE)))?;
    // A flat name has no scientific variant
    let scientific_name = match names {
        Localized::ByLocale(map) => {
            map.get("scientific").cloned().flatten().unwrap_or_default()
        }
        Localized::Plain(_) => String::new(),
    };

    let recommendations = if category == Category::HealthyState {
        doc.prevention_measures.clone()
    } else {
        Vec::new()
    };

    Ok(DiseaseRecord {
        id,
        category,
        name,
        scientific_name,
        description: doc
            .description
            .as_ref()
            .and_then(|d| d.get(DOCUMENT_LOCALE).cloned())
            .unwrap_or_default(),
        urgency: doc.urgency.clone(),
        symptoms: doc
            .symptoms
            .as_ref()
            .and_then(|s| s.get(DOCUMENT_LOCALE).cloned())
            .unwrap_or_default(),
        crops_affected: doc.crops_affected.clone(),
        pathogens: doc.pathogens.clone(),
        vectors: doc.vectors.clone(),
        prevention_measures: doc.prevention_measures.clone(),
        treatment_options: doc.treatment_options.clone(),
        impact: doc
            .impact
            .as_ref()
            .map(|i| i.description().to_string())
            .unwrap_or_default(),
        geographic_distribution: doc.geographic_distribution.clone(),
        recommendations,
    })
}

fn from_static(id: &str, entry: &serde_json::Value, category: Category) -> Result<DiseaseRecord> {
    if !entry.is_object() {
        return Err(AgriError::malformed(id, "entry is not an object, missing name"));
    }
    let entry: StaticEntry = serde_json::from_value(entry.clone())
        .map_err(|e| AgriError::malformed(id, e.to_string()))?;
    let name = entry
        .name
        .ok_or_else(|| AgriError::malformed(id, "missing name"))?;

    Ok(DiseaseRecord {
        id: id.to_string(),
        category,
        name,
        scientific_name: entry.scientific_name,
        description: entry.description,
        urgency: entry.urgency,
        symptoms: entry.symptoms,
        crops_affected: entry.crops,
        pathogens: entry.pathogens,
        vectors: entry.vectors,
        prevention_measures: entry.prevention,
        treatment_options: entry.treatment,
        impact: entry.impact,
        geographic_distribution: entry.geographic_distribution,
        recommendations: entry.recommendations,
    })
}

/// Defaults and per-category field rules shared by both shapes
fn apply_category_rules(mut record: DiseaseRecord) -> DiseaseRecord {
    if !record.urgency.is_specified() {
        record.urgency = Urgency::Medium;
    }

    if record.category != Category::Disease {
        record.pathogens.clear();
        record.vectors.clear();
    }
    if record.category != Category::HealthyState {
        record.recommendations.clear();
    }

    for (index, option) in record.treatment_options.iter_mut().enumerate() {
        if option.id.is_empty() {
            option.id = format!("TREAT_{:03}", index + 1);
        }
    }

    record
}
