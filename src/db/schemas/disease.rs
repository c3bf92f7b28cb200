//! Disease document schema
//!
//! Documents are written by the data import tooling in a localized shape:
//! names, descriptions and symptoms are keyed by language. The normalizer
//! in `crate::diseases` flattens them to one locale.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::mongo::IntoIndexes;
use crate::diseases::lenient;
use crate::diseases::record::{Pathogen, TreatmentOption, Urgency, VectorInfo};

/// Collection name for disease documents
pub const DISEASE_COLLECTION: &str = "diseases";

/// Text keyed by language code, or already flat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Localized<T> {
    ByLocale(BTreeMap<String, Option<T>>),
    Plain(T),
}

impl<T> Localized<T> {
    /// Value for `locale`; a flat value answers every locale
    pub fn get(&self, locale: &str) -> Option<&T> {
        match self {
            Localized::ByLocale(map) => map.get(locale).and_then(Option::as_ref),
            Localized::Plain(value) => Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocImpact {
    Plain(String),
    Detailed {
        #[serde(default, deserialize_with = "lenient::string")]
        description: String,
    },
}

impl DocImpact {
    pub fn description(&self) -> &str {
        match self {
            DocImpact::Plain(text) => text,
            DocImpact::Detailed { description } => description,
        }
    }
}

/// Disease document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DiseaseDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Classifier label this document describes
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub disease_id: Option<String>,

    /// `{fr, en, scientific}`
    #[serde(default)]
    pub name: Option<Localized<String>>,

    /// `maladie_virale`, `etat_sain`, `ravageur_insecte`, ...
    #[serde(rename = "type", default, deserialize_with = "lenient::string")]
    pub kind: String,

    #[serde(default)]
    pub description: Option<Localized<String>>,

    #[serde(default, deserialize_with = "lenient::string_list")]
    pub crops_affected: Vec<String>,

    #[serde(default)]
    pub urgency: Urgency,

    #[serde(default)]
    pub symptoms: Option<Localized<Vec<String>>>,

    #[serde(default, deserialize_with = "lenient::items")]
    pub pathogens: Vec<Pathogen>,

    #[serde(default, deserialize_with = "lenient::items")]
    pub vectors: Vec<VectorInfo>,

    #[serde(default, deserialize_with = "lenient::items")]
    pub treatment_options: Vec<TreatmentOption>,

    #[serde(default, deserialize_with = "lenient::string_list")]
    pub prevention_measures: Vec<String>,

    #[serde(default)]
    pub impact: Option<DocImpact>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub geographic_distribution: String,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Free-form dataset metadata (version, data source, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

/// Server-default index names (`disease_id_1`, `is_active_1`), matching
/// collections provisioned outside this service
impl IntoIndexes for DiseaseDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "disease_id": 1 },
                Some(IndexOptions::builder().unique(true).build()),
            ),
            (doc! { "is_active": 1 }, None),
        ]
    }
}
