//! Disease knowledge resolution
//!
//! Classifier labels are joined against a disease database held either in
//! MongoDB or in a static JSON file. The store is chosen once at startup
//! (`selector`); the `DiseaseService` hides which one won and always returns
//! canonical `DiseaseRecord`s.

pub mod document;
pub mod lenient;
pub mod normalize;
pub mod record;
pub mod search;
pub mod selector;
pub mod service;
pub mod static_file;
pub mod stats;
pub mod store;
pub mod treatments;

pub use document::DocumentStore;
pub use normalize::{normalize, DOCUMENT_LOCALE};
pub use record::{Category, DiseaseRecord, Pathogen, TreatmentOption, Urgency, VectorInfo};
pub use search::{SearchHit, SearchResults, MAX_RESULTS};
pub use selector::{select_store, SelectedStore, StoreConfig, DEFAULT_PROBE_TIMEOUT};
pub use service::{DatabaseSnapshot, DiseaseService};
pub use static_file::{StaticDatabase, StaticFileStore};
pub use stats::DatabaseStats;
pub use store::{DiseaseStore, RawRecord, Section, StoreSource};
pub use treatments::TreatmentQuery;
