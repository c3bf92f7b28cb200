//! Disease knowledge endpoints
//!
//! - GET /api/diseases                  - Full snapshot of the active store
//! - GET /api/diseases/{id}             - One canonical record
//! - GET /api/diseases/{id}/treatments  - `?urgency=&type=&order=store`
//! - GET /api/diseases/{id}/vectors
//! - GET /api/classes                   - Labels the service understands
//! - GET /api/search                    - `?q=&category=`
//! - GET /api/stats/database

use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::diseases::{
    Category, DatabaseStats, DiseaseRecord, SearchHit, TreatmentOption, TreatmentQuery,
    VectorInfo, MAX_RESULTS,
};
use crate::routes::response::{
    agri_error_response, error_response, json_response, parse_query, success_response, timestamp,
    BoxBody,
};
use crate::server::AppState;
use crate::types::AgriError;

#[derive(Debug, Default, Deserialize)]
struct TreatmentParams {
    #[serde(default)]
    urgency: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    /// `store` keeps insertion order
    #[serde(default)]
    order: Option<String>,
}

impl TreatmentParams {
    /// Empty parameters (`?urgency=`) mean no filter
    fn into_query(self) -> TreatmentQuery {
        TreatmentQuery {
            ordered: self.order.as_deref() != Some("store"),
            priority: self.urgency.filter(|u| !u.is_empty()),
            kind: self.kind.filter(|k| !k.is_empty()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Serialize)]
struct DiseaseDetails {
    disease_class: String,
    disease_info: DiseaseRecord,
    timestamp: String,
}

#[derive(Serialize)]
struct TreatmentList {
    disease_class: String,
    urgency_filter: Option<String>,
    type_filter: Option<String>,
    total_treatments: usize,
    treatments: Vec<TreatmentOption>,
    timestamp: String,
}

#[derive(Serialize)]
struct VectorList {
    disease_class: String,
    total_vectors: usize,
    vectors: Vec<VectorInfo>,
    timestamp: String,
}

#[derive(Serialize)]
struct ClassList {
    supported_classes: Vec<String>,
    total_classes: usize,
    timestamp: String,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    category_filter: Option<Category>,
    total_results: usize,
    results: Vec<SearchHit>,
    timestamp: String,
}

#[derive(Serialize)]
struct DatabaseStatsResponse {
    database_stats: DatabaseStats,
    timestamp: String,
}

/// GET /api/diseases
pub async fn list_diseases(state: &AppState) -> Response<BoxBody> {
    let snapshot = state.diseases.get_database_snapshot().await;
    json_response(StatusCode::OK, &snapshot)
}

/// GET /api/diseases/{id}
pub async fn disease_details(state: &AppState, id: &str) -> Response<BoxBody> {
    match state.diseases.get_disease_info(id).await {
        Some(record) => success_response(DiseaseDetails {
            disease_class: id.to_string(),
            disease_info: record,
            timestamp: timestamp(),
        }),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Disease '{}' not found", id),
            Some("DISEASE_NOT_FOUND"),
        ),
    }
}

/// GET /api/diseases/{id}/treatments
///
/// Unknown ids answer an empty list, like a known disease with no options.
pub async fn disease_treatments(
    state: &AppState,
    id: &str,
    query: Option<&str>,
) -> Response<BoxBody> {
    let params: TreatmentParams = match parse_query(query) {
        Ok(p) => p,
        Err(e) => return agri_error_response(&e),
    };
    let query = params.into_query();
    let urgency_filter = query.priority.clone();
    let type_filter = query.kind.clone();

    let treatments = state.diseases.query_treatments(id, &query).await;

    success_response(TreatmentList {
        disease_class: id.to_string(),
        urgency_filter,
        type_filter,
        total_treatments: treatments.len(),
        treatments,
        timestamp: timestamp(),
    })
}

/// GET /api/diseases/{id}/vectors
pub async fn disease_vectors(state: &AppState, id: &str) -> Response<BoxBody> {
    let vectors = state.diseases.get_vectors(id).await;
    success_response(VectorList {
        disease_class: id.to_string(),
        total_vectors: vectors.len(),
        vectors,
        timestamp: timestamp(),
    })
}

/// GET /api/classes
pub async fn supported_classes(state: &AppState) -> Response<BoxBody> {
    let classes = state.class_names().await;
    success_response(ClassList {
        total_classes: classes.len(),
        supported_classes: classes,
        timestamp: timestamp(),
    })
}

/// GET /api/search
pub async fn search_diseases(state: &AppState, query: Option<&str>) -> Response<BoxBody> {
    let params: SearchParams = match parse_query(query) {
        Ok(p) => p,
        Err(e) => return agri_error_response(&e),
    };

    // Surrounding whitespace is dropped before matching
    let q = params.q.trim().to_lowercase();
    if q.is_empty() {
        return agri_error_response(&AgriError::BadRequest(
            "Search parameter 'q' is required".into(),
        ));
    }

    let category = match params.category.as_deref().filter(|c| !c.is_empty()) {
        Some(label) => match Category::parse(label) {
            Some(category) => Some(category),
            None => {
                return agri_error_response(&AgriError::BadRequest(format!(
                    "Unknown category '{}'",
                    label
                )))
            }
        },
        None => None,
    };

    let found = state.diseases.search(&q, category, MAX_RESULTS).await;

    success_response(SearchResponse {
        query: q,
        category_filter: category,
        total_results: found.total_results,
        results: found.results,
        timestamp: timestamp(),
    })
}

/// GET /api/stats/database
pub async fn database_stats(state: &AppState) -> Response<BoxBody> {
    success_response(DatabaseStatsResponse {
        database_stats: state.diseases.database_stats().await,
        timestamp: timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_treatment_params_default_to_priority_order() {
        let query = parse_query::<TreatmentParams>(Some("urgency=high"))
            .unwrap()
            .into_query();
        assert!(query.ordered);
        assert_eq!(query.priority.as_deref(), Some("high"));

        let query = parse_query::<TreatmentParams>(Some("order=store&type=chimique"))
            .unwrap()
            .into_query();
        assert!(!query.ordered);
        assert_eq!(query.kind.as_deref(), Some("chimique"));
    }

    #[test]
    fn test_empty_treatment_params_are_no_filter() {
        let query = parse_query::<TreatmentParams>(Some("urgency=&type="))
            .unwrap()
            .into_query();
        assert_eq!(query.priority, None);
        assert_eq!(query.kind, None);
        assert!(query.ordered);
    }
}
