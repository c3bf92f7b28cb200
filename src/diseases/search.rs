//! Free-text search over disease records
//!
//! Case-insensitive substring matching with three fixed weights:
//! name 10, description 5, symptoms 3. No stemming, no fuzziness.
//! Symptoms are matched as one `", "`-joined string, so a query may span
//! two adjacent symptoms but never matches list punctuation.

use serde::Serialize;

use super::record::{Category, DiseaseRecord, Urgency};

pub const NAME_WEIGHT: u32 = 10;
pub const DESCRIPTION_WEIGHT: u32 = 5;
pub const SYMPTOMS_WEIGHT: u32 = 3;

/// Results returned per search
pub const MAX_RESULTS: usize = 20;

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub disease_class: String,
    pub name: String,
    pub category: Category,
    /// First 200 characters of the description
    pub description: String,
    pub urgency: Urgency,
    pub relevance_score: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    /// Matches before truncation
    pub total_results: usize,
    pub results: Vec<SearchHit>,
}

/// Score for an already-lowercased query
pub fn relevance_score(query: &str, record: &DiseaseRecord) -> u32 {
    let mut score = 0;
    if record.name.to_lowercase().contains(query) {
        score += NAME_WEIGHT;
    }
    if record.description.to_lowercase().contains(query) {
        score += DESCRIPTION_WEIGHT;
    }
    if record.symptoms.join(", ").to_lowercase().contains(query) {
        score += SYMPTOMS_WEIGHT;
    }
    score
}

/// Rank `records` against `query`, best first.
///
/// Ties keep the order of `records`. An empty query matches everything.
pub fn search(
    records: &[DiseaseRecord],
    query: &str,
    category: Option<Category>,
    limit: usize,
) -> SearchResults {
    let query = query.to_lowercase();

    let mut hits: Vec<SearchHit> = records
        .iter()
        .filter(|r| category.map_or(true, |c| r.category == c))
        .filter_map(|r| {
            let score = relevance_score(&query, r);
            (score > 0 || query.is_empty()).then(|| SearchHit {
                disease_class: r.id.clone(),
                name: r.name.clone(),
                category: r.category,
                description: preview(&r.description),
                urgency: r.urgency.clone(),
                relevance_score: score,
            })
        })
        .collect();

    hits.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));

    let total_results = hits.len();
    hits.truncate(limit);
    SearchResults {
        total_results,
        results: hits,
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
