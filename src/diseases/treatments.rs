//! Treatment filtering and ordering

use serde::Deserialize;

use super::record::{TreatmentOption, Urgency};

/// How to cut down and order a record's treatment options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreatmentQuery {
    /// Exact match on `priority`
    #[serde(default, alias = "urgency")]
    pub priority: Option<String>,
    /// Exact match on `type`
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Sort by priority instead of keeping store order
    #[serde(default)]
    pub ordered: bool,
}

impl TreatmentQuery {
    /// Priority-ordered, optionally filtered on priority
    pub fn by_priority(priority: Option<&str>) -> Self {
        Self {
            priority: priority.map(str::to_string),
            kind: None,
            ordered: true,
        }
    }

    /// An empty filter value is the same as none
    pub fn apply(&self, options: Vec<TreatmentOption>) -> Vec<TreatmentOption> {
        let wanted_priority = self
            .priority
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Urgency::from);
        let wanted_kind = self.kind.as_deref().filter(|k| !k.is_empty());

        let mut selected: Vec<TreatmentOption> = options
            .into_iter()
            .filter(|t| wanted_priority.as_ref().map_or(true, |p| &t.priority == p))
            .filter(|t| wanted_kind.map_or(true, |k| t.kind == k))
            .collect();

        if self.ordered {
            sort_by_priority(&mut selected);
        }
        selected
    }
}

/// Stable sort, most urgent first; unknown priorities last
pub fn sort_by_priority(options: &mut [TreatmentOption]) {
    options.sort_by_key(|t| t.priority.rank());
}
