//! Tolerant field readers for hand-maintained disease data
//!
//! Used through `#[serde(deserialize_with = "...")]` on raw store shapes.
//! A value of the wrong JSON type degrades to an empty default instead of
//! failing the whole record; only a missing id or name is an error, and
//! that is decided by the normalizer.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use super::record::Urgency;

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Any scalar as text; null, lists and maps become ""
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value).unwrap_or_default())
}

/// A scalar as `Some(text)`, anything else as `None`
pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value))
}

/// A list of scalars; a lone string becomes a one-element list
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}

/// A number, or a string holding one
pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    })
}

pub fn urgency<'de, D>(deserializer: D) -> Result<Urgency, D::Error>
where
    D: Deserializer<'de>,
{
    let text = string(deserializer)?;
    Ok(Urgency::from(text.as_str()))
}

/// A list of structured sub-records
///
/// Objects are decoded as `T`, bare strings go through `From<String>`.
/// Anything else is skipped with a warning.
pub fn items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + From<String>,
{
    let value = Value::deserialize(deserializer)?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Null => return Ok(Vec::new()),
        other => vec![other],
    };

    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::String(s) => out.push(T::from(s)),
            Value::Object(_) => match serde_json::from_value::<T>(entry) {
                Ok(item) => out.push(item),
                Err(e) => warn!(error = %e, "Skipping unreadable sub-record"),
            },
            other => warn!(value = %other, "Skipping sub-record of unexpected type"),
        }
    }
    Ok(out)
}
