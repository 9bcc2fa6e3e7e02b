//! Field normalization for the backend's loosely-shaped payloads.
//!
//! The aggregation API returns dictionary rows whose field names vary by
//! endpoint and version ("Aerolinea Nombre" vs "aerolinea" vs "name").
//! Each formatter declares the alternate keys it accepts; rows that match
//! none of them produce no usable data rather than an error.

use serde_json::Value;
use std::cmp::Ordering;

/// One canonical ranking row: a display label and a positive magnitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub label: String,
    pub value: f64,
}

/// First matching string field among `keys`, trimmed, non-empty.
pub fn pick_str(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// First matching numeric field among `keys`. Only finite numbers count;
/// string-encoded or missing values are treated as absent.
pub fn pick_f64(obj: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_f64))
        .filter(|v| v.is_finite())
}

/// Normalize an array payload into ranking rows: drop entries without a
/// recognizable label or with a non-positive/non-numeric magnitude, then
/// stable-sort descending by magnitude (ties keep original order).
pub fn ranked_entries(data: &Value, label_keys: &[&str], value_keys: &[&str]) -> Vec<Ranked> {
    let Some(items) = data.as_array() else {
        return Vec::new();
    };

    let mut entries: Vec<Ranked> = items
        .iter()
        .filter_map(|item| {
            let label = pick_str(item, label_keys)?;
            let value = pick_f64(item, value_keys).filter(|v| *v > 0.0)?;
            Some(Ranked { label, value })
        })
        .collect();

    entries.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    entries
}
