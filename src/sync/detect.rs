//! Change detection between a stored row and a candidate row.
//!
//! Only keys present in the stored row are compared. Keys containing
//! `DATE` are ignored, and a null or missing value on either side never
//! counts as a difference. A number or boolean on either side compares
//! numerically, so `1`, `"1"` and `true` are equal. Two strings compare
//! exactly.

use serde_json::Value;

use crate::storage::Row;

/// First column whose values differ, if any.
#[must_use]
pub fn first_difference(stored: &Row, candidate: &Row) -> Option<String> {
    stored
        .iter()
        .filter(|(column, _)| !column.contains("DATE"))
        .find_map(|(column, stored_value)| {
            let candidate_value = candidate.get(column)?;
            if stored_value.is_null() || candidate_value.is_null() {
                return None;
            }
            (!loose_eq(stored_value, candidate_value)).then(|| column.clone())
        })
}

/// Whether the candidate differs from the stored row.
#[must_use]
pub fn is_changed(stored: &Row, candidate: &Row) -> bool {
    first_difference(stored, candidate).is_some()
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    if let (Value::String(_), Value::String(_)) = (a, b) {
        return false;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
