// Value coercion shared by every aggregation

use crate::expr::leading_number;
use crate::value::{parse_date_millis, parse_number, serialize_object, CellValue};
use serde_json::Value;
use std::cmp::Ordering;

/// Orderable key derived from a cell. Numbers sort before text.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonKey {
    Number(f64),
    Text(String),
}

impl ComparisonKey {
    /// Total order: numbers by `f64::total_cmp`, text lexicographically,
    /// any number before any text.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ComparisonKey::Number(a), ComparisonKey::Number(b)) => a.total_cmp(b),
            (ComparisonKey::Text(a), ComparisonKey::Text(b)) => a.cmp(b),
            (ComparisonKey::Number(_), ComparisonKey::Text(_)) => Ordering::Less,
            (ComparisonKey::Text(_), ComparisonKey::Number(_)) => Ordering::Greater,
        }
    }
}

/// Magnitude of a cell. Objects count their keys (array length for arrays).
pub fn numeric_magnitude(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => parse_number(s).unwrap_or(s.chars().count() as f64),
        CellValue::Bool(b) => bool_number(*b),
        CellValue::Date(d) => d.timestamp_millis() as f64,
        CellValue::Object(v) => key_count(v) as f64,
        CellValue::Absent => f64::NAN,
    }
}

/// Magnitude used by Average and Range: objects measure their serialized length.
pub fn serialized_magnitude(value: &CellValue) -> f64 {
    match value {
        CellValue::Object(v) => serialize_object(v).chars().count() as f64,
        other => numeric_magnitude(other),
    }
}

/// Contribution of a cell to Sum.
///
/// Text that starts with a number contributes that number (`"12abc"` is 12).
/// Other single-character text contributes its character code, longer text
/// its length.
pub fn sum_contribution(value: &CellValue) -> f64 {
    match value {
        CellValue::Text(s) => match leading_number(s) {
            Some(n) => n,
            None => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c as u32 as f64,
                    _ => s.chars().count() as f64,
                }
            }
        },
        other => numeric_magnitude(other),
    }
}

/// Key used by the cross-type comparator. `None` for absent cells.
///
/// Objects are serialized and read as a date when possible, otherwise
/// compared by their serialized text.
pub fn comparison_key(value: &CellValue) -> Option<ComparisonKey> {
    match value {
        CellValue::Number(n) => Some(ComparisonKey::Number(*n)),
        CellValue::Text(s) => Some(match parse_number(s) {
            Some(n) => ComparisonKey::Number(n),
            None => ComparisonKey::Text(s.clone()),
        }),
        CellValue::Bool(b) => Some(ComparisonKey::Number(bool_number(*b))),
        CellValue::Date(d) => Some(ComparisonKey::Number(d.timestamp_millis() as f64)),
        CellValue::Object(v) => {
            let serialized = serialize_object(v);
            Some(match parse_date_millis(&serialized) {
                Some(ms) => ComparisonKey::Number(ms),
                None => ComparisonKey::Text(serialized),
            })
        }
        CellValue::Absent => None,
    }
}

/// Ascending cross-type comparison. Absent cells sort last.
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    match (comparison_key(a), comparison_key(b)) {
        (Some(ka), Some(kb)) => ka.compare(&kb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn bool_number(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn key_count(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.len(),
        Value::Array(items) => items.len(),
        _ => 0,
    }
}
