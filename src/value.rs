use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// A single dataset cell.
///
/// `Absent` stands for both a null and a missing source value. It is kept in the
/// union so rows and columns can be represented uniformly, but every aggregation
/// drops it before dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Date(DateTime<Utc>),
    /// A structured object or array, kept as parsed JSON.
    Object(Value),
    Absent,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    /// Convert a JSON value into a cell. `null` becomes `Absent`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Absent,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(CellValue::Absent, CellValue::Number),
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => CellValue::Object(value.clone()),
        }
    }

    /// Text form used for grouping, deduplication, concatenation and export.
    ///
    /// Objects are written as compact JSON, dates as RFC 3339.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.to_rfc3339(),
            CellValue::Object(v) => serialize_object(v),
            CellValue::Absent => "null/undefined".to_string(),
        }
    }

    /// The numeric value of a number or of text that is entirely a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => parse_number(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Date(d) => serializer.serialize_str(&d.to_rfc3339()),
            CellValue::Object(v) => v.serialize(serializer),
            CellValue::Absent => serializer.serialize_none(),
        }
    }
}

/// Parse text that is, after trimming, a single finite number.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Format a number without a trailing `.0` for integral values.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{}", n)
    }
}

pub fn serialize_object(value: &Value) -> String {
    value.to_string()
}

/// Interpret text as a date, returning epoch milliseconds.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD`.
/// Naive forms are taken as UTC.
pub fn parse_date_millis(s: &str) -> Option<f64> {
    let s = s.trim().trim_matches('"');
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis() as f64);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis() as f64);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number(" 3.5 "), Some(3.5));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("12abc"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_from_json() {
        assert_eq!(CellValue::from_json(&json!(null)), CellValue::Absent);
        assert_eq!(CellValue::from_json(&json!(3)), CellValue::Number(3.0));
        assert_eq!(CellValue::from_json(&json!("x")), CellValue::text("x"));
        assert_eq!(CellValue::from_json(&json!(true)), CellValue::Bool(true));
        assert_eq!(
            CellValue::from_json(&json!({"a": 1})),
            CellValue::Object(json!({"a": 1}))
        );
    }

    #[test]
    fn test_to_text() {
        assert_eq!(CellValue::Number(1.0).to_text(), "1");
        assert_eq!(CellValue::Bool(false).to_text(), "false");
        assert_eq!(CellValue::Object(json!({"a": 1})).to_text(), "{\"a\":1}");
        assert_eq!(CellValue::Absent.to_text(), "null/undefined");
    }

    #[test]
    fn test_parse_date_millis() {
        assert_eq!(parse_date_millis("1970-01-01"), Some(0.0));
        assert_eq!(parse_date_millis("1970-01-01T00:00:01Z"), Some(1000.0));
        assert_eq!(parse_date_millis("\"1970-01-02\""), Some(86_400_000.0));
        assert_eq!(parse_date_millis("yesterday"), None);
    }
}
