use crate::value::CellValue;
use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use serde_json::Value;

/// A sparse row: header name to cell. Headers missing from the map are absent.
pub type Row = IndexMap<String, CellValue>;

/// A loaded table. Row order is significant and the header list is fixed for
/// the lifetime of the value; derived views are built as new datasets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Create a Dataset from a JSON array of objects.
    ///
    /// Headers are the union of object keys in first-seen order.
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

        if array.is_empty() {
            return Err(anyhow!("Input data array is empty"));
        }

        let mut headers: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Items in array must be objects"))?;

            let mut row = Row::new();
            for (key, val) in obj {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
                match CellValue::from_json(val) {
                    CellValue::Absent => {}
                    cell => {
                        row.insert(key.clone(), cell);
                    }
                }
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_header(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    /// Cell at `row` for `header`, `Absent` when the row lacks the field.
    pub fn cell(&self, row: usize, header: &str) -> CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(header))
            .cloned()
            .unwrap_or(CellValue::Absent)
    }

    /// Every cell of a column in row order, absent entries included.
    pub fn column(&self, header: &str) -> Vec<CellValue> {
        self.rows
            .iter()
            .map(|row| row.get(header).cloned().unwrap_or(CellValue::Absent))
            .collect()
    }

    /// The column with absent entries removed: the input to every aggregation.
    pub fn present_values(&self, header: &str) -> Vec<CellValue> {
        self.rows
            .iter()
            .filter_map(|row| row.get(header))
            .filter(|v| !v.is_absent())
            .cloned()
            .collect()
    }
}

/// Build a row from `(header, value)` pairs, skipping absent values.
pub fn row<K: Into<String>>(cells: impl IntoIterator<Item = (K, CellValue)>) -> Row {
    cells
        .into_iter()
        .filter(|(_, v)| !v.is_absent())
        .map(|(k, v)| (k.into(), v))
        .collect()
}
