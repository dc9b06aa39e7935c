// Header filter projector

use crate::data::Dataset;
use crate::value::CellValue;
use log::info;
use serde::Serialize;

/// Allow-list for one header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSpec {
    pub header: String,
    pub allowed: Vec<CellValue>,
}

impl FilterSpec {
    pub fn new(header: impl Into<String>, allowed: Vec<CellValue>) -> Self {
        Self {
            header: header.into(),
            allowed,
        }
    }

    fn allows(&self, value: Option<&CellValue>) -> bool {
        value.map_or(false, |v| self.allowed.contains(v))
    }
}

/// Project `data` through an allow-list on `header`.
///
/// Every row is kept. Rows whose value for `header` is not allowed lose that
/// field; their other fields are untouched.
pub fn apply_filter(data: &Dataset, header: &str, allowed: &[CellValue]) -> Dataset {
    let spec = FilterSpec::new(header, allowed.to_vec());
    apply_filters(data, std::slice::from_ref(&spec))
}

/// Apply several filters in order, each against the output of the previous one.
pub fn apply_filters(data: &Dataset, specs: &[FilterSpec]) -> Dataset {
    let mut rows = data.rows.clone();
    for spec in specs {
        let mut removed = 0;
        for row in rows.iter_mut() {
            if !spec.allows(row.get(&spec.header)) && row.shift_remove(&spec.header).is_some() {
                removed += 1;
            }
        }
        info!(
            "Filter on '{}' ({} allowed values) cleared {} cells",
            spec.header,
            spec.allowed.len(),
            removed
        );
    }
    Dataset::new(data.headers.clone(), rows)
}

/// Drop all filters: the pristine dataset is the caller's own copy.
pub fn clear_filter(original: &Dataset) -> &Dataset {
    original
}

/// Distinct values of a column in first-seen order, the candidates offered
/// for an allow-list. `search` keeps values whose text contains it,
/// ignoring case.
pub fn distinct_values(data: &Dataset, header: &str, search: Option<&str>) -> Vec<CellValue> {
    let needle = search.map(|s| s.to_lowercase());
    let mut distinct: Vec<CellValue> = Vec::new();
    for value in data.column(header) {
        if let Some(needle) = &needle {
            if !value.to_text().to_lowercase().contains(needle.as_str()) {
                continue;
            }
        }
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }
    distinct
}
