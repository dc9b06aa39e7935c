// Aggregation engine: one result per column

use crate::coerce::{compare_values, serialized_magnitude, sum_contribution};
use crate::data::Dataset;
use crate::expr;
use crate::value::{format_number, CellValue};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub const NO_DATA: &str = "No data available";
pub const UNKNOWN_AGGREGATION: &str = "Unknown aggregation function";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregation {
    Concat,
    Count,
    CountDistinct,
    Mode,
    Minimum,
    Maximum,
    Sum,
    Average,
    Median,
    Range,
    Attribute,
    Percentage,
}

impl Aggregation {
    pub const ALL: [Aggregation; 12] = [
        Aggregation::Concat,
        Aggregation::Count,
        Aggregation::CountDistinct,
        Aggregation::Mode,
        Aggregation::Minimum,
        Aggregation::Maximum,
        Aggregation::Sum,
        Aggregation::Average,
        Aggregation::Median,
        Aggregation::Range,
        Aggregation::Attribute,
        Aggregation::Percentage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::Concat => "Concat",
            Aggregation::Count => "Count",
            Aggregation::CountDistinct => "CountDistinct",
            Aggregation::Mode => "Mode",
            Aggregation::Minimum => "Minimum",
            Aggregation::Maximum => "Maximum",
            Aggregation::Sum => "Sum",
            Aggregation::Average => "Average",
            Aggregation::Median => "Median",
            Aggregation::Range => "Range",
            Aggregation::Attribute => "Attribute",
            Aggregation::Percentage => "Percentage",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Aggregation::ALL
            .iter()
            .find(|a| a.name() == s)
            .copied()
            .ok_or_else(|| format!("Unknown aggregation '{}'", s))
    }
}

/// Outcome of one aggregation. Sentinel texts are ordinary `Text` results.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationResult {
    Number(f64),
    Text(String),
    /// A non-numeric, non-text cell returned as-is (e.g. Minimum of booleans).
    Value(CellValue),
}

impl AggregationResult {
    fn from_cell(value: CellValue) -> Self {
        match value {
            CellValue::Number(n) => AggregationResult::Number(n),
            CellValue::Text(s) => AggregationResult::Text(s),
            other => AggregationResult::Value(other),
        }
    }

    /// Height used when plotting: numbers as-is, text by character length,
    /// anything else as zero.
    pub fn plot_value(&self) -> f64 {
        match self {
            AggregationResult::Number(n) => *n,
            AggregationResult::Text(s) => s.chars().count() as f64,
            AggregationResult::Value(_) => 0.0,
        }
    }
}

impl fmt::Display for AggregationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationResult::Number(n) => f.write_str(&format_number(*n)),
            AggregationResult::Text(s) => f.write_str(s),
            AggregationResult::Value(v) => write!(f, "{}", v),
        }
    }
}

/// Aggregate a column of a dataset. Absent cells are dropped first; a header
/// missing from the dataset yields the empty-column result.
pub fn aggregate_column(
    data: &Dataset,
    header: &str,
    aggregation: Aggregation,
) -> AggregationResult {
    let values = data.present_values(header);
    debug!(
        "Calculating {} for header {}: {} values",
        aggregation,
        header,
        values.len()
    );
    aggregate(&values, aggregation)
}

/// Aggregate by selector name, as received from a selection UI.
pub fn aggregate_named(values: &[CellValue], name: &str) -> AggregationResult {
    let present: Vec<CellValue> = values.iter().filter(|v| !v.is_absent()).cloned().collect();
    if present.is_empty() {
        return AggregationResult::Text(NO_DATA.to_string());
    }
    match name.parse::<Aggregation>() {
        Ok(aggregation) => aggregate(&present, aggregation),
        Err(_) => AggregationResult::Text(UNKNOWN_AGGREGATION.to_string()),
    }
}

/// Aggregate a slice of cells. Absent cells are ignored.
pub fn aggregate(values: &[CellValue], aggregation: Aggregation) -> AggregationResult {
    let data: Vec<&CellValue> = values.iter().filter(|v| !v.is_absent()).collect();
    if data.is_empty() {
        return AggregationResult::Text(NO_DATA.to_string());
    }

    match aggregation {
        Aggregation::Concat => {
            AggregationResult::Text(data.iter().map(|v| v.to_text()).collect())
        }
        Aggregation::Count => AggregationResult::Number(data.len() as f64),
        Aggregation::CountDistinct => {
            let distinct: HashSet<String> = data.iter().map(|v| v.to_text()).collect();
            AggregationResult::Number(distinct.len() as f64)
        }
        Aggregation::Mode => mode(&data),
        Aggregation::Minimum => extreme(&data, false),
        Aggregation::Maximum => extreme(&data, true),
        Aggregation::Sum => {
            AggregationResult::Number(data.iter().map(|v| sum_contribution(v)).sum())
        }
        Aggregation::Average => {
            let total: f64 = data.iter().map(|v| serialized_magnitude(v)).sum();
            AggregationResult::Number(total / data.len() as f64)
        }
        Aggregation::Median => median(&data),
        Aggregation::Range => {
            let magnitudes: Vec<f64> = data.iter().map(|v| serialized_magnitude(v)).collect();
            let min = magnitudes.iter().copied().fold(f64::INFINITY, f64::min);
            let max = magnitudes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            AggregationResult::Number(max - min)
        }
        Aggregation::Attribute => attribute(&data),
        Aggregation::Percentage => AggregationResult::Text(percentage(&data)),
    }
}

fn mode(data: &[&CellValue]) -> AggregationResult {
    let mut frequency: IndexMap<String, usize> = IndexMap::new();
    for value in data {
        *frequency.entry(value.to_text()).or_insert(0) += 1;
    }
    let max_freq = frequency.values().copied().max().unwrap_or(0);
    let modes: Vec<&str> = frequency
        .iter()
        .filter(|(_, &count)| count == max_freq)
        .map(|(key, _)| key.as_str())
        .collect();
    AggregationResult::Text(modes.join(", "))
}

fn extreme(data: &[&CellValue], max: bool) -> AggregationResult {
    let numbers: Option<Vec<f64>> = data
        .iter()
        .map(|v| match v {
            CellValue::Number(n) => Some(*n),
            _ => None,
        })
        .collect();

    if let Some(numbers) = numbers {
        let result = if max {
            numbers.into_iter().fold(f64::NEG_INFINITY, f64::max)
        } else {
            numbers.into_iter().fold(f64::INFINITY, f64::min)
        };
        return AggregationResult::Number(result);
    }

    let mut sorted: Vec<&CellValue> = data.to_vec();
    if max {
        sorted.sort_by(|a, b| compare_values(b, a));
    } else {
        sorted.sort_by(|a, b| compare_values(a, b));
    }
    sorted
        .first()
        .map(|v| AggregationResult::from_cell((*v).clone()))
        .unwrap_or_else(|| AggregationResult::Text(NO_DATA.to_string()))
}

fn median(data: &[&CellValue]) -> AggregationResult {
    let mut sorted: Vec<&CellValue> = data.to_vec();
    sorted.sort_by(|a, b| compare_values(a, b));
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        AggregationResult::Number(midpoint(sorted[middle - 1], sorted[middle]))
    } else {
        AggregationResult::from_cell(sorted[middle].clone())
    }
}

/// Mean of the two middle cells taken as raw values, not coerced magnitudes.
///
/// Numbers and booleans add numerically. Any other pairing joins the two text
/// forms and halves the joined text when it reads as a number; otherwise NaN.
fn midpoint(a: &CellValue, b: &CellValue) -> f64 {
    match (primitive_number(a), primitive_number(b)) {
        (Some(x), Some(y)) => (x + y) / 2.0,
        _ => {
            let joined = format!("{}{}", a.to_text(), b.to_text());
            crate::value::parse_number(&joined).map_or(f64::NAN, |n| n / 2.0)
        }
    }
}

fn primitive_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n),
        CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn attribute(data: &[&CellValue]) -> AggregationResult {
    let mut seen: HashSet<String> = HashSet::new();
    let mut first_distinct: Vec<&CellValue> = Vec::new();
    for value in data {
        let key = match value {
            CellValue::Object(_) => format!("object:{}", value.to_text()),
            other => format!("{:?}", other),
        };
        if seen.insert(key) {
            first_distinct.push(value);
        }
    }
    first_distinct
        .first()
        .map(|v| AggregationResult::from_cell((*v).clone()))
        .unwrap_or_else(|| AggregationResult::Text(NO_DATA.to_string()))
}

fn percentage(data: &[&CellValue]) -> String {
    let numeric: Vec<f64> = data
        .iter()
        .filter_map(|value| match value {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => {
                let evaluated = expr::evaluate(s);
                if evaluated.is_none() {
                    warn!("Dropping unevaluable value '{}' from Percentage", s);
                }
                evaluated
            }
            _ => None,
        })
        .filter(|n| !n.is_nan())
        .collect();

    let last = match numeric.last() {
        Some(last) => *last,
        None => return "0%".to_string(),
    };
    let sum: f64 = numeric.iter().sum();
    // Cancellation can leave a residue like 5.5e-17; that counts as zero.
    if sum.abs() <= f64::EPSILON {
        return "0%".to_string();
    }

    let ratio = last / sum * 100.0;
    if ratio.is_finite() {
        format!(" {:.2}%", ratio)
    } else {
        " 0%".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nums(values: &[f64]) -> Vec<CellValue> {
        values.iter().map(|n| CellValue::Number(*n)).collect()
    }

    fn texts(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|s| CellValue::text(*s)).collect()
    }

    fn number(result: AggregationResult) -> f64 {
        match result {
            AggregationResult::Number(n) => n,
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_scenario() {
        let column = nums(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(aggregate(&column, Aggregation::Sum), AggregationResult::Number(10.0));
        assert_eq!(aggregate(&column, Aggregation::Average), AggregationResult::Number(2.5));
        assert_eq!(aggregate(&column, Aggregation::Median), AggregationResult::Number(2.5));
        assert_eq!(aggregate(&column, Aggregation::Range), AggregationResult::Number(3.0));
        assert_eq!(aggregate(&column, Aggregation::Minimum), AggregationResult::Number(1.0));
        assert_eq!(aggregate(&column, Aggregation::Maximum), AggregationResult::Number(4.0));
    }

    #[test]
    fn test_text_scenario() {
        let column = texts(&["a", "bb", "a"]);
        assert_eq!(aggregate(&column, Aggregation::CountDistinct), AggregationResult::Number(2.0));
        assert_eq!(aggregate(&column, Aggregation::Mode), AggregationResult::Text("a".into()));
        assert_eq!(aggregate(&column, Aggregation::Count), AggregationResult::Number(3.0));
        assert_eq!(aggregate(&column, Aggregation::Concat), AggregationResult::Text("abba".into()));
    }

    #[test]
    fn test_empty_column_reports_no_data() {
        for aggregation in Aggregation::ALL {
            assert_eq!(
                aggregate(&[], aggregation),
                AggregationResult::Text(NO_DATA.to_string()),
                "{}",
                aggregation
            );
        }
        assert_eq!(
            aggregate(&[CellValue::Absent], Aggregation::Count),
            AggregationResult::Text(NO_DATA.to_string())
        );
    }

    #[test]
    fn test_percentage_of_last_value() {
        let column = nums(&[10.0, 20.0, 30.0]);
        assert_eq!(
            aggregate(&column, Aggregation::Percentage),
            AggregationResult::Text(" 50.00%".into())
        );
    }

    #[test]
    fn test_percentage_evaluates_text_and_drops_garbage() {
        let column = vec![
            CellValue::text("2 * 5"),
            CellValue::text("not a number"),
            CellValue::Bool(true),
            CellValue::text("30"),
        ];
        // 30 / (10 + 30)
        assert_eq!(
            aggregate(&column, Aggregation::Percentage),
            AggregationResult::Text(" 75.00%".into())
        );
    }

    #[test]
    fn test_percentage_degenerate_inputs() {
        let zero = AggregationResult::Text("0%".into());
        assert_eq!(aggregate(&texts(&["x", "y"]), Aggregation::Percentage), zero);
        assert_eq!(aggregate(&nums(&[5.0, -5.0]), Aggregation::Percentage), zero);
        let infinite = vec![CellValue::Number(1.0), CellValue::text("1/0")];
        assert_eq!(
            aggregate(&infinite, Aggregation::Percentage),
            AggregationResult::Text(" 0%".into())
        );
    }

    #[test]
    fn test_percentage_near_zero_sum() {
        let column = nums(&[0.1, 0.2, -0.3]);
        assert_eq!(
            aggregate(&column, Aggregation::Percentage),
            AggregationResult::Text("0%".into())
        );
    }

    #[test]
    fn test_percentage_drops_deeply_nested_text() {
        let nested = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let signs = format!("{}1", "-".repeat(200_000));
        let column = vec![
            CellValue::Number(1.0),
            CellValue::text(nested),
            CellValue::text(signs),
        ];
        // Only the plain 1 survives: 1 / 1
        assert_eq!(
            aggregate(&column, Aggregation::Percentage),
            AggregationResult::Text(" 100.00%".into())
        );
    }

    #[test]
    fn test_every_aggregation_survives_pathological_text() {
        let column = vec![
            CellValue::text(format!("{}2", "(".repeat(50_000))),
            CellValue::text("1e400"),
            CellValue::text(""),
            CellValue::Number(f64::NAN),
            CellValue::Object(json!({"deep": [[[[]]]]})),
        ];
        for aggregation in Aggregation::ALL {
            let _ = aggregate(&column, aggregation);
        }
    }

    #[test]
    fn test_unknown_selector() {
        assert_eq!(
            aggregate_named(&nums(&[1.0]), "Variance"),
            AggregationResult::Text(UNKNOWN_AGGREGATION.to_string())
        );
        assert_eq!(aggregate_named(&nums(&[1.0, 2.0]), "Sum"), AggregationResult::Number(3.0));
    }

    #[test]
    fn test_empty_check_precedes_selector_dispatch() {
        assert_eq!(
            aggregate_named(&[], "Variance"),
            AggregationResult::Text(NO_DATA.to_string())
        );
    }

    #[test]
    fn test_mode_ties_in_first_seen_order() {
        let column = texts(&["b", "a", "b", "a", "c"]);
        assert_eq!(aggregate(&column, Aggregation::Mode), AggregationResult::Text("b, a".into()));
    }

    #[test]
    fn test_mode_stringifies_numbers() {
        let column = vec![CellValue::Number(1.0), CellValue::text("1"), CellValue::Number(2.0)];
        assert_eq!(aggregate(&column, Aggregation::Mode), AggregationResult::Text("1".into()));
    }

    #[test]
    fn test_count_distinct_uses_text_form() {
        let column = vec![CellValue::Number(1.0), CellValue::text("1"), CellValue::Bool(true)];
        assert_eq!(aggregate(&column, Aggregation::CountDistinct), AggregationResult::Number(2.0));
    }

    #[test]
    fn test_min_max_mixed_types() {
        let column = vec![
            CellValue::text("pear"),
            CellValue::Number(3.0),
            CellValue::text("apple"),
        ];
        assert_eq!(aggregate(&column, Aggregation::Minimum), AggregationResult::Number(3.0));
        assert_eq!(
            aggregate(&column, Aggregation::Maximum),
            AggregationResult::Text("pear".into())
        );
    }

    #[test]
    fn test_min_max_numeric_text() {
        let column = texts(&["10", "9", "100"]);
        assert_eq!(aggregate(&column, Aggregation::Minimum), AggregationResult::Text("9".into()));
        assert_eq!(aggregate(&column, Aggregation::Maximum), AggregationResult::Text("100".into()));
    }

    #[test]
    fn test_min_of_booleans_returns_value() {
        let column = vec![CellValue::Bool(true), CellValue::Bool(false)];
        let result = aggregate(&column, Aggregation::Minimum);
        assert_eq!(result, AggregationResult::Value(CellValue::Bool(false)));
        assert_eq!(result.plot_value(), 0.0);
    }

    #[test]
    fn test_sum_mixed_contributions() {
        let column = vec![
            CellValue::Number(1.5),
            CellValue::text("2"),
            CellValue::text("A"),
            CellValue::text("word"),
            CellValue::Bool(true),
            CellValue::Object(json!({"a": 1, "b": 2})),
        ];
        // 1.5 + 2 + 65 + 4 + 1 + 2
        assert_eq!(aggregate(&column, Aggregation::Sum), AggregationResult::Number(75.5));
    }

    #[test]
    fn test_sum_reads_leading_numbers_from_text() {
        let column = texts(&["12abc", "1,000"]);
        assert_eq!(aggregate(&column, Aggregation::Sum), AggregationResult::Number(13.0));
        let column = texts(&[" 2.5 kg", "x", "-"]);
        // 2.5 + 120 + 45
        assert_eq!(aggregate(&column, Aggregation::Sum), AggregationResult::Number(167.5));
    }

    #[test]
    fn test_average_uses_text_length_and_object_serialization() {
        let column = vec![CellValue::text("abcd"), CellValue::Object(json!({"a": 1}))];
        // (4 + 7) / 2
        assert_eq!(aggregate(&column, Aggregation::Average), AggregationResult::Number(5.5));
    }

    #[test]
    fn test_median_odd_returns_middle_value() {
        let column = texts(&["cherry", "apple", "banana"]);
        assert_eq!(
            aggregate(&column, Aggregation::Median),
            AggregationResult::Text("banana".into())
        );
    }

    #[test]
    fn test_median_even_text_is_nan() {
        let column = texts(&["a", "b", "c", "d"]);
        assert!(number(aggregate(&column, Aggregation::Median)).is_nan());
    }

    #[test]
    fn test_median_even_numeric_text_joins() {
        // Sorted as numbers: "1", "3"; the raw pair joins to "13"
        let column = texts(&["3", "1"]);
        assert_eq!(aggregate(&column, Aggregation::Median), AggregationResult::Number(6.5));
    }

    #[test]
    fn test_range_over_magnitudes() {
        let column = vec![CellValue::text("abc"), CellValue::Number(10.0), CellValue::Bool(false)];
        assert_eq!(aggregate(&column, Aggregation::Range), AggregationResult::Number(10.0));
    }

    #[test]
    fn test_attribute_returns_first_value() {
        let object = CellValue::Object(json!({"k": [1, 2]}));
        let column = vec![object.clone(), CellValue::text("x"), object.clone()];
        assert_eq!(aggregate(&column, Aggregation::Attribute), AggregationResult::Value(object));
    }

    #[test]
    fn test_properties_hold_for_numeric_column() {
        let column = nums(&[7.0, -2.0, 3.5, 11.0, 0.0, 4.0]);
        let sum = number(aggregate(&column, Aggregation::Sum));
        let count = number(aggregate(&column, Aggregation::Count));
        let average = number(aggregate(&column, Aggregation::Average));
        assert!((average - sum / count).abs() < 1e-12);

        let distinct = number(aggregate(&column, Aggregation::CountDistinct));
        assert!(distinct <= count);

        let min = number(aggregate(&column, Aggregation::Minimum));
        let max = number(aggregate(&column, Aggregation::Maximum));
        assert!(min <= max);
        assert_eq!(number(aggregate(&column, Aggregation::Range)), max - min);

        // sorted: -2, 0, 3.5, 4, 7, 11
        assert_eq!(number(aggregate(&column, Aggregation::Median)), 3.75);
    }

    #[test]
    fn test_aggregate_column_missing_header() {
        let data = Dataset::default();
        assert_eq!(
            aggregate_column(&data, "nope", Aggregation::Sum),
            AggregationResult::Text(NO_DATA.to_string())
        );
    }

    #[test]
    fn test_plot_value() {
        assert_eq!(AggregationResult::Number(4.0).plot_value(), 4.0);
        assert_eq!(AggregationResult::Text(NO_DATA.to_string()).plot_value(), 17.0);
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!("CountDistinct".parse::<Aggregation>(), Ok(Aggregation::CountDistinct));
        assert!("sum".parse::<Aggregation>().is_err());
    }
}
