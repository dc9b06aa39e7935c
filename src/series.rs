// Chart series construction from raw or aggregated columns

use crate::aggregate::{aggregate_column, Aggregation};
use crate::data::Dataset;
use crate::palette::{Color, ColorSource};
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

/// Column whose values label the rows of a numeric raw series, when present.
pub const INDEX_COLUMN: &str = "Index";

/// Chart-ready structure handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub datasets: Vec<SeriesDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDataset {
    pub label: String,
    pub data: Vec<f64>,
    pub background_color: SeriesColor,
    pub border_color: SeriesColor,
    pub border_width: u32,
    pub fill: bool,
}

/// One color for the whole dataset, or one per data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesColor {
    Uniform(Color),
    PerPoint(Vec<Color>),
}

impl SeriesColor {
    pub fn at(&self, index: usize) -> Color {
        match self {
            SeriesColor::Uniform(color) => *color,
            SeriesColor::PerPoint(colors) => colors
                .get(index)
                .or_else(|| colors.last())
                .copied()
                .unwrap_or(Color::rgb(0, 0, 0)),
        }
    }
}

/// A single plotted value with its label and fill color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
    pub color: Color,
}

impl ChartSeries {
    /// The `(label, value, color)` triples of one dataset.
    pub fn points(&self, dataset: usize) -> Vec<SeriesPoint> {
        let Some(set) = self.datasets.get(dataset) else {
            return Vec::new();
        };
        self.labels
            .iter()
            .zip(&set.data)
            .enumerate()
            .map(|(i, (label, value))| SeriesPoint {
                label: label.clone(),
                value: *value,
                color: set.background_color.at(i),
            })
            .collect()
    }

    /// Same labels and data, ignoring colors.
    pub fn same_content(&self, other: &ChartSeries) -> bool {
        self.labels == other.labels
            && self.datasets.len() == other.datasets.len()
            && self
                .datasets
                .iter()
                .zip(&other.datasets)
                .all(|(a, b)| a.label == b.label && same_values(&a.data, &b.data))
    }
}

fn same_values(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
}

/// Build the series for one column.
///
/// A column where every cell reads as a number becomes a numeric series
/// labeled by row (or by the `Index` column). Anything else becomes a
/// frequency series over the text form of each cell, absent cells counted
/// as `null/undefined`, groups in first-seen order.
pub fn build_raw_series(data: &Dataset, header: &str, colors: &mut dyn ColorSource) -> ChartSeries {
    let column = data.column(header);
    let numeric: Option<Vec<f64>> = column.iter().map(|v| v.as_number()).collect();
    let color = colors.next_color();

    let (labels, values) = match numeric {
        Some(values) => (row_labels(data), values),
        None => {
            let mut counts: IndexMap<String, usize> = IndexMap::new();
            for value in &column {
                *counts.entry(value.to_text()).or_insert(0) += 1;
            }
            counts.into_iter().map(|(k, c)| (k, c as f64)).unzip()
        }
    };

    ChartSeries {
        labels,
        datasets: vec![SeriesDataset {
            label: header.to_string(),
            data: values,
            background_color: SeriesColor::Uniform(color),
            border_color: SeriesColor::Uniform(color),
            border_width: 1,
            fill: false,
        }],
    }
}

fn row_labels(data: &Dataset) -> Vec<String> {
    let has_index = data.has_header(INDEX_COLUMN);
    data.rows
        .iter()
        .enumerate()
        .map(|(i, row)| match row.get(INDEX_COLUMN) {
            Some(label) if has_index => label.to_text(),
            _ => i.to_string(),
        })
        .collect()
}

/// Aggregate each header and collect the results into a single comparative
/// dataset, one bar per header.
///
/// Results are forced into plottable numbers: numbers as-is, text by its
/// length, any other value as zero.
pub fn build_aggregated_series(
    data: &Dataset,
    headers: &[String],
    aggregation: Aggregation,
    colors: &mut dyn ColorSource,
) -> ChartSeries {
    let background: Vec<Color> = headers.iter().map(|_| colors.next_color()).collect();
    let border: Vec<Color> = headers.iter().map(|_| colors.next_color()).collect();

    let values = headers
        .iter()
        .map(|header| {
            let result = aggregate_column(data, header, aggregation);
            debug!("Aggregation result for {} with {}: {}", header, aggregation, result);
            result.plot_value()
        })
        .collect();

    ChartSeries {
        labels: headers.to_vec(),
        datasets: vec![SeriesDataset {
            label: format!("{} of Headers", aggregation),
            data: values,
            background_color: SeriesColor::PerPoint(background),
            border_color: SeriesColor::PerPoint(border),
            border_width: 1,
            fill: true,
        }],
    }
}

/// Tooltip text carrying the untruncated aggregation result.
pub fn aggregation_tooltip(data: &Dataset, header: &str, aggregation: Aggregation) -> String {
    format!(
        "{} of {}: {}",
        aggregation,
        header,
        aggregate_column(data, header, aggregation)
    )
}

/// Several raw columns on one chart, labeled `Row 1..n`.
///
/// Numeric columns plot their values; other columns plot their category
/// counts in first-seen order.
pub fn build_comparison_series(
    data: &Dataset,
    headers: &[String],
    colors: &mut dyn ColorSource,
) -> ChartSeries {
    let datasets = headers
        .iter()
        .map(|header| {
            let column = data.column(header);
            let numeric: Option<Vec<f64>> = column.iter().map(|v| v.as_number()).collect();
            let color = colors.next_color();
            let fill = numeric.is_some();
            let values = numeric.unwrap_or_else(|| {
                let mut counts: IndexMap<String, usize> = IndexMap::new();
                for value in &column {
                    *counts.entry(value.to_text()).or_insert(0) += 1;
                }
                counts.into_values().map(|c| c as f64).collect()
            });
            SeriesDataset {
                label: header.clone(),
                data: values,
                background_color: SeriesColor::Uniform(color),
                border_color: SeriesColor::Uniform(color),
                border_width: 1,
                fill,
            }
        })
        .collect();

    ChartSeries {
        labels: (1..=data.len()).map(|i| format!("Row {}", i)).collect(),
        datasets,
    }
}
