// Dataset lifecycle and selection state for one view

use crate::aggregate::Aggregation;
use crate::chart::ChartType;
use crate::data::Dataset;
use crate::filter::{apply_filters, FilterSpec};
use crate::graph::{ChartBoard, ChartHandle};
use crate::palette::ColorSource;
use crate::series::{build_aggregated_series, build_comparison_series, build_raw_series};
use anyhow::{anyhow, Result};
use log::{info, warn};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// One chart per selected header
    #[default]
    Raw,
    /// One chart comparing an aggregate of every selected header
    Aggregated,
    /// Selected headers overlaid on one chart, row by row
    Compare,
}

/// Holds the pristine dataset, the active filters and the user's selections.
///
/// The pristine dataset is never modified; the filtered view is rebuilt from
/// it whenever the filters change.
#[derive(Debug, Clone, Default)]
pub struct Session {
    original: Dataset,
    view: Dataset,
    filters: Vec<FilterSpec>,
    selected: Vec<String>,
    chart_type: ChartType,
    aggregation: Option<Aggregation>,
    mode: DisplayMode,
}

impl Session {
    pub fn new(data: Dataset) -> Self {
        let mut session = Self::default();
        session.load(data);
        session
    }

    /// Replace the dataset wholesale, discarding filters and selections.
    pub fn load(&mut self, data: Dataset) {
        info!("Loading dataset: {} rows, {} headers", data.len(), data.headers.len());
        self.view = data.clone();
        self.original = data;
        self.filters.clear();
        self.selected.clear();
        self.mode = DisplayMode::Raw;
    }

    /// Tear down everything the view derived from the dataset.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn headers(&self) -> &[String] {
        &self.original.headers
    }

    pub fn original(&self) -> &Dataset {
        &self.original
    }

    /// The dataset as seen through the active filters.
    pub fn view(&self) -> &Dataset {
        &self.view
    }

    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    pub fn selected_headers(&self) -> &[String] {
        &self.selected
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn aggregation(&self) -> Option<Aggregation> {
        self.aggregation
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Select a header for charting. Selecting it twice has no effect.
    pub fn drop_header(&mut self, header: &str) -> Result<()> {
        if !self.original.has_header(header) {
            return Err(anyhow!("Unknown header '{}'", header));
        }
        if self.selected.iter().any(|h| h == header) {
            warn!("Header '{}' is already selected", header);
        } else {
            self.selected.push(header.to_string());
        }
        Ok(())
    }

    pub fn remove_header(&mut self, header: &str) -> bool {
        let before = self.selected.len();
        self.selected.retain(|h| h != header);
        self.selected.len() != before
    }

    /// Activate a filter. A filter already active on the same header is replaced.
    pub fn apply_filter(&mut self, spec: FilterSpec) -> Result<()> {
        if !self.original.has_header(&spec.header) {
            return Err(anyhow!("Cannot filter unknown header '{}'", spec.header));
        }
        self.filters.retain(|f| f.header != spec.header);
        self.filters.push(spec);
        self.view = apply_filters(&self.original, &self.filters);
        Ok(())
    }

    /// Drop every active filter and return to the pristine dataset.
    pub fn clear_filters(&mut self) -> bool {
        if self.filters.is_empty() {
            return false;
        }
        self.filters.clear();
        self.view = self.original.clone();
        true
    }

    pub fn set_chart_type(&mut self, chart_type: ChartType) {
        self.chart_type = chart_type;
    }

    pub fn set_aggregation(&mut self, aggregation: Aggregation) {
        self.aggregation = Some(aggregation);
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    /// Build the charts for the current mode and selections.
    pub fn build_board(&self, colors: &mut dyn ColorSource) -> Result<ChartBoard> {
        if self.selected.is_empty() {
            return Err(anyhow!("No headers selected"));
        }

        let mut board = ChartBoard::new();
        match self.mode {
            DisplayMode::Raw => {
                for header in &self.selected {
                    let series = build_raw_series(&self.view, header, colors);
                    let title = format!("Chart for {}", header);
                    board.push(ChartHandle::new(title, series, self.chart_type));
                }
            }
            DisplayMode::Aggregated => {
                let aggregation = self
                    .aggregation
                    .ok_or_else(|| anyhow!("Aggregated mode requires an aggregation function"))?;
                let series =
                    build_aggregated_series(&self.view, &self.selected, aggregation, colors);
                board.push(ChartHandle::new("Aggregated Graphs", series, self.chart_type));
            }
            DisplayMode::Compare => {
                let series = build_comparison_series(&self.view, &self.selected, colors);
                board.push(ChartHandle::new(
                    "Comparison Chart for Selected Headers",
                    series,
                    ChartType::Line,
                ));
            }
        }
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::row;
    use crate::palette::ColorPalette;
    use crate::value::CellValue;

    fn dataset() -> Dataset {
        Dataset::new(
            vec!["X".to_string(), "Y".to_string()],
            vec![
                row([("X", CellValue::text("a")), ("Y", CellValue::Number(1.0))]),
                row([("X", CellValue::text("b")), ("Y", CellValue::Number(2.0))]),
            ],
        )
    }

    #[test]
    fn test_filter_and_clear() {
        let mut session = Session::new(dataset());
        session
            .apply_filter(FilterSpec::new("X", vec![CellValue::text("a")]))
            .unwrap();
        assert_eq!(session.view().present_values("X").len(), 1);
        assert_eq!(session.original(), &dataset());
        assert!(session.clear_filters());
        assert_eq!(session.view(), &dataset());
        assert!(!session.clear_filters());
    }

    #[test]
    fn test_refiltering_same_header_replaces() {
        let mut session = Session::new(dataset());
        session
            .apply_filter(FilterSpec::new("X", vec![CellValue::text("a")]))
            .unwrap();
        session
            .apply_filter(FilterSpec::new("X", vec![CellValue::text("b")]))
            .unwrap();
        assert_eq!(session.filters().len(), 1);
        assert_eq!(session.view().present_values("X"), vec![CellValue::text("b")]);
    }

    #[test]
    fn test_unknown_header_rejected() {
        let mut session = Session::new(dataset());
        assert!(session.drop_header("Z").is_err());
        assert!(session.apply_filter(FilterSpec::new("Z", vec![])).is_err());
    }

    #[test]
    fn test_load_discards_state() {
        let mut session = Session::new(dataset());
        session.drop_header("X").unwrap();
        session.drop_header("X").unwrap();
        assert_eq!(session.selected_headers(), ["X".to_string()]);
        session
            .apply_filter(FilterSpec::new("Y", vec![CellValue::Number(1.0)]))
            .unwrap();
        session.set_mode(DisplayMode::Aggregated);

        session.load(dataset());
        assert!(session.selected_headers().is_empty());
        assert!(session.filters().is_empty());
        assert_eq!(session.mode(), DisplayMode::Raw);
    }

    #[test]
    fn test_raw_board_has_one_chart_per_header() {
        let mut session = Session::new(dataset());
        session.drop_header("X").unwrap();
        session.drop_header("Y").unwrap();
        let board = session.build_board(&mut ColorPalette::category10()).unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board.get(0).unwrap().title(), "Chart for X");
        assert!(session.remove_header("X"));
        assert!(!session.remove_header("X"));
    }

    #[test]
    fn test_aggregated_board() {
        let mut session = Session::new(dataset());
        session.drop_header("Y").unwrap();
        session.set_mode(DisplayMode::Aggregated);
        assert!(session.build_board(&mut ColorPalette::category10()).is_err());

        session.set_aggregation(Aggregation::Sum);
        let board = session.build_board(&mut ColorPalette::category10()).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board.get(0).unwrap().series().datasets[0].data, vec![3.0]);
    }

    #[test]
    fn test_empty_selection_rejected() {
        let session = Session::new(dataset());
        assert!(session.build_board(&mut ColorPalette::category10()).is_err());
    }

    #[test]
    fn test_reset() {
        let mut session = Session::new(dataset());
        session.drop_header("X").unwrap();
        session.reset();
        assert!(session.headers().is_empty());
        assert!(session.selected_headers().is_empty());
    }
}
