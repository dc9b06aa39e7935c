use crate::chart::ChartType;
use crate::palette::Color as SeriesRgb;
use crate::series::ChartSeries;
use crate::{OutputFormat, RenderOptions};
use anyhow::{Context, Result};
use image::ImageEncoder;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;

/// Visible data window of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub x: Range<f64>,
    pub y: Range<f64>,
}

/// One rendered chart: its series, chart type and current zoom state.
#[derive(Debug, Clone)]
pub struct ChartHandle {
    title: String,
    series: ChartSeries,
    chart_type: ChartType,
    viewport: Option<Viewport>,
}

impl ChartHandle {
    pub fn new(title: impl Into<String>, series: ChartSeries, chart_type: ChartType) -> Self {
        Self {
            title: title.into(),
            series,
            chart_type,
            viewport: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn series(&self) -> &ChartSeries {
        &self.series
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn is_zoomed(&self) -> bool {
        self.viewport.is_some()
    }

    /// Window covering every category and every finite value, with the
    /// value axis starting at zero.
    pub fn full_viewport(&self) -> Viewport {
        let n = self
            .series
            .datasets
            .iter()
            .map(|d| d.data.len())
            .chain(std::iter::once(self.series.labels.len()))
            .max()
            .unwrap_or(0)
            .max(1);

        let finite = self
            .series
            .datasets
            .iter()
            .flat_map(|d| d.data.iter().copied())
            .filter(|v| v.is_finite());
        let (y_min, y_max) = finite.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));

        let y = if y_min == y_max {
            (y_min - 1.0)..(y_max + 1.0)
        } else {
            let padding = (y_max - y_min) * 0.05;
            y_min..(y_max + padding)
        };

        Viewport { x: 0.0..(n as f64), y }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.clone().unwrap_or_else(|| self.full_viewport())
    }

    /// Zoom both axes around the window center. `factor > 1` zooms in.
    pub fn zoom(&mut self, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let current = self.viewport();
        self.viewport = Some(Viewport {
            x: scale_range(&current.x, factor),
            y: scale_range(&current.y, factor),
        });
    }

    /// Shift the window by data units.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let current = self.viewport();
        self.viewport = Some(Viewport {
            x: (current.x.start + dx)..(current.x.end + dx),
            y: (current.y.start + dy)..(current.y.end + dy),
        });
    }

    pub fn reset_zoom(&mut self) {
        self.viewport = None;
    }

    /// Render to the requested format: PNG or SVG bytes, or the series as JSON.
    pub fn render(&self, options: &RenderOptions) -> Result<Vec<u8>> {
        info!(
            "Rendering '{}' as {} ({}x{}, {:?})",
            self.title, self.chart_type, options.width, options.height, options.format
        );
        match options.format {
            OutputFormat::Png => self.render_png(options.width, options.height),
            OutputFormat::Svg => self.render_svg(options.width, options.height),
            OutputFormat::Json => {
                serde_json::to_vec_pretty(&self.series).context("Failed to serialize chart series")
            }
        }
    }

    fn render_png(&self, width: u32, height: u32) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            self.draw(&root)?;
            root.present().context("Failed to present drawing")?;
        }

        let mut png_bytes = Vec::new();
        {
            let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
            encoder
                .write_image(&buffer, width, height, image::ColorType::Rgb8)
                .context("Failed to encode PNG")?;
        }

        Ok(png_bytes)
    }

    fn render_svg(&self, width: u32, height: u32) -> Result<Vec<u8>> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
            self.draw(&root)?;
            root.present().context("Failed to present drawing")?;
        }
        Ok(svg.into_bytes())
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE).context("Failed to fill background")?;

        let view = self.viewport();
        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .caption(&self.title, ("sans-serif", 20))
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(view.x.clone(), view.y.clone())
            .context("Failed to build chart")?;

        let labels = &self.series.labels;
        chart
            .configure_mesh()
            .x_labels(labels.len().clamp(1, 10))
            .x_label_formatter(&|x| {
                let idx = x.floor();
                if idx >= 0.0 && (idx as usize) < labels.len() {
                    labels[idx as usize].clone()
                } else {
                    String::new()
                }
            })
            .x_desc("Category")
            .y_desc("Value")
            .draw()
            .context("Failed to draw mesh")?;

        let num_series = self.series.datasets.len().max(1);
        for (series_idx, dataset) in self.series.datasets.iter().enumerate() {
            let legend_color = to_rgb(dataset.border_color.at(0));
            let finite = move || {
                dataset
                    .data
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_finite())
            };
            let points: Vec<(f64, f64)> = finite().map(|(i, v)| (i as f64 + 0.5, *v)).collect();

            let annotation = match self.chart_type {
                ChartType::Bar | ChartType::Pie | ChartType::PolarArea | ChartType::Radar => {
                    // Side-by-side bars
                    let bar_width = 0.8 / num_series as f64;
                    let x_offset =
                        (series_idx as f64 - (num_series as f64 - 1.0) / 2.0) * bar_width;
                    chart
                        .draw_series(finite().map(|(i, &y)| {
                            let x_center = i as f64 + 0.5 + x_offset;
                            Rectangle::new(
                                [
                                    (x_center - bar_width / 2.0, 0.0),
                                    (x_center + bar_width / 2.0, y),
                                ],
                                to_rgb(dataset.background_color.at(i)).filled(),
                            )
                        }))
                        .context("Failed to draw bars")?
                }
                ChartType::Line => chart
                    .draw_series(LineSeries::new(
                        points,
                        legend_color.stroke_width(dataset.border_width.max(1)),
                    ))
                    .context("Failed to draw line series")?,
                ChartType::Area => chart
                    .draw_series(
                        AreaSeries::new(points, 0.0, legend_color.mix(0.3))
                            .border_style(legend_color),
                    )
                    .context("Failed to draw area series")?,
                ChartType::Scatter | ChartType::Bubble => {
                    let size = if self.chart_type == ChartType::Bubble { 8 } else { 3 };
                    chart
                        .draw_series(finite().map(|(i, &y)| {
                            Circle::new(
                                (i as f64 + 0.5, y),
                                size,
                                to_rgb(dataset.background_color.at(i)).filled(),
                            )
                        }))
                        .context("Failed to draw point series")?
                }
            };

            annotation.label(dataset.label.clone()).legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], legend_color.filled())
            });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .context("Failed to draw legend")?;

        Ok(())
    }
}

/// Owns the chart handles of one view, indexed by series position.
#[derive(Debug, Clone, Default)]
pub struct ChartBoard {
    handles: Vec<ChartHandle>,
}

impl ChartBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle and return its position.
    pub fn push(&mut self, handle: ChartHandle) -> usize {
        self.handles.push(handle);
        self.handles.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&ChartHandle> {
        self.handles.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ChartHandle> {
        self.handles.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handles(&self) -> &[ChartHandle] {
        &self.handles
    }

    /// Reset the zoom of one chart. Returns false for an unknown position.
    pub fn reset(&mut self, index: usize) -> bool {
        match self.handles.get_mut(index) {
            Some(handle) => {
                handle.reset_zoom();
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&mut self) {
        for handle in &mut self.handles {
            handle.reset_zoom();
        }
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }
}

fn scale_range(range: &Range<f64>, factor: f64) -> Range<f64> {
    let center = (range.start + range.end) / 2.0;
    let half = (range.end - range.start) / (2.0 * factor);
    (center - half)..(center + half)
}

fn to_rgb(color: SeriesRgb) -> RGBColor {
    RGBColor(color.r, color.g, color.b)
}
