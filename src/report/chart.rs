//! Multi-panel history and forecast chart rendered with plotters.

use std::ops::Range;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use tracing::{debug, info};

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};

const PINK: RGBColor = RGBColor(255, 192, 203);
const HISTORY_BLUE: RGBColor = RGBColor(31, 119, 180);

/// Text used to check that a font loads; column titles and legends are Chinese.
const FONT_SAMPLE_TEXT: &str = "历史数据预测值";

/// CJK-capable families tried in order when none are configured explicitly.
const DEFAULT_FONT_FAMILIES: [&str; 6] = [
    "SimHei",
    "Noto Sans CJK SC",
    "Source Han Sans SC",
    "WenQuanYi Micro Hei",
    "Microsoft YaHei",
    "PingFang SC",
];

/// Chart layout and styling.
///
/// Sizes are in inches and points and converted to pixels with `dpi`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    /// Font families tried in order; the first one that loads is used.
    pub font_families: Vec<String>,
    /// Base font size in points; titles are 20% larger.
    pub font_size_pt: f64,
    pub line_width_pt: f64,
    pub marker_size_pt: f64,
    /// Opacity of the interval band.
    pub band_alpha: f64,
    pub history_label: String,
    pub forecast_label: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width_in: 14.0,
            height_in: 10.0,
            dpi: 300,
            font_families: DEFAULT_FONT_FAMILIES.iter().map(|f| f.to_string()).collect(),
            font_size_pt: 10.0,
            line_width_pt: 1.5,
            marker_size_pt: 6.0,
            band_alpha: 0.2,
            history_label: "历史数据".to_string(),
            forecast_label: "预测值".to_string(),
        }
    }
}

impl ChartConfig {
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_size_inches(mut self, width: f64, height: f64) -> Self {
        self.width_in = width;
        self.height_in = height;
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_families = vec![family.into()];
        self
    }

    pub fn with_font_families<S: Into<String>>(
        mut self,
        families: impl IntoIterator<Item = S>,
    ) -> Self {
        self.font_families = families.into_iter().map(Into::into).collect();
        self
    }

    /// The first configured family that can be loaded.
    ///
    /// Fails with [`ForecastError::Plot`] when none can, instead of drawing
    /// placeholder glyphs.
    pub fn resolve_font(&self) -> Result<&str> {
        for family in &self.font_families {
            let font = FontDesc::new(FontFamily::from(family.as_str()), 12.0, FontStyle::Normal);
            match font.box_size(FONT_SAMPLE_TEXT) {
                Ok(_) => return Ok(family.as_str()),
                Err(e) => debug!(font = %family, error = %e, "font unavailable"),
            }
        }
        Err(ForecastError::Plot(format!(
            "none of the fonts [{}] could be loaded; install a CJK font or pass --font",
            self.font_families.join(", ")
        )))
    }

    /// Image size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi as f64).round() as u32,
            (self.height_in * self.dpi as f64).round() as u32,
        )
    }

    fn px(&self, points: f64) -> u32 {
        ((points * self.dpi as f64 / 72.0).round() as u32).max(1)
    }
}

/// One chart panel: a column's history and, if available, its forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    /// `(year, value)` observations.
    pub history: Vec<(i32, f64)>,
    /// `(year, value)` forecasts; empty when the column was not forecast.
    pub forecast: Vec<(i32, f64)>,
    /// `(year, lower, upper)` interval band.
    pub band: Option<Vec<(i32, f64, f64)>>,
}

impl Panel {
    /// Year span covering history and forecast, padded by half a year.
    pub fn x_range(&self) -> Range<f64> {
        let years = self
            .history
            .iter()
            .chain(&self.forecast)
            .map(|(year, _)| *year);
        let lo = years.clone().min().unwrap_or(0);
        let hi = years.max().unwrap_or(lo);
        (lo as f64 - 0.5)..(hi as f64 + 0.5)
    }

    /// Value span covering every drawn point, padded by 5%.
    pub fn y_range(&self) -> Range<f64> {
        let mut values: Vec<f64> = self
            .history
            .iter()
            .chain(&self.forecast)
            .map(|(_, v)| *v)
            .collect();
        if let Some(band) = &self.band {
            values.extend(band.iter().flat_map(|(_, lo, hi)| [*lo, *hi]));
        }
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !lo.is_finite() || !hi.is_finite() {
            return 0.0..1.0;
        }
        let pad = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.05 };
        (lo - pad)..(hi + pad)
    }
}

/// `(rows, columns)` of the panel grid: two columns, growing by rows.
pub fn grid_shape(panels: usize) -> (usize, usize) {
    match panels {
        0 => (0, 0),
        1 => (1, 1),
        n => ((n + 1) / 2, 2),
    }
}

fn year_points(index: &[chrono::NaiveDate], values: &[f64]) -> Vec<(i32, f64)> {
    use chrono::Datelike;
    index.iter().map(|d| d.year()).zip(values.iter().copied()).collect()
}

/// One panel per column of `table`, in table order.
///
/// The `target` column gets `target_forecast` and its interval band; columns
/// present in `exog_forecasts` get their forecasts; other columns show
/// history only.
pub fn build_panels(
    table: &TimeSeries,
    target: &str,
    exog_forecasts: &TimeSeries,
    target_forecast: &Forecast,
) -> Result<Vec<Panel>> {
    let years = table.years();
    let target_index = target_forecast.index().ok_or_else(|| {
        ForecastError::InvalidParameter("target forecast has no timestamp index".to_string())
    })?;

    table
        .labels()
        .iter()
        .map(|label| {
            let history: Vec<(i32, f64)> = years
                .iter()
                .copied()
                .zip(table.column(label)?.iter().copied())
                .collect();

            let (forecast, band) = if label == target {
                let band = match (target_forecast.lower(), target_forecast.upper()) {
                    (Some(lower), Some(upper)) => Some(
                        year_points(target_index, lower)
                            .into_iter()
                            .zip(upper)
                            .map(|((year, lo), hi)| (year, lo, *hi))
                            .collect(),
                    ),
                    _ => None,
                };
                (year_points(target_index, target_forecast.primary()), band)
            } else if exog_forecasts.label_position(label).is_some() {
                (
                    year_points(exog_forecasts.timestamps(), exog_forecasts.column(label)?),
                    None,
                )
            } else {
                (Vec::new(), None)
            };

            Ok(Panel {
                title: label.clone(),
                history,
                forecast,
                band,
            })
        })
        .collect()
}

fn plot_err<E: std::fmt::Display>(e: E) -> ForecastError {
    ForecastError::Plot(e.to_string())
}

/// Render `panels` into a PNG at `path`.
pub fn render_chart<P: AsRef<Path>>(path: P, panels: &[Panel], config: &ChartConfig) -> Result<()> {
    let path = path.as_ref();
    if panels.is_empty() {
        return Err(ForecastError::Plot("no panels to draw".to_string()));
    }

    let font = config.resolve_font()?;

    let root = BitMapBackend::new(path, config.pixel_size()).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let areas = root.split_evenly(grid_shape(panels.len()));
    for (panel, area) in panels.iter().zip(areas.iter()) {
        draw_panel(area, panel, config, font)?;
    }

    root.present().map_err(plot_err)?;
    info!(path = %path.display(), panels = panels.len(), font, "rendered chart");
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    config: &ChartConfig,
    font: &str,
) -> Result<()> {
    let label_px = config.px(config.font_size_pt);
    let title_px = config.px(config.font_size_pt * 1.2);
    let line_px = config.px(config.line_width_pt);
    let marker_px = config.px(config.marker_size_pt / 2.0) as i32;

    let x_range = panel.x_range();
    let n_years = (x_range.end - x_range.start).round() as usize;

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (font, title_px))
        .margin(config.px(8.0))
        .x_label_area_size(label_px * 3)
        .y_label_area_size(label_px * 6)
        .build_cartesian_2d(x_range, panel.y_range())
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_labels(n_years.max(2))
        .x_label_formatter(&|x| format!("{:.0}", x))
        .y_label_formatter(&|y| format!("{:.0}", y))
        .label_style((font, label_px))
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(TRANSPARENT)
        .draw()
        .map_err(plot_err)?;

    if let Some(band) = &panel.band {
        let mut outline: Vec<(f64, f64)> = band.iter().map(|(y, lo, _)| (*y as f64, *lo)).collect();
        outline.extend(band.iter().rev().map(|(y, _, hi)| (*y as f64, *hi)));
        chart
            .draw_series(std::iter::once(Polygon::new(
                outline,
                PINK.mix(config.band_alpha).filled(),
            )))
            .map_err(plot_err)?;
    }

    let history_style = HISTORY_BLUE.stroke_width(line_px);
    chart
        .draw_series(
            LineSeries::new(
                panel.history.iter().map(|(y, v)| (*y as f64, *v)),
                history_style,
            )
            .point_size(marker_px as u32),
        )
        .map_err(plot_err)?
        .label(config.history_label.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], history_style));

    if !panel.forecast.is_empty() {
        let forecast_style = RED.stroke_width(line_px);
        let points: Vec<(f64, f64)> = panel
            .forecast
            .iter()
            .map(|(y, v)| (*y as f64, *v))
            .collect();
        chart
            .draw_series(DashedLineSeries::new(
                points.clone(),
                (line_px * 4) as i32,
                (line_px * 2) as i32,
                forecast_style,
            ))
            .map_err(plot_err)?
            .label(config.forecast_label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], forecast_style));
        chart
            .draw_series(points.into_iter().map(|point| {
                EmptyElement::at(point)
                    + Rectangle::new(
                        [(-marker_px, -marker_px), (marker_px, marker_px)],
                        RED.filled(),
                    )
            }))
            .map_err(plot_err)?;
    }

    chart
        .configure_series_labels()
        .label_font((font, label_px))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()
        .map_err(plot_err)?;

    Ok(())
}
