//! Output of forecast results: a delimited table and a multi-panel chart.

mod chart;
mod table;

pub use chart::{build_panels, grid_shape, render_chart, ChartConfig, Panel};
pub use table::{write_forecast_csv, write_forecast_table_csv};
