//! Command-line entry point for the enrollment forecast.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use enrollment_forecast::config::PipelineConfig;
use enrollment_forecast::io::LoadOptions;
use enrollment_forecast::models::arima::{AutoARIMAConfig, InformationCriterion};
use enrollment_forecast::pipeline::Pipeline;
use enrollment_forecast::report::ChartConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Criterion {
    Aic,
    Aicc,
    Bic,
}

impl From<Criterion> for InformationCriterion {
    fn from(c: Criterion) -> Self {
        match c {
            Criterion::Aic => InformationCriterion::Aic,
            Criterion::Aicc => InformationCriterion::Aicc,
            Criterion::Bic => InformationCriterion::Bic,
        }
    }
}

#[derive(Parser)]
#[command(name = "enrollment-forecast")]
#[command(about = "Forecast enrollment from annual covariates with ARIMA models", long_about = None)]
struct Cli {
    /// Input table (.xlsx, .xls, .ods or .csv)
    input: PathBuf,

    /// Worksheet to read
    #[arg(long, default_value = "Sheet1")]
    sheet: String,

    /// Header of the year column
    #[arg(long, default_value = "年份")]
    year_column: String,

    /// Column to forecast
    #[arg(long, default_value = "高等教育阶段在校生数")]
    target: String,

    /// Covariate column (repeat for several)
    #[arg(
        long = "exog",
        default_values_t = [
            "高等教育阶段学校数".to_string(),
            "高等教育阶段教师数".to_string(),
            "高等教育阶段招生人数".to_string(),
        ]
    )]
    exog: Vec<String>,

    /// Number of years to forecast
    #[arg(long, default_value_t = 5)]
    horizon: usize,

    /// Coverage of the prediction interval
    #[arg(long, default_value_t = 0.95)]
    level: f64,

    /// Criterion for order selection
    #[arg(long, value_enum, default_value = "aic")]
    criterion: Criterion,

    #[arg(long, default_value_t = 5)]
    max_p: usize,

    #[arg(long, default_value_t = 2)]
    max_d: usize,

    #[arg(long, default_value_t = 5)]
    max_q: usize,

    /// Search every order instead of stepping from a start model
    #[arg(long)]
    exhaustive: bool,

    /// Forecast table output
    #[arg(long, default_value = "forecast_results2.csv")]
    csv_output: PathBuf,

    /// Chart output
    #[arg(long, default_value = "all_columns_forecast2.png")]
    chart_output: PathBuf,

    /// Chart resolution
    #[arg(long, default_value_t = 300)]
    dpi: u32,

    /// Chart font family, tried in the order given (default: common CJK fonts)
    #[arg(long = "font")]
    fonts: Vec<String>,

    /// Add lower/upper interval columns to the table
    #[arg(long)]
    with_intervals: bool,

    /// Skip the chart
    #[arg(long)]
    no_chart: bool,

    /// Log candidate models and fit details
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> PipelineConfig {
        let mut search = AutoARIMAConfig::default()
            .with_max_orders(self.max_p, self.max_d, self.max_q)
            .with_criterion(self.criterion.into());
        if self.exhaustive {
            search = search.exhaustive();
        }
        let mut chart = ChartConfig::default().with_dpi(self.dpi);
        if !self.fonts.is_empty() {
            chart = chart.with_font_families(self.fonts);
        }

        PipelineConfig::new(self.input)
            .with_load_options(
                LoadOptions::default()
                    .with_sheet(self.sheet)
                    .with_year_column(self.year_column),
            )
            .with_target(self.target)
            .with_exog(self.exog)
            .with_horizon(self.horizon)
            .with_level(self.level)
            .with_search(search)
            .with_csv_output(self.csv_output)
            .with_intervals(self.with_intervals)
            .with_chart_output((!self.no_chart).then_some(self.chart_output))
            .with_chart(chart)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .init();

    let pipeline = Pipeline::new(cli.into_config());
    match pipeline.run() {
        Ok(_) => {
            let config = pipeline.config();
            match &config.chart_output {
                Some(chart) => println!(
                    "代码运行成功，预测结果已保存为 {}，趋势图已保存为 {}。",
                    config.csv_output.display(),
                    chart.display()
                ),
                None => println!(
                    "代码运行成功，预测结果已保存为 {}。",
                    config.csv_output.display()
                ),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("发生错误：{}", e);
            ExitCode::FAILURE
        }
    }
}
