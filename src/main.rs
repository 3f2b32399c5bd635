//! Regimen Analysis - command line entry point.

use anyhow::Context;
use clap::Parser;
use regimen_analysis::charts::{open_in_viewer, StaticChartRenderer};
use regimen_analysis::config::{AnalysisConfig, ImageFormat};
use regimen_analysis::{logging, report, Pipeline};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "regimen-analysis")]
#[command(about = "Tumor study analysis: regimen statistics, outliers, weight correlation and charts")]
#[command(version)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Subject metadata CSV
    #[arg(long)]
    metadata: Option<PathBuf>,
    /// Study results CSV
    #[arg(long)]
    results: Option<PathBuf>,
    /// Directory for rendered charts
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Chart image format
    #[arg(long, value_enum)]
    format: Option<ImageFormat>,
    /// Write a JSON report of all computed results
    #[arg(long)]
    report: Option<PathBuf>,
    /// Open rendered charts with the system viewer
    #[arg(long)]
    open: bool,
    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(AnalysisConfig, Option<PathBuf>, bool)> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AnalysisConfig::default(),
        };

        if let Some(path) = self.metadata {
            config.metadata_path = path;
        }
        if let Some(path) = self.results {
            config.results_path = path;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(format) = self.format {
            config.charts.format = format;
        }
        if self.open {
            config.open_charts = true;
        }

        config.validate()?;
        Ok((config, self.report, self.no_charts))
    }
}

fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let (config, report_path, no_charts) = Cli::parse().into_config()?;
    info!(
        metadata = %config.metadata_path.display(),
        results = %config.results_path.display(),
        "Starting analysis"
    );

    let outcome = Pipeline::run(&config).context("analysis failed")?;
    print!("{}", report::render_text(&outcome));

    let charts = if no_charts {
        Vec::new()
    } else {
        StaticChartRenderer::new(&config.charts)
            .render_charts(&outcome, &config.output_dir)
            .context("rendering charts")?
    };

    if config.open_charts {
        open_in_viewer(&charts);
    }

    if let Some(path) = report_path {
        report::write_json(&outcome, &charts, &path)
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    Ok(())
}
