//! Static Chart Renderer
//! Draws the analysis charts with plotters and writes them to disk.
//!
//! Charts:
//! 1. Timepoints per regimen (bar)
//! 2. Sex distribution (pie with percentages)
//! 3. Final tumor volume by regimen (box plot, 1.5·IQR whiskers, fliers)
//! 4. Volume over time for one subject (line with markers)
//! 5. Mean weight vs. mean volume (scatter), and the same with the OLS line

use crate::charts::plotter::{
    padded_range, palette_color, BoxGeometry, FIT_COLOR, PRIMARY_COLOR,
};
use crate::config::{ChartConfig, ImageFormat};
use crate::pipeline::{AnalysisOutcome, Trajectory};
use crate::stats::{OutlierReport, RegressionResult, SubjectAverages, ValueCount};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const BOX_HALF_WIDTH: f64 = 0.25;
const CAP_HALF_WIDTH: f64 = 0.12;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to draw chart: {0}")]
    Draw(String),
}

fn draw_err<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> RenderError {
    RenderError::Draw(err.to_string())
}

/// One chart and the data it is drawn from.
pub enum Chart<'a> {
    RegimenCounts(&'a [ValueCount]),
    SexDistribution(&'a [ValueCount]),
    FinalVolumes(&'a [OutlierReport]),
    Trajectory(&'a Trajectory),
    WeightScatter(&'a SubjectAverages),
    WeightFit {
        averages: &'a SubjectAverages,
        regression: &'a RegressionResult,
    },
}

impl Chart<'_> {
    pub fn file_stem(&self) -> String {
        match self {
            Chart::RegimenCounts(_) => "timepoints_per_regimen".to_string(),
            Chart::SexDistribution(_) => "sex_distribution".to_string(),
            Chart::FinalVolumes(_) => "final_volume_by_regimen".to_string(),
            Chart::Trajectory(_) => "subject_trajectory".to_string(),
            Chart::WeightScatter(_) => "weight_vs_volume".to_string(),
            Chart::WeightFit { .. } => "weight_vs_volume_fit".to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Chart::RegimenCounts(counts) | Chart::SexDistribution(counts) => counts.is_empty(),
            Chart::FinalVolumes(reports) => reports.iter().all(|r| r.values.is_empty()),
            Chart::Trajectory(t) => t.points.is_empty(),
            Chart::WeightScatter(averages) | Chart::WeightFit { averages, .. } => {
                averages.is_empty()
            }
        }
    }

    pub fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), RenderError> {
        root.fill(&WHITE).map_err(draw_err)?;
        match self {
            Chart::RegimenCounts(counts) => draw_counts_bar(root, counts),
            Chart::SexDistribution(counts) => draw_pie(root, counts),
            Chart::FinalVolumes(reports) => draw_box_plot(root, reports),
            Chart::Trajectory(trajectory) => draw_trajectory(root, trajectory),
            Chart::WeightScatter(averages) => draw_weight_scatter(root, averages, None),
            Chart::WeightFit {
                averages,
                regression,
            } => draw_weight_scatter(root, averages, Some(*regression)),
        }
    }
}

fn draw_counts_bar<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    counts: &[ValueCount],
) -> Result<(), RenderError> {
    let labels: Vec<&str> = counts.iter().map(|c| c.label.as_str()).collect();
    let max = counts.iter().map(|c| c.count).max().unwrap_or(0);
    let y_max = max + max / 10 + 1;

    let mut chart = ChartBuilder::on(root)
        .caption("Number of Timepoints per Drug Regimen", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(100)
        .y_label_area_size(60)
        .build_cartesian_2d((0..counts.len()).into_segmented(), 0..y_max)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Drug Regimen")
        .y_desc("Number of Timepoints")
        .x_labels(counts.len())
        .x_label_formatter(&|v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                labels.get(*i).map(|s| s.to_string()).unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        })
        .x_label_style(("sans-serif", 13).into_font().transform(FontTransform::Rotate90))
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(PRIMARY_COLOR.filled())
                .margin(8)
                .data(counts.iter().enumerate().map(|(i, c)| (i, c.count))),
        )
        .map_err(draw_err)?;

    Ok(())
}

fn draw_pie<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    counts: &[ValueCount],
) -> Result<(), RenderError> {
    let area = root
        .titled("Sex Distribution", ("sans-serif", 24))
        .map_err(draw_err)?;

    let (width, height) = area.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.38;

    let sizes: Vec<f64> = counts.iter().map(|c| c.count as f64).collect();
    let colors: Vec<RGBColor> = (0..counts.len()).map(palette_color).collect();
    let labels: Vec<&str> = counts.iter().map(|c| c.label.as_str()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(90.0);
    pie.label_style(("sans-serif", 18).into_font().color(&BLACK));
    pie.percentages(("sans-serif", 16).into_font().color(&WHITE));
    area.draw(&pie).map_err(draw_err)?;

    Ok(())
}

fn draw_box_plot<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    reports: &[OutlierReport],
) -> Result<(), RenderError> {
    let names: Vec<&str> = reports.iter().map(|r| r.regimen.as_str()).collect();
    let n = reports.len().max(1);
    let (y_min, y_max) = padded_range(
        reports.iter().flat_map(|r| r.values.iter().copied()),
        0.1,
    );

    let mut chart = ChartBuilder::on(root)
        .caption("Final Tumor Volume by Treatment", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..n as f64 - 0.5, y_min..y_max)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Drug Regimen")
        .y_desc("Tumor Volume (mm3)")
        .x_labels(n)
        .x_label_formatter(&|x: &f64| {
            let idx = x.round();
            // labels only on box centers
            if idx < 0.0 || (x - idx).abs() > 1e-6 {
                return String::new();
            }
            names.get(idx as usize).map(|s| s.to_string()).unwrap_or_default()
        })
        .draw()
        .map_err(draw_err)?;

    for (i, report) in reports.iter().enumerate() {
        let Some(g) = BoxGeometry::from_values(&report.values) else {
            continue;
        };
        let x = i as f64;
        let color = palette_color(i);
        let (left, right) = (x - BOX_HALF_WIDTH, x + BOX_HALF_WIDTH);

        chart
            .draw_series([
                Rectangle::new([(left, g.q1), (right, g.q3)], color.mix(0.3).filled()),
                Rectangle::new([(left, g.q1), (right, g.q3)], color.stroke_width(2)),
            ])
            .map_err(draw_err)?;

        chart
            .draw_series([
                PathElement::new(vec![(left, g.median), (right, g.median)], BLACK.stroke_width(2)),
                PathElement::new(vec![(x, g.q1), (x, g.whisker_low)], BLACK.stroke_width(1)),
                PathElement::new(vec![(x, g.q3), (x, g.whisker_high)], BLACK.stroke_width(1)),
                PathElement::new(
                    vec![(x - CAP_HALF_WIDTH, g.whisker_low), (x + CAP_HALF_WIDTH, g.whisker_low)],
                    BLACK.stroke_width(1),
                ),
                PathElement::new(
                    vec![(x - CAP_HALF_WIDTH, g.whisker_high), (x + CAP_HALF_WIDTH, g.whisker_high)],
                    BLACK.stroke_width(1),
                ),
            ])
            .map_err(draw_err)?;

        chart
            .draw_series(
                g.fliers
                    .iter()
                    .map(|&v| Circle::new((x, v), 4, FIT_COLOR.stroke_width(1))),
            )
            .map_err(draw_err)?;
    }

    Ok(())
}

fn draw_trajectory<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    trajectory: &Trajectory,
) -> Result<(), RenderError> {
    let points: Vec<(f64, f64)> = trajectory
        .points
        .iter()
        .map(|&(t, v)| (t as f64, v))
        .collect();
    let (x_min, x_max) = padded_range(points.iter().map(|p| p.0), 0.05);
    let (y_min, y_max) = padded_range(points.iter().map(|p| p.1), 0.1);

    let caption = format!(
        "Tumor Volume vs. Timepoint for {} ({})",
        trajectory.subject_id, trajectory.regimen
    );
    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_desc("Timepoint")
        .y_desc("Tumor Volume (mm3)")
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(LineSeries::new(
            points.iter().copied(),
            PRIMARY_COLOR.stroke_width(2),
        ))
        .map_err(draw_err)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|&p| Circle::new(p, 4, PRIMARY_COLOR.filled())),
        )
        .map_err(draw_err)?;

    Ok(())
}

fn draw_weight_scatter<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    averages: &SubjectAverages,
    regression: Option<&RegressionResult>,
) -> Result<(), RenderError> {
    let (x_min, x_max) = padded_range(averages.weights.iter().copied(), 0.08);
    let (y_min, y_max) = padded_range(averages.volumes.iter().copied(), 0.1);

    let caption = format!(
        "Mouse Weight vs. Average Tumor Volume ({})",
        averages.regimen
    );
    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_desc("Weight (g)")
        .y_desc("Average Tumor Volume (mm3)")
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(
            averages
                .weights
                .iter()
                .zip(&averages.volumes)
                .map(|(&w, &v)| Circle::new((w, v), 5, PRIMARY_COLOR.filled())),
        )
        .map_err(draw_err)?;

    let Some(regression) = regression else {
        return Ok(());
    };

    let (w_min, w_max) = averages
        .weights
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &w| (lo.min(w), hi.max(w)));
    let line = [(w_min, regression.predict(w_min)), (w_max, regression.predict(w_max))];

    chart
        .draw_series(LineSeries::new(line, FIT_COLOR.stroke_width(2)))
        .map_err(draw_err)?;

    let anchor_x = x_min + (x_max - x_min) * 0.03;
    let anchor_y = y_max - (y_max - y_min) * 0.04;
    let step = (y_max - y_min) * 0.06;
    let style = ("sans-serif", 18).into_font().color(&FIT_COLOR);
    chart
        .draw_series([
            Text::new(
                format!("Correlation: {}", regression.correlation.rounded()),
                (anchor_x, anchor_y),
                style.clone(),
            ),
            Text::new(regression.equation(), (anchor_x, anchor_y - step), style),
        ])
        .map_err(draw_err)?;

    Ok(())
}

/// Renders charts to PNG or SVG files.
pub struct StaticChartRenderer {
    width: u32,
    height: u32,
    format: ImageFormat,
}

impl StaticChartRenderer {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            format: config.format,
        }
    }

    /// Every chart for one analysis, in display order.
    pub fn charts_for(outcome: &AnalysisOutcome) -> Vec<Chart<'_>> {
        vec![
            Chart::RegimenCounts(&outcome.regimen_counts),
            Chart::SexDistribution(&outcome.sex_counts),
            Chart::FinalVolumes(&outcome.outliers),
            Chart::Trajectory(&outcome.trajectory),
            Chart::WeightScatter(&outcome.averages),
            Chart::WeightFit {
                averages: &outcome.averages,
                regression: &outcome.regression,
            },
        ]
    }

    /// Draw one chart into `dir`, returning the written path.
    pub fn render_chart(&self, chart: &Chart<'_>, dir: &Path) -> Result<PathBuf, RenderError> {
        let path = dir.join(format!("{}.{}", chart.file_stem(), self.format.extension()));
        let size = (self.width, self.height);

        match self.format {
            ImageFormat::Png => {
                let root = BitMapBackend::new(&path, size).into_drawing_area();
                chart.draw(&root)?;
                root.present().map_err(draw_err)?;
            }
            ImageFormat::Svg => {
                let root = SVGBackend::new(&path, size).into_drawing_area();
                chart.draw(&root)?;
                root.present().map_err(draw_err)?;
            }
        }

        info!(path = %path.display(), "Rendered chart");
        Ok(path)
    }

    /// Draw all charts of `outcome`. Charts with no data are skipped.
    pub fn render_charts(
        &self,
        outcome: &AnalysisOutcome,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, RenderError> {
        fs::create_dir_all(dir).map_err(|source| RenderError::OutputDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::new();
        for chart in Self::charts_for(outcome) {
            if chart.is_empty() {
                warn!(chart = %chart.file_stem(), "No data to plot, skipping chart");
                continue;
            }
            paths.push(self.render_chart(&chart, dir)?);
        }
        Ok(paths)
    }
}

/// Open rendered charts with the system default viewer.
pub fn open_in_viewer(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = open::that(path) {
            warn!(path = %path.display(), error = %e, "Failed to open chart");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::data::{Observation, SubjectRecord};
    use crate::pipeline::Pipeline;
    use tempfile::TempDir;

    const STEMS: [&str; 6] = [
        "timepoints_per_regimen",
        "sex_distribution",
        "final_volume_by_regimen",
        "subject_trajectory",
        "weight_vs_volume",
        "weight_vs_volume_fit",
    ];

    fn subject(id: &str, regimen: &str, weight: f64) -> SubjectRecord {
        SubjectRecord {
            subject_id: id.to_string(),
            regimen: Some(regimen.to_string()),
            sex: Some("Female".to_string()),
            age_months: Some(12),
            weight_g: Some(weight),
        }
    }

    fn observation(id: &str, timepoint: i64, volume: f64) -> Observation {
        Observation {
            subject_id: id.to_string(),
            timepoint,
            regimen: None,
            tumor_volume: Some(volume),
            metastatic_sites: Some(0),
        }
    }

    // single sex, so the pie has one slice
    fn outcome() -> AnalysisOutcome {
        let subjects = vec![
            subject("s185", "Capomulin", 17.0),
            subject("x401", "Capomulin", 15.0),
            subject("m601", "Capomulin", 19.0),
            subject("k403", "Ramicane", 16.0),
            subject("g791", "Ramicane", 16.0),
        ];
        let observations = vec![
            observation("s185", 0, 45.0),
            observation("s185", 5, 43.0),
            observation("s185", 10, 38.0),
            observation("x401", 0, 45.0),
            observation("x401", 5, 41.0),
            observation("m601", 0, 45.0),
            observation("m601", 5, 44.0),
            observation("k403", 0, 45.0),
            observation("k403", 5, 40.0),
            observation("g791", 0, 45.0),
            observation("g791", 5, 42.0),
        ];
        Pipeline::analyze(&subjects, &observations, &AnalysisConfig::default()).unwrap()
    }

    fn render(format: ImageFormat) -> (TempDir, Vec<PathBuf>) {
        let dir = TempDir::new().unwrap();
        let config = ChartConfig {
            format,
            ..ChartConfig::default()
        };
        let paths = StaticChartRenderer::new(&config)
            .render_charts(&outcome(), &dir.path().join("charts"))
            .unwrap();
        (dir, paths)
    }

    fn assert_all_written(paths: &[PathBuf], extension: &str) {
        assert_eq!(paths.len(), STEMS.len());
        for (path, stem) in paths.iter().zip(STEMS) {
            assert_eq!(path.file_stem().and_then(|s| s.to_str()), Some(stem));
            assert_eq!(path.extension().and_then(|s| s.to_str()), Some(extension));
            assert!(fs::metadata(path).unwrap().len() > 0, "{} is empty", path.display());
        }
    }

    #[test]
    fn test_render_charts_png() {
        let (_dir, paths) = render(ImageFormat::Png);
        assert_all_written(&paths, "png");
    }

    #[test]
    fn test_render_charts_svg() {
        let (_dir, paths) = render(ImageFormat::Svg);
        assert_all_written(&paths, "svg");

        let pie = fs::read_to_string(&paths[1]).unwrap();
        assert!(pie.contains("<svg"));
        assert!(pie.contains("Female"));
    }

    #[test]
    fn test_empty_chart_is_skipped() {
        let mut outcome = outcome();
        outcome.trajectory.points.clear();

        let dir = TempDir::new().unwrap();
        let paths = StaticChartRenderer::new(&ChartConfig::default())
            .render_charts(&outcome, dir.path())
            .unwrap();
        assert_eq!(paths.len(), STEMS.len() - 1);
        assert!(!dir.path().join("subject_trajectory.png").exists());
    }
}
