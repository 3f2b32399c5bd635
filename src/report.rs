//! Text and JSON reports of an analysis run.

use crate::error::Result;
use crate::pipeline::AnalysisOutcome;
use crate::stats::{GroupStats, OutlierReport, RegressionResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// JSON document written by `--report`.
#[derive(Serialize)]
pub struct AnalysisReport<'a> {
    #[serde(flatten)]
    pub outcome: &'a AnalysisOutcome,
    pub charts: &'a [PathBuf],
}

pub fn write_json(outcome: &AnalysisOutcome, charts: &[PathBuf], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let report = AnalysisReport { outcome, charts };
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(path, json)?;
    info!(path = %path.display(), "Wrote JSON report");
    Ok(())
}

/// Per-regimen summary statistics as an aligned table.
pub fn summary_table(summary: &BTreeMap<String, GroupStats>) -> String {
    let width = summary
        .keys()
        .map(|k| k.len())
        .max()
        .unwrap_or(0)
        .max("Drug Regimen".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Drug Regimen", "Mean", "Median", "Variance", "Std Dev", "SEM"
    );
    for (regimen, gs) in summary {
        let _ = writeln!(
            out,
            "{:<width$} {:>10.6} {:>10.6} {:>10.6} {:>10.6} {:>10.6}",
            regimen, gs.mean, gs.median, gs.variance, gs.std, gs.sem
        );
    }
    out
}

/// `[100.0, 36.3]`: whole numbers keep their `.0`.
fn format_values(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|v| format!("{v:?}")).collect();
    format!("[{}]", items.join(", "))
}

/// IQR and potential outliers for each screened regimen.
pub fn outlier_text(reports: &[OutlierReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = writeln!(out, "Treatment: {}", report.regimen);
        let _ = writeln!(out, "IQR: {:?}", report.quartiles.iqr);
        let _ = writeln!(
            out,
            "Potential outliers: {}",
            format_values(&report.outlier_values())
        );
    }
    out
}

pub fn correlation_text(regimen: &str, regression: &RegressionResult) -> String {
    format!(
        "The correlation between mouse weight and the average tumor volume ({}) is {}\n\
         Regression line: {} (r-squared {:.4}, p = {:.3e})\n",
        regimen,
        regression.correlation.rounded(),
        regression.equation(),
        regression.r_squared,
        regression.correlation.p_value,
    )
}

/// Full stdout report.
pub fn render_text(outcome: &AnalysisOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Subjects: {}  Observations: {}  Merged rows: {}  Duplicates dropped: {}",
        outcome.subjects_loaded,
        outcome.observations_loaded,
        outcome.merged_rows,
        outcome.deduplication.dropped,
    );
    if !outcome.deduplication.duplicate_subjects.is_empty() {
        let _ = writeln!(
            out,
            "Subjects with duplicate timepoints: {}",
            outcome.deduplication.duplicate_subjects.join(", ")
        );
    }
    out.push('\n');
    out.push_str(&summary_table(&outcome.summary));
    out.push('\n');
    out.push_str(&outlier_text(&outcome.outliers));
    out.push('\n');
    out.push_str(&correlation_text(&outcome.averages.regimen, &outcome.regression));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{Outlier, QuartileSummary};

    #[test]
    fn test_outlier_text() {
        let reports = vec![
            OutlierReport {
                regimen: "Infubinol".to_string(),
                values: vec![1.0, 2.0, 3.0, 4.0, 5.0, 100.0],
                quartiles: QuartileSummary::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]),
                outliers: vec![Outlier {
                    subject_id: "c326".to_string(),
                    value: 100.0,
                }],
            },
            OutlierReport {
                regimen: "Ramicane".to_string(),
                values: vec![30.5, 31.0],
                quartiles: QuartileSummary::from_values(&[30.5, 31.0]),
                outliers: vec![],
            },
        ];

        let text = outlier_text(&reports);
        assert_eq!(
            text,
            "Treatment: Infubinol\nIQR: 2.5\nPotential outliers: [100.0]\n\
             Treatment: Ramicane\nIQR: 0.25\nPotential outliers: []\n"
        );
    }

    #[test]
    fn test_summary_table_has_row_per_regimen() {
        let mut summary = BTreeMap::new();
        summary.insert(
            "Capomulin".to_string(),
            GroupStats {
                group_name: "Capomulin".to_string(),
                count: 3,
                mean: 20.0,
                median: 20.0,
                variance: 100.0,
                std: 10.0,
                sem: 5.773503,
            },
        );

        let table = summary_table(&summary);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Drug Regimen"));
        assert!(lines[1].starts_with("Capomulin"));
        assert!(lines[1].contains("100.000000"));
    }
}
