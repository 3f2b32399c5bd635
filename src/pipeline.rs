//! Analysis pipeline: load, merge, clean, summarize, screen, correlate.
//!
//! Each stage takes the previous stage's output and returns a new value;
//! nothing is shared or mutated between stages.

use crate::config::AnalysisConfig;
use crate::data::{DataLoader, DataProcessor, Deduplicated, MergedRecord, Observation, SubjectRecord};
use crate::error::Result;
use crate::stats::{
    linear_regression, pearson, AnalysisError, GroupStats, OutlierDetector, OutlierReport,
    RegressionResult, StatsCalculator, SubjectAverages, ValueCount,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Volume-over-time points of one subject.
#[derive(Debug, Clone, Serialize)]
pub struct Trajectory {
    pub regimen: String,
    pub subject_id: String,
    /// (timepoint, tumor volume), ascending timepoint.
    pub points: Vec<(i64, f64)>,
}

/// Everything computed by one run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub subjects_loaded: usize,
    pub observations_loaded: usize,
    pub merged_rows: usize,
    pub deduplication: Deduplicated,
    pub summary: BTreeMap<String, GroupStats>,
    pub regimen_counts: Vec<ValueCount>,
    pub sex_counts: Vec<ValueCount>,
    #[serde(skip)]
    pub last_timepoints: Vec<MergedRecord>,
    pub outliers: Vec<OutlierReport>,
    pub trajectory: Trajectory,
    pub averages: SubjectAverages,
    pub regression: RegressionResult,
}

impl AnalysisOutcome {
    /// Cleaned table: merged and deduplicated.
    pub fn records(&self) -> &[MergedRecord] {
        &self.deduplication.records
    }
}

pub struct Pipeline;

impl Pipeline {
    /// Load both input files named by `config` and analyze them.
    pub fn run(config: &AnalysisConfig) -> Result<AnalysisOutcome> {
        config.validate()?;
        let loader = DataLoader::new(config.columns.clone());
        let subjects = loader.load_subjects(&config.metadata_path)?;
        let observations = loader.load_observations(&config.results_path)?;
        Self::analyze(&subjects, &observations, config)
    }

    /// Analyze already loaded tables.
    pub fn analyze(
        subjects: &[SubjectRecord],
        observations: &[Observation],
        config: &AnalysisConfig,
    ) -> Result<AnalysisOutcome> {
        let merged = DataProcessor::merge_outer(subjects, observations);
        let merged_rows = merged.len();
        let deduplication = DataProcessor::drop_duplicate_keys(merged);
        let records = deduplication.records.as_slice();
        info!(
            rows = records.len(),
            dropped = deduplication.dropped,
            "Cleaned merged table"
        );

        let summary = StatsCalculator::summarize_by_regimen(records);
        let regimen_counts =
            StatsCalculator::value_counts(records.iter().map(|r| r.regimen.as_deref()));
        let sex_counts = StatsCalculator::value_counts(records.iter().map(|r| r.sex.as_deref()));

        let last_timepoints = DataProcessor::last_timepoints(records);
        let outliers = OutlierDetector::detect(&last_timepoints, &config.treatments);
        for report in &outliers {
            if report.values.is_empty() {
                warn!(regimen = %report.regimen, "No final volumes for regimen");
            }
        }

        let trajectory = Trajectory {
            regimen: config.trajectory.regimen.clone(),
            subject_id: config.trajectory.subject_id.clone(),
            points: DataProcessor::subject_trajectory(
                records,
                &config.trajectory.regimen,
                &config.trajectory.subject_id,
            ),
        };
        if trajectory.points.is_empty() {
            warn!(
                subject = %trajectory.subject_id,
                regimen = %trajectory.regimen,
                "Trajectory subject has no observations"
            );
        }

        let averages = SubjectAverages::compute(records, &config.correlation_regimen);
        if averages.is_empty() {
            return Err(AnalysisError::EmptyRegimen(config.correlation_regimen.clone()).into());
        }
        let correlation = pearson(&averages.weights, &averages.volumes)?;
        info!(
            regimen = %averages.regimen,
            subjects = averages.len(),
            r = correlation.r,
            p_value = correlation.p_value,
            "Correlated weight with mean tumor volume"
        );
        let regression = linear_regression(&averages.weights, &averages.volumes)?;
        info!(
            slope = regression.slope,
            intercept = regression.intercept,
            "Fitted weight vs. mean tumor volume"
        );

        Ok(AnalysisOutcome {
            subjects_loaded: subjects.len(),
            observations_loaded: observations.len(),
            merged_rows,
            deduplication,
            summary,
            regimen_counts,
            sex_counts,
            last_timepoints,
            outliers,
            trajectory,
            averages,
            regression,
        })
    }
}
