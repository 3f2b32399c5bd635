//! Stats module - Summaries, outlier screening and regression

mod calculator;
mod outliers;
mod regression;

pub use calculator::{GroupStats, StatsCalculator, ValueCount};
pub use outliers::{Outlier, OutlierDetector, OutlierReport, QuartileSummary};
pub use regression::{
    linear_regression, pearson, Correlation, RegressionResult, SubjectAverages,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Need at least {needed} data points, got {got}")]
    InsufficientData { needed: usize, got: usize },
    #[error("Series lengths differ: x has {x} values, y has {y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("Input contains NaN or infinite values")]
    NonFinite,
    #[error("Predictor has zero variance; regression line is undefined")]
    ZeroVariance,
    #[error("No subjects with both weight and tumor volume for regimen '{0}'")]
    EmptyRegimen(String),
}
