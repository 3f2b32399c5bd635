//! Regimen Analysis - Tumor study CSV analysis
//!
//! Merges subject metadata with per-timepoint study results, summarizes tumor
//! volume per drug regimen, screens final volumes for IQR outliers, relates
//! subject weight to mean tumor volume and renders static charts.

pub mod charts;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use pipeline::{AnalysisOutcome, Pipeline};
