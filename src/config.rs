//! Analysis Configuration
//! Input paths, regimen selection, column names and chart settings.
//!
//! Every field has a default matching the Pymaceuticals study layout, so a
//! config file only needs to name what differs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Output image format for rendered charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Svg,
}

impl Default for ImageFormat {
    fn default() -> Self {
        ImageFormat::Png
    }
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

/// CSV header names for both input tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub subject_id: String,
    pub regimen: String,
    pub sex: String,
    pub age: String,
    pub weight: String,
    pub timepoint: String,
    pub tumor_volume: String,
    pub metastatic_sites: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            subject_id: "Mouse ID".to_string(),
            regimen: "Drug Regimen".to_string(),
            sex: "Sex".to_string(),
            age: "Age_months".to_string(),
            weight: "Weight (g)".to_string(),
            timepoint: "Timepoint".to_string(),
            tumor_volume: "Tumor Volume (mm3)".to_string(),
            metastatic_sites: "Metastatic Sites".to_string(),
        }
    }
}

/// Subject whose volume-over-time line chart is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    pub regimen: String,
    pub subject_id: String,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            regimen: "Capomulin".to_string(),
            subject_id: "s185".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            format: ImageFormat::Png,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub metadata_path: PathBuf,
    pub results_path: PathBuf,
    pub output_dir: PathBuf,
    /// Regimens screened for outliers and drawn in the box plot, in order.
    pub treatments: Vec<String>,
    /// Regimen used for the weight vs. mean volume correlation.
    pub correlation_regimen: String,
    pub trajectory: TrajectoryConfig,
    pub columns: ColumnNames,
    pub charts: ChartConfig,
    pub open_charts: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            metadata_path: PathBuf::from("mouse_metadata.csv"),
            results_path: PathBuf::from("study_results.csv"),
            output_dir: PathBuf::from("charts"),
            treatments: ["Capomulin", "Ramicane", "Infubinol", "Ceftamin"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            correlation_regimen: "Capomulin".to_string(),
            trajectory: TrajectoryConfig::default(),
            columns: ColumnNames::default(),
            charts: ChartConfig::default(),
            open_charts: false,
        }
    }
}

impl AnalysisConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: AnalysisConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.treatments.is_empty() {
            return Err(ConfigError::Invalid(
                "treatments must name at least one regimen".to_string(),
            ));
        }
        if self.treatments.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "treatment names must not be blank".to_string(),
            ));
        }
        if self.charts.width == 0 || self.charts.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "chart size must be non-zero, got {}x{}",
                self.charts.width, self.charts.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "treatments": ["Placebo"], "charts": { "format": "svg" } }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.treatments, vec!["Placebo".to_string()]);
        assert_eq!(config.charts.format, ImageFormat::Svg);
        assert_eq!(config.charts.width, 800);
        assert_eq!(config.correlation_regimen, "Capomulin");
        assert_eq!(config.trajectory.subject_id, "s185");
        assert_eq!(config.columns.tumor_volume, "Tumor Volume (mm3)");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "correlation_regimen": "Ramicane", "open_charts": true }}"#).unwrap();

        let config = AnalysisConfig::load(file.path()).unwrap();
        assert_eq!(config.correlation_regimen, "Ramicane");
        assert!(config.open_charts);
        assert_eq!(config.treatments.len(), 4);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = AnalysisConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate() {
        assert!(AnalysisConfig::default().validate().is_ok());

        let mut config = AnalysisConfig::default();
        config.treatments.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AnalysisConfig::default();
        config.charts.height = 0;
        assert!(config.validate().is_err());
    }
}
