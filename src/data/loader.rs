//! CSV Data Loader Module
//! Reads the subject metadata and study results tables using Polars and
//! extracts them into typed records.

use crate::config::ColumnNames;
use crate::data::{Observation, SubjectRecord};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to parse CSV '{path}': {source}")]
    Parse { path: PathBuf, source: PolarsError },
    #[error("Column '{column}' missing from '{path}'")]
    MissingColumn { path: PathBuf, column: String },
    #[error("Row {row} of '{path}' has no value for '{column}'")]
    MissingValue {
        path: PathBuf,
        row: usize,
        column: String,
    },
}

/// Handles CSV file loading with Polars.
pub struct DataLoader {
    columns: ColumnNames,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(ColumnNames::default())
    }
}

impl DataLoader {
    pub fn new(columns: ColumnNames) -> Self {
        Self { columns }
    }

    /// Load a CSV file into a DataFrame.
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .finish()
            .and_then(|lazy| lazy.collect())
            .map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), rows = df.height(), "CSV loaded");
        Ok(df)
    }

    /// Load the subject metadata table: one row per subject.
    pub fn load_subjects(&self, path: &Path) -> Result<Vec<SubjectRecord>, LoadError> {
        let df = self.load_csv(path)?;
        let table = Table { df: &df, path };
        let c = &self.columns;

        let ids = table.required_strings(&c.subject_id)?;
        let regimens = table.optional_strings(&c.regimen)?;
        let sexes = table.strings(&c.sex)?;
        let ages = table.ints(&c.age)?;
        let weights = table.floats(&c.weight)?;

        let subjects: Vec<SubjectRecord> = ids
            .into_iter()
            .enumerate()
            .map(|(i, subject_id)| SubjectRecord {
                subject_id,
                regimen: regimens.as_ref().and_then(|r| r[i].clone()),
                sex: sexes[i].clone(),
                age_months: ages[i],
                weight_g: weights[i],
            })
            .collect();

        info!(path = %path.display(), subjects = subjects.len(), "Loaded subject metadata");
        Ok(subjects)
    }

    /// Load the study results table: one row per subject and timepoint.
    pub fn load_observations(&self, path: &Path) -> Result<Vec<Observation>, LoadError> {
        let df = self.load_csv(path)?;
        let table = Table { df: &df, path };
        let c = &self.columns;

        let ids = table.required_strings(&c.subject_id)?;
        let timepoints = table.required_ints(&c.timepoint)?;
        let regimens = table.optional_strings(&c.regimen)?;
        let volumes = table.floats(&c.tumor_volume)?;
        let sites = table.ints(&c.metastatic_sites)?;

        let observations: Vec<Observation> = ids
            .into_iter()
            .zip(timepoints)
            .enumerate()
            .map(|(i, (subject_id, timepoint))| Observation {
                subject_id,
                timepoint,
                regimen: regimens.as_ref().and_then(|r| r[i].clone()),
                tumor_volume: volumes[i],
                metastatic_sites: sites[i],
            })
            .collect();

        info!(
            path = %path.display(),
            observations = observations.len(),
            "Loaded study results"
        );
        Ok(observations)
    }
}

/// Column extraction over one loaded file, mapping failures to `LoadError`.
struct Table<'a> {
    df: &'a DataFrame,
    path: &'a Path,
}

impl Table<'_> {
    fn column(&self, name: &str) -> Result<&Column, LoadError> {
        self.df.column(name).map_err(|_| LoadError::MissingColumn {
            path: self.path.to_path_buf(),
            column: name.to_string(),
        })
    }

    fn parse_err(&self, source: PolarsError) -> LoadError {
        LoadError::Parse {
            path: self.path.to_path_buf(),
            source,
        }
    }

    fn cast(&self, name: &str, dtype: &DataType) -> Result<Series, LoadError> {
        let column = self.column(name)?;
        column
            .as_materialized_series()
            .strict_cast(dtype)
            .map_err(|e| self.parse_err(e))
    }

    fn strings(&self, name: &str) -> Result<Vec<Option<String>>, LoadError> {
        let series = self.cast(name, &DataType::String)?;
        let ca = series.str().map_err(|e| self.parse_err(e))?;
        Ok(ca
            .into_iter()
            .map(|v| {
                v.map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
            .collect())
    }

    /// Like `strings`, but `None` when the column is absent from this file.
    fn optional_strings(&self, name: &str) -> Result<Option<Vec<Option<String>>>, LoadError> {
        if self.df.column(name).is_err() {
            return Ok(None);
        }
        self.strings(name).map(Some)
    }

    fn floats(&self, name: &str) -> Result<Vec<Option<f64>>, LoadError> {
        let series = self.cast(name, &DataType::Float64)?;
        let ca = series.f64().map_err(|e| self.parse_err(e))?;
        Ok(ca.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect())
    }

    /// Integer column. A column polars inferred as float is accepted only
    /// when every value is integral; casting would truncate `5.5` to `5`.
    fn ints(&self, name: &str) -> Result<Vec<Option<i64>>, LoadError> {
        if self.column(name)?.dtype().is_float() {
            let floats = self.floats(name)?;
            return floats
                .into_iter()
                .enumerate()
                .map(|(row, v)| match v {
                    Some(x) if x.fract() != 0.0 || !x.is_finite() => Err(self.parse_err(
                        PolarsError::ComputeError(
                            format!("row {row}: '{name}' value {x} is not an integer").into(),
                        ),
                    )),
                    Some(x) => Ok(Some(x as i64)),
                    None => Ok(None),
                })
                .collect();
        }

        let series = self.cast(name, &DataType::Int64)?;
        let ca = series.i64().map_err(|e| self.parse_err(e))?;
        Ok(ca.into_iter().collect())
    }

    fn required_strings(&self, name: &str) -> Result<Vec<String>, LoadError> {
        self.strings(name)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.ok_or_else(|| self.missing(row, name)))
            .collect()
    }

    fn required_ints(&self, name: &str) -> Result<Vec<i64>, LoadError> {
        self.ints(name)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.ok_or_else(|| self.missing(row, name)))
            .collect()
    }

    fn missing(&self, row: usize, column: &str) -> LoadError {
        LoadError::MissingValue {
            path: self.path.to_path_buf(),
            row,
            column: column.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_subjects() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "meta.csv",
            "Mouse ID,Drug Regimen,Sex,Age_months,Weight (g)\n\
             k403,Ramicane,Male,21,16\n\
             s185,Capomulin,Female,3,17\n\
             x401,Capomulin,,16,\n",
        );

        let subjects = DataLoader::default().load_subjects(&path).unwrap();
        assert_eq!(subjects.len(), 3);
        assert_eq!(subjects[0].subject_id, "k403");
        assert_eq!(subjects[0].regimen.as_deref(), Some("Ramicane"));
        assert_eq!(subjects[1].sex.as_deref(), Some("Female"));
        assert_eq!(subjects[1].age_months, Some(3));
        assert_eq!(subjects[1].weight_g, Some(17.0));
        assert_eq!(subjects[2].sex, None);
        assert_eq!(subjects[2].weight_g, None);
    }

    #[test]
    fn test_load_observations_without_regimen_column() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "results.csv",
            "Mouse ID,Timepoint,Tumor Volume (mm3),Metastatic Sites\n\
             b128,0,45.0,0\n\
             b128,5,45.651331,0\n\
             f932,0,,0\n",
        );

        let observations = DataLoader::default().load_observations(&path).unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[1].timepoint, 5);
        assert!((observations[1].tumor_volume.unwrap() - 45.651331).abs() < 1e-9);
        assert_eq!(observations[2].tumor_volume, None);
        assert!(observations.iter().all(|o| o.regimen.is_none()));
    }

    #[test]
    fn test_regimen_read_from_results_table() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "results.csv",
            "Mouse ID,Timepoint,Drug Regimen,Tumor Volume (mm3),Metastatic Sites\n\
             b128,0,Capomulin,45.0,0\n",
        );

        let observations = DataLoader::default().load_observations(&path).unwrap();
        assert_eq!(observations[0].regimen.as_deref(), Some("Capomulin"));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = DataLoader::default()
            .load_subjects(&dir.path().join("absent.csv"))
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn test_missing_column() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "results.csv", "Mouse ID,Timepoint\nb128,0\n");

        let err = DataLoader::default().load_observations(&path).unwrap_err();
        match err {
            LoadError::MissingColumn { column, .. } => assert_eq!(column, "Tumor Volume (mm3)"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_number_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "results.csv",
            "Mouse ID,Timepoint,Tumor Volume (mm3),Metastatic Sites\n\
             b128,zero,45.0,0\n",
        );

        let err = DataLoader::default().load_observations(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn test_fractional_timepoint_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "results.csv",
            "Mouse ID,Timepoint,Tumor Volume (mm3),Metastatic Sites\n\
             b128,0.0,45.0,0\n\
             b128,5.5,43.0,0\n",
        );

        let err = DataLoader::default().load_observations(&path).unwrap_err();
        match err {
            LoadError::Parse { source, .. } => assert!(source.to_string().contains("row 1")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_whole_float_timepoints_are_accepted() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "results.csv",
            "Mouse ID,Timepoint,Tumor Volume (mm3),Metastatic Sites\n\
             b128,0.0,45.0,0\n\
             b128,5.0,43.0,\n",
        );

        let observations = DataLoader::default().load_observations(&path).unwrap();
        let timepoints: Vec<i64> = observations.iter().map(|o| o.timepoint).collect();
        assert_eq!(timepoints, vec![0, 5]);
        assert_eq!(observations[1].metastatic_sites, None);
    }

    #[test]
    fn test_missing_timepoint_value() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "results.csv",
            "Mouse ID,Timepoint,Tumor Volume (mm3),Metastatic Sites\n\
             b128,0,45.0,0\n\
             b128,,46.0,0\n",
        );

        let err = DataLoader::default().load_observations(&path).unwrap_err();
        assert!(matches!(err, LoadError::MissingValue { row: 1, .. }));
    }
}
