//! IQR outlier screening on final tumor volumes.

use crate::data::MergedRecord;
use crate::stats::StatsCalculator;
use serde::Serialize;
use tracing::debug;

/// Quartiles and Tukey fences of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuartileSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl QuartileSummary {
    pub fn from_values(values: &[f64]) -> Self {
        let sorted = StatsCalculator::sorted(values);
        let q1 = StatsCalculator::quantile(&sorted, 0.25);
        let median = StatsCalculator::quantile(&sorted, 0.5);
        let q3 = StatsCalculator::quantile(&sorted, 0.75);
        let iqr = q3 - q1;

        Self {
            q1,
            median,
            q3,
            iqr,
            lower_bound: q1 - 1.5 * iqr,
            upper_bound: q3 + 1.5 * iqr,
        }
    }

    /// Strictly outside the fences. NaN bounds flag nothing.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower_bound || value > self.upper_bound
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outlier {
    pub subject_id: String,
    pub value: f64,
}

/// Outlier screening result for one regimen.
#[derive(Debug, Clone, Serialize)]
pub struct OutlierReport {
    pub regimen: String,
    /// Final volumes in subject id order.
    pub values: Vec<f64>,
    pub quartiles: QuartileSummary,
    pub outliers: Vec<Outlier>,
}

impl OutlierReport {
    pub fn outlier_values(&self) -> Vec<f64> {
        self.outliers.iter().map(|o| o.value).collect()
    }
}

pub struct OutlierDetector;

impl OutlierDetector {
    /// Screen each regimen in `treatments` against last-timepoint records.
    ///
    /// Reports keep the order of `treatments`; a regimen with no records
    /// still gets a report with NaN quartiles and no outliers.
    pub fn detect(last_timepoints: &[MergedRecord], treatments: &[String]) -> Vec<OutlierReport> {
        treatments
            .iter()
            .map(|regimen| {
                let rows: Vec<(&str, f64)> = last_timepoints
                    .iter()
                    .filter(|r| r.is_regimen(regimen))
                    .filter_map(|r| Some((r.subject_id.as_str(), r.tumor_volume?)))
                    .collect();

                let values: Vec<f64> = rows.iter().map(|&(_, v)| v).collect();
                let quartiles = QuartileSummary::from_values(&values);
                let outliers: Vec<Outlier> = rows
                    .iter()
                    .filter(|&&(_, v)| quartiles.is_outlier(v))
                    .map(|&(id, value)| Outlier {
                        subject_id: id.to_string(),
                        value,
                    })
                    .collect();

                debug!(
                    regimen = %regimen,
                    n = values.len(),
                    iqr = quartiles.iqr,
                    outliers = outliers.len(),
                    "Screened final volumes"
                );

                OutlierReport {
                    regimen: regimen.clone(),
                    values,
                    quartiles,
                    outliers,
                }
            })
            .collect()
    }
}
