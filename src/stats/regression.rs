//! Correlation and simple linear regression.
//!
//! Pairs each subject's mean weight with its mean tumor volume for one
//! regimen, then fits `volume = slope * weight + intercept` by ordinary least
//! squares.

use crate::data::{DataProcessor, MergedRecord};
use crate::stats::AnalysisError;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeMap;

/// Per-subject means for one regimen, ordered by subject id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubjectAverages {
    pub regimen: String,
    pub subject_ids: Vec<String>,
    pub weights: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl SubjectAverages {
    /// Subjects missing either mean are dropped.
    pub fn compute(records: &[MergedRecord], regimen: &str) -> Self {
        #[derive(Default)]
        struct Sums {
            weight: f64,
            weight_n: usize,
            volume: f64,
            volume_n: usize,
        }

        let mut by_subject: BTreeMap<&str, Sums> = BTreeMap::new();
        for record in DataProcessor::regimen_records(records, regimen) {
            let sums = by_subject.entry(record.subject_id.as_str()).or_default();
            if let Some(w) = record.weight_g {
                sums.weight += w;
                sums.weight_n += 1;
            }
            if let Some(v) = record.tumor_volume {
                sums.volume += v;
                sums.volume_n += 1;
            }
        }

        let mut averages = SubjectAverages {
            regimen: regimen.to_string(),
            ..Default::default()
        };
        for (id, sums) in by_subject {
            if sums.weight_n == 0 || sums.volume_n == 0 {
                continue;
            }
            averages.subject_ids.push(id.to_string());
            averages.weights.push(sums.weight / sums.weight_n as f64);
            averages.volumes.push(sums.volume / sums.volume_n as f64);
        }
        averages
    }

    pub fn len(&self) -> usize {
        self.subject_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subject_ids.is_empty()
    }
}

/// Pearson correlation with its two-sided p-value.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Correlation {
    /// Coefficient in [-1, 1]; NaN when either series is constant.
    pub r: f64,
    pub p_value: f64,
    pub n: usize,
}

impl Correlation {
    /// Coefficient rounded to two decimals for display.
    pub fn rounded(&self) -> f64 {
        (self.r * 100.0).round() / 100.0
    }
}

/// Result of a simple linear regression: y = slope · x + intercept.
#[derive(Debug, Clone, Serialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    pub correlation: Correlation,
    pub r_squared: f64,
    /// Standard error of the slope.
    pub slope_se: f64,
    /// Standard error of the intercept.
    pub intercept_se: f64,
    /// Fitted values on the training x.
    pub fitted: Vec<f64>,
}

impl RegressionResult {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// `y = 0.95x + 21.55`
    pub fn equation(&self) -> String {
        format!("y = {:.2}x + {:.2}", self.slope, self.intercept)
    }
}

struct Moments {
    n: usize,
    x_mean: f64,
    y_mean: f64,
    ss_x: f64,
    ss_y: f64,
    ss_xy: f64,
}

fn moments(x: &[f64], y: &[f64]) -> Result<Moments, AnalysisError> {
    let n = x.len();
    if n != y.len() {
        return Err(AnalysisError::LengthMismatch { x: n, y: y.len() });
    }
    if n < 2 {
        return Err(AnalysisError::InsufficientData { needed: 2, got: n });
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AnalysisError::NonFinite);
    }

    let nf = n as f64;
    let x_mean = x.iter().sum::<f64>() / nf;
    let y_mean = y.iter().sum::<f64>() / nf;
    let ss_x = x.iter().map(|&xi| (xi - x_mean).powi(2)).sum();
    let ss_y = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum();
    let ss_xy = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (xi - x_mean) * (yi - y_mean))
        .sum();

    Ok(Moments {
        n,
        x_mean,
        y_mean,
        ss_x,
        ss_y,
        ss_xy,
    })
}

fn correlation_from(m: &Moments) -> Correlation {
    if m.ss_x <= 0.0 || m.ss_y <= 0.0 {
        return Correlation {
            r: f64::NAN,
            p_value: f64::NAN,
            n: m.n,
        };
    }

    let r = (m.ss_xy / (m.ss_x * m.ss_y).sqrt()).clamp(-1.0, 1.0);
    Correlation {
        r,
        p_value: correlation_p_value(r, m.n),
        n: m.n,
    }
}

/// Two-sided p-value of t = r·√(n-2)/√(1-r²) with n-2 degrees of freedom.
fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n <= 2 {
        return 1.0;
    }
    let one_minus_r2 = 1.0 - r * r;
    if one_minus_r2 <= 0.0 {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t = r * (df / one_minus_r2).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

/// Pearson correlation coefficient of two equally long series.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<Correlation, AnalysisError> {
    let m = moments(x, y)?;
    Ok(correlation_from(&m))
}

/// Ordinary least squares fit of y on x.
///
/// Fails when x is constant. A constant y still fits (slope 0) with NaN
/// correlation.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<RegressionResult, AnalysisError> {
    let m = moments(x, y)?;
    if m.ss_x <= 0.0 {
        return Err(AnalysisError::ZeroVariance);
    }

    let slope = m.ss_xy / m.ss_x;
    let intercept = m.y_mean - slope * m.x_mean;
    let correlation = correlation_from(&m);
    let r_squared = correlation.r * correlation.r;

    let fitted: Vec<f64> = x.iter().map(|&xi| slope * xi + intercept).collect();

    let (slope_se, intercept_se) = if m.n > 2 {
        let ss_res: f64 = y
            .iter()
            .zip(&fitted)
            .map(|(&yi, &fi)| (yi - fi).powi(2))
            .sum();
        let mse = ss_res / (m.n - 2) as f64;
        let slope_se = (mse / m.ss_x).sqrt();
        let intercept_se = (mse * (1.0 / m.n as f64 + m.x_mean * m.x_mean / m.ss_x)).sqrt();
        (slope_se, intercept_se)
    } else {
        (0.0, 0.0)
    };

    Ok(RegressionResult {
        slope,
        intercept,
        correlation,
        r_squared,
        slope_se,
        intercept_se,
        fitted,
    })
}
