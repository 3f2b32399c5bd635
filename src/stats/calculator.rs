//! Statistics Calculator Module
//! Descriptive statistics per regimen, quantiles and value counts.

use crate::data::MergedRecord;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Statistics for a single regimen.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    pub group_name: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub variance: f64,
    pub std: f64,
    pub sem: f64,
}

impl Default for GroupStats {
    fn default() -> Self {
        Self {
            group_name: String::new(),
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            variance: f64::NAN,
            std: f64::NAN,
            sem: f64::NAN,
        }
    }
}

/// Occurrences of one label in a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub label: String,
    pub count: usize,
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    ///
    /// Variance is the sample variance (n - 1), so a single value yields NaN
    /// for variance, std and SEM.
    pub fn compute_descriptive_stats(values: &[f64]) -> GroupStats {
        let n = values.len();
        if n == 0 {
            return GroupStats::default();
        }

        let sorted = Self::sorted(values);

        let mean = values.iter().sum::<f64>() / n as f64;
        let median = Self::quantile(&sorted, 0.5);

        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            f64::NAN
        };
        let std = variance.sqrt();
        let sem = std / (n as f64).sqrt();

        GroupStats {
            group_name: String::new(),
            count: n,
            mean,
            median,
            variance,
            std,
            sem,
        }
    }

    /// Copy of `values` in ascending order.
    pub fn sorted(values: &[f64]) -> Vec<f64> {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted
    }

    /// Quantile `q` in [0, 1] of sorted values using linear interpolation
    /// between closest ranks (`rank = q * (n - 1)`, NumPy's default).
    pub fn quantile(sorted_values: &[f64], q: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] + (sorted_values[upper] - sorted_values[lower]) * frac
        }
    }

    /// Tumor volumes grouped by regimen. Rows without a regimen or volume are
    /// skipped.
    pub fn volumes_by_regimen(records: &[MergedRecord]) -> BTreeMap<String, Vec<f64>> {
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for record in records {
            let Some(regimen) = &record.regimen else {
                continue;
            };
            let values = groups.entry(regimen.clone()).or_default();
            if let Some(volume) = record.tumor_volume {
                values.push(volume);
            }
        }
        groups
    }

    /// Compute statistics for all regimens in parallel, keyed by regimen name.
    pub fn summarize_by_regimen(records: &[MergedRecord]) -> BTreeMap<String, GroupStats> {
        let groups = Self::volumes_by_regimen(records);

        groups
            .par_iter()
            .map(|(regimen, values)| {
                let mut gs = Self::compute_descriptive_stats(values);
                gs.group_name = regimen.clone();
                (regimen.clone(), gs)
            })
            .collect()
    }

    /// Count occurrences of each label, most frequent first. Ties are
    /// ordered by label; missing labels are not counted.
    pub fn value_counts<'a, I>(labels: I) -> Vec<ValueCount>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for label in labels.into_iter().flatten() {
            *counts.entry(label).or_default() += 1;
        }

        let mut counts: Vec<ValueCount> = counts
            .into_iter()
            .map(|(label, count)| ValueCount {
                label: label.to_string(),
                count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn record(id: &str, regimen: Option<&str>, volume: Option<f64>) -> MergedRecord {
        MergedRecord {
            subject_id: id.to_string(),
            timepoint: Some(0),
            regimen: regimen.map(|r| r.to_string()),
            sex: Some("Female".to_string()),
            age_months: None,
            weight_g: None,
            tumor_volume: volume,
            metastatic_sites: None,
        }
    }

    #[test]
    fn test_descriptive_stats() {
        let gs = StatsCalculator::compute_descriptive_stats(&[10.0, 20.0, 30.0]);
        assert_eq!(gs.count, 3);
        assert!(close(gs.mean, 20.0));
        assert!(close(gs.median, 20.0));
        assert!(close(gs.variance, 100.0));
        assert!(close(gs.std, 10.0));
        assert!(close(gs.sem, 10.0 / 3f64.sqrt()));
        assert!((gs.sem - 5.7735).abs() < 1e-4);
    }

    #[test]
    fn test_single_value_has_nan_spread() {
        let gs = StatsCalculator::compute_descriptive_stats(&[42.0]);
        assert_eq!(gs.count, 1);
        assert!(close(gs.mean, 42.0));
        assert!(close(gs.median, 42.0));
        assert!(gs.variance.is_nan());
        assert!(gs.std.is_nan());
        assert!(gs.sem.is_nan());
    }

    #[test]
    fn test_empty_is_all_nan() {
        let gs = StatsCalculator::compute_descriptive_stats(&[]);
        assert_eq!(gs.count, 0);
        assert!(gs.mean.is_nan());
        assert!(gs.median.is_nan());
    }

    #[test]
    fn test_even_median_interpolates() {
        let gs = StatsCalculator::compute_descriptive_stats(&[4.0, 1.0, 3.0, 2.0]);
        assert!(close(gs.median, 2.5));
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        assert!(close(StatsCalculator::quantile(&sorted, 0.25), 2.25));
        assert!(close(StatsCalculator::quantile(&sorted, 0.75), 4.75));
        assert!(close(StatsCalculator::quantile(&sorted, 0.0), 1.0));
        assert!(close(StatsCalculator::quantile(&sorted, 1.0), 100.0));
        assert!(StatsCalculator::quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_summarize_by_regimen() {
        let records = vec![
            record("a", Some("Ramicane"), Some(10.0)),
            record("b", Some("Capomulin"), Some(40.0)),
            record("c", Some("Ramicane"), Some(20.0)),
            record("d", Some("Ramicane"), Some(30.0)),
            record("e", None, Some(99.0)),
            record("f", Some("Capomulin"), None),
        ];

        let summary = StatsCalculator::summarize_by_regimen(&records);
        let names: Vec<&String> = summary.keys().collect();
        assert_eq!(names, vec!["Capomulin", "Ramicane"]);

        let ramicane = &summary["Ramicane"];
        assert_eq!(ramicane.group_name, "Ramicane");
        assert!(close(ramicane.mean, 20.0));
        assert!(close(ramicane.variance, 100.0));

        let capomulin = &summary["Capomulin"];
        assert_eq!(capomulin.count, 1);
        assert!(capomulin.sem.is_nan());
    }

    #[test]
    fn test_value_counts_order() {
        let labels = [Some("b"), Some("a"), None, Some("b"), Some("c"), Some("a")];
        let counts = StatsCalculator::value_counts(labels);
        assert_eq!(
            counts,
            vec![
                ValueCount { label: "a".to_string(), count: 2 },
                ValueCount { label: "b".to_string(), count: 2 },
                ValueCount { label: "c".to_string(), count: 1 },
            ]
        );
    }
}
