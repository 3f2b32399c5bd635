//! Data Processor Module
//! Outer join of the two tables, duplicate removal and per-subject views.

use crate::data::{MergedRecord, Observation, SubjectRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{info, warn};

/// Result of removing duplicate (subject, timepoint) rows.
#[derive(Debug, Clone, Serialize)]
pub struct Deduplicated {
    #[serde(skip)]
    pub records: Vec<MergedRecord>,
    pub dropped: usize,
    /// Subjects that had at least one duplicate key, sorted.
    pub duplicate_subjects: Vec<String>,
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Full outer join on subject id.
    ///
    /// Rows come out grouped by subject id in lexicographic order. Within one
    /// id the output is every subject row paired with every observation row,
    /// both sides in input order. Ids present on one side only get a single
    /// side filled in.
    pub fn merge_outer(
        subjects: &[SubjectRecord],
        observations: &[Observation],
    ) -> Vec<MergedRecord> {
        let mut subjects_by_id: BTreeMap<&str, Vec<&SubjectRecord>> = BTreeMap::new();
        for subject in subjects {
            subjects_by_id
                .entry(subject.subject_id.as_str())
                .or_default()
                .push(subject);
        }

        let mut observations_by_id: BTreeMap<&str, Vec<&Observation>> = BTreeMap::new();
        for observation in observations {
            observations_by_id
                .entry(observation.subject_id.as_str())
                .or_default()
                .push(observation);
        }

        let ids: BTreeSet<&str> = subjects_by_id
            .keys()
            .chain(observations_by_id.keys())
            .copied()
            .collect();

        let mut merged = Vec::with_capacity(observations.len().max(subjects.len()));
        for id in ids {
            match (subjects_by_id.get(id), observations_by_id.get(id)) {
                (Some(subs), Some(obs)) => {
                    for subject in subs {
                        for observation in obs {
                            merged.push(MergedRecord::join(Some(*subject), Some(*observation)));
                        }
                    }
                }
                (Some(subs), None) => {
                    merged.extend(subs.iter().map(|s| MergedRecord::join(Some(*s), None)));
                }
                (None, Some(obs)) => {
                    merged.extend(obs.iter().map(|o| MergedRecord::join(None, Some(*o))));
                }
                (None, None) => {}
            }
        }

        info!(rows = merged.len(), "Merged subject metadata with study results");
        merged
    }

    /// Drop rows whose (subject id, timepoint) was already seen, keeping the
    /// first occurrence.
    pub fn drop_duplicate_keys(records: Vec<MergedRecord>) -> Deduplicated {
        let total = records.len();
        let mut seen: HashSet<(&str, Option<i64>)> = HashSet::with_capacity(total);
        let first_seen: Vec<bool> = records.iter().map(|r| seen.insert(r.key())).collect();

        let mut duplicate_subjects: BTreeSet<String> = BTreeSet::new();
        let mut kept = Vec::with_capacity(total);
        for (record, first) in records.into_iter().zip(first_seen) {
            if first {
                kept.push(record);
            } else {
                duplicate_subjects.insert(record.subject_id);
            }
        }

        let dropped = total - kept.len();
        if dropped > 0 {
            warn!(
                dropped,
                subjects = ?duplicate_subjects,
                "Dropped duplicate subject/timepoint rows"
            );
        }

        Deduplicated {
            records: kept,
            dropped,
            duplicate_subjects: duplicate_subjects.into_iter().collect(),
        }
    }

    /// One record per subject: the row at the subject's maximum timepoint.
    ///
    /// Subjects without any timepoint are left out. Output is ordered by
    /// subject id.
    pub fn last_timepoints(records: &[MergedRecord]) -> Vec<MergedRecord> {
        let mut last: BTreeMap<&str, i64> = BTreeMap::new();
        for record in records {
            if let Some(timepoint) = record.timepoint {
                last.entry(record.subject_id.as_str())
                    .and_modify(|t| *t = (*t).max(timepoint))
                    .or_insert(timepoint);
            }
        }

        last.into_iter()
            .filter_map(|(id, timepoint)| {
                records
                    .iter()
                    .find(|r| r.subject_id == id && r.timepoint == Some(timepoint))
                    .cloned()
            })
            .collect()
    }

    /// Records belonging to one regimen, input order kept.
    pub fn regimen_records<'a>(records: &'a [MergedRecord], regimen: &str) -> Vec<&'a MergedRecord> {
        records.iter().filter(|r| r.is_regimen(regimen)).collect()
    }

    /// (timepoint, volume) points for one subject of one regimen, sorted by
    /// timepoint. Rows without a volume are skipped.
    pub fn subject_trajectory(
        records: &[MergedRecord],
        regimen: &str,
        subject_id: &str,
    ) -> Vec<(i64, f64)> {
        let mut points: Vec<(i64, f64)> = records
            .iter()
            .filter(|r| r.is_regimen(regimen) && r.subject_id == subject_id)
            .filter_map(|r| Some((r.timepoint?, r.tumor_volume?)))
            .collect();
        points.sort_by_key(|&(t, _)| t);
        points
    }
}
