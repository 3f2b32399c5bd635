//! Typed rows of the two input tables and of the merged table.

use serde::Serialize;

/// One row of the subject metadata table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRecord {
    pub subject_id: String,
    pub regimen: Option<String>,
    pub sex: Option<String>,
    pub age_months: Option<i64>,
    pub weight_g: Option<f64>,
}

/// One row of the study results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub subject_id: String,
    pub timepoint: i64,
    pub regimen: Option<String>,
    pub tumor_volume: Option<f64>,
    pub metastatic_sites: Option<i64>,
}

/// Observation joined with subject attributes.
///
/// Produced by a full outer join, so either side may be missing: a subject
/// without observations has no timepoint or volume, an observation without
/// metadata has no sex, age or weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub subject_id: String,
    pub timepoint: Option<i64>,
    pub regimen: Option<String>,
    pub sex: Option<String>,
    pub age_months: Option<i64>,
    pub weight_g: Option<f64>,
    pub tumor_volume: Option<f64>,
    pub metastatic_sites: Option<i64>,
}

impl MergedRecord {
    pub fn join(subject: Option<&SubjectRecord>, observation: Option<&Observation>) -> Self {
        let subject_id = subject
            .map(|s| s.subject_id.clone())
            .or_else(|| observation.map(|o| o.subject_id.clone()))
            .unwrap_or_default();

        // The results table wins when both sides name a regimen.
        let regimen = observation
            .and_then(|o| o.regimen.clone())
            .or_else(|| subject.and_then(|s| s.regimen.clone()));

        Self {
            subject_id,
            timepoint: observation.map(|o| o.timepoint),
            regimen,
            sex: subject.and_then(|s| s.sex.clone()),
            age_months: subject.and_then(|s| s.age_months),
            weight_g: subject.and_then(|s| s.weight_g),
            tumor_volume: observation.and_then(|o| o.tumor_volume),
            metastatic_sites: observation.and_then(|o| o.metastatic_sites),
        }
    }

    /// Composite key used for deduplication.
    pub fn key(&self) -> (&str, Option<i64>) {
        (self.subject_id.as_str(), self.timepoint)
    }

    pub fn is_regimen(&self, regimen: &str) -> bool {
        self.regimen.as_deref() == Some(regimen)
    }
}
