use serde::{Deserialize, Serialize};

/// A concept identifier in the clinical terminology (SNOMED CT SCTID).
pub type ConceptCode = u64;

/// A patient identifier as it appears in cohort event files.
pub type PatientId = String;

/// SNOMED CT root concept, 138875005 |SNOMED CT Concept|.
/// Every active concept descends from it.
pub const SNOMED_ROOT: ConceptCode = 138875005;

/// A coded concept with its display label, as returned by the
/// terminology server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRef {
    pub code: ConceptCode,
    pub label: String,
}

impl ConceptRef {
    pub fn new(code: ConceptCode, label: impl Into<String>) -> Self {
        Self {
            code,
            label: label.into(),
        }
    }
}

/// Which of the two compared cohorts a patient observation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    A,
    B,
}

/// One ranked concept in the clustering output.
///
/// `raw_difference` is the prevalence gap (cohort B fraction minus cohort A
/// fraction, descendant-inclusive); `boosted_difference` is the same gap
/// weighted by hierarchy depth. Both are the frozen first-computed values,
/// untouched by later suppression passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEntry {
    pub code: ConceptCode,
    pub label: String,
    pub raw_difference: f64,
    pub boosted_difference: f64,
    pub depth: u32,
}
