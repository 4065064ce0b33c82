use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use phenosift_common::{Cohort, ConceptCode, PatientId, PhenosiftError};

use crate::store::ConceptGraph;

pub const PATIENT_ID_COLUMN: &str = "patient_id";
pub const CONCEPT_CODE_COLUMN: &str = "snomed_code";

#[derive(Debug, Deserialize)]
struct EventRow {
    patient_id: PatientId,
    snomed_code: ConceptCode,
}

/// One cohort's event log: every row is a single (patient, concept)
/// observation. A patient may appear any number of times.
#[derive(Debug, Clone, Default)]
pub struct CohortEvents {
    events: Vec<(PatientId, ConceptCode)>,
}

impl CohortEvents {
    pub fn from_events(events: Vec<(PatientId, ConceptCode)>) -> Self {
        Self { events }
    }

    /// Load a cohort from a CSV file with `patient_id` and `snomed_code`
    /// columns. Column presence is validated before any rows are read, so
    /// malformed input fails before graph work starts.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, PhenosiftError> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| PhenosiftError::Validation(format!("{}: {e}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| PhenosiftError::Validation(format!("{}: {e}", path.display())))?;
        for required in [PATIENT_ID_COLUMN, CONCEPT_CODE_COLUMN] {
            if !headers.iter().any(|h| h == required) {
                return Err(PhenosiftError::Validation(format!(
                    "{}: missing column: {required}",
                    path.display()
                )));
            }
        }

        let mut events = Vec::new();
        for row in reader.deserialize() {
            let row: EventRow =
                row.map_err(|e| PhenosiftError::Validation(format!("{}: {e}", path.display())))?;
            events.push((row.patient_id, row.snomed_code));
        }

        info!(path = %path.display(), events = events.len(), "Loaded cohort events");
        Ok(Self { events })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of distinct patients in the cohort — the denominator for
    /// prevalence.
    pub fn distinct_patients(&self) -> usize {
        self.events
            .iter()
            .map(|(patient, _)| patient.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Every distinct concept code observed in the cohort.
    pub fn codes(&self) -> HashSet<ConceptCode> {
        self.events.iter().map(|(_, code)| *code).collect()
    }

    /// Record direct patient membership on the graph. Codes the built
    /// graph does not contain land in `missing` and are excluded from
    /// scoring; this is never fatal.
    pub fn apply(
        &self,
        graph: &mut ConceptGraph,
        cohort: Cohort,
        missing: &mut HashSet<ConceptCode>,
    ) {
        for (patient, code) in &self.events {
            match graph.get_mut(*code) {
                Some(node) => node.add_patient(cohort, patient.clone()),
                None => {
                    missing.insert(*code);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phenosift_common::ConceptRef;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_events_and_counts_distinct_patients() {
        let file = write_csv(
            "patient_id,snomed_code\n\
             p1,195967001\n\
             p1,13645005\n\
             p2,195967001\n",
        );
        let cohort = CohortEvents::from_csv_path(file.path()).unwrap();
        assert_eq!(cohort.len(), 3);
        assert_eq!(cohort.distinct_patients(), 2);
        assert_eq!(cohort.codes(), HashSet::from([195967001, 13645005]));
    }

    #[test]
    fn missing_required_column_fails_fast() {
        let file = write_csv("patient_id,code\np1,195967001\n");
        let err = CohortEvents::from_csv_path(file.path()).unwrap_err();
        assert!(matches!(err, PhenosiftError::Validation(_)));
        assert!(err.to_string().contains("snomed_code"));
    }

    #[test]
    fn non_numeric_code_is_a_validation_error() {
        let file = write_csv("patient_id,snomed_code\np1,asthma\n");
        let err = CohortEvents::from_csv_path(file.path()).unwrap_err();
        assert!(matches!(err, PhenosiftError::Validation(_)));
    }

    #[test]
    fn extra_columns_are_tolerated() {
        let file = write_csv(
            "date,patient_id,snomed_code,source\n\
             2020-03-01,p1,195967001,gp\n",
        );
        let cohort = CohortEvents::from_csv_path(file.path()).unwrap();
        assert_eq!(cohort.len(), 1);
    }

    #[test]
    fn apply_records_membership_and_collects_missing_codes() {
        let mut graph = ConceptGraph::new(138875005);
        graph.upsert_relationship(10, &ConceptRef::new(138875005, "root"));

        let cohort = CohortEvents::from_events(vec![
            ("p1".to_string(), 10),
            ("p2".to_string(), 10),
            ("p3".to_string(), 999),
        ]);
        let mut missing = HashSet::new();
        cohort.apply(&mut graph, Cohort::A, &mut missing);

        assert_eq!(graph.get(10).unwrap().direct_patients(Cohort::A).len(), 2);
        assert_eq!(missing, HashSet::from([999]));
    }
}
