//! In-memory terminology fixtures for unit and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use phenosift_common::{ConceptCode, ConceptRef, PhenosiftError};

use crate::ontology::TerminologySource;

/// A `TerminologySource` backed by maps, with per-code lookup counting and
/// optional injected failures.
#[derive(Default)]
pub struct StaticOntology {
    parents: HashMap<ConceptCode, Vec<ConceptRef>>,
    replacement_map: HashMap<ConceptCode, Vec<ConceptRef>>,
    labels: HashMap<ConceptCode, String>,
    failing: Vec<ConceptCode>,
    lookups: Mutex<HashMap<ConceptCode, usize>>,
}

impl StaticOntology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `parent` (with its label) as an immediate parent of `child`.
    pub fn with_edge(
        mut self,
        child: ConceptCode,
        parent: ConceptCode,
        parent_label: &str,
    ) -> Self {
        self.parents
            .entry(child)
            .or_default()
            .push(ConceptRef::new(parent, parent_label));
        self.labels.insert(parent, parent_label.to_string());
        self
    }

    /// Declare `retired` as inactive with the given active replacement.
    pub fn with_replacement(mut self, retired: ConceptCode, replacement: ConceptRef) -> Self {
        self.replacement_map.entry(retired).or_default().push(replacement);
        self
    }

    pub fn with_label(mut self, code: ConceptCode, label: &str) -> Self {
        self.labels.insert(code, label.to_string());
        self
    }

    /// Make parent lookups for `code` fail, simulating a server error.
    pub fn failing_on(mut self, code: ConceptCode) -> Self {
        self.failing.push(code);
        self
    }

    /// How many times `immediate_parents` was asked about `code`.
    pub fn parent_lookups(&self, code: ConceptCode) -> usize {
        self.lookups
            .lock()
            .expect("lookup counter poisoned")
            .get(&code)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl TerminologySource for StaticOntology {
    async fn immediate_parents(
        &self,
        code: ConceptCode,
    ) -> Result<Vec<ConceptRef>, PhenosiftError> {
        *self
            .lookups
            .lock()
            .expect("lookup counter poisoned")
            .entry(code)
            .or_insert(0) += 1;
        if self.failing.contains(&code) {
            return Err(PhenosiftError::Terminology(format!(
                "injected failure for {code}"
            )));
        }
        Ok(self.parents.get(&code).cloned().unwrap_or_default())
    }

    async fn replacements(&self, code: ConceptCode) -> Result<Vec<ConceptRef>, PhenosiftError> {
        Ok(self.replacement_map.get(&code).cloned().unwrap_or_default())
    }

    async fn label(&self, code: ConceptCode) -> Result<String, PhenosiftError> {
        Ok(self.labels.get(&code).cloned().unwrap_or_default())
    }
}
