use std::collections::HashSet;
use std::sync::Arc;

use phenosift_common::{Cohort, ConceptCode, PatientId};

/// Depth of a node that `assign_depths` has not reached yet.
pub const UNASSIGNED_DEPTH: u32 = u32::MAX;

/// The first non-suppressed score pair computed for a node. Written once;
/// later suppression passes zero the working scores but never this.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSnapshot {
    pub raw: f64,
    pub boosted: f64,
}

/// A vertex in the concept hierarchy.
///
/// Identity is the concept code alone; the store keys nodes by it and
/// adjacency is kept as code sets, so equality and hashing in every
/// container are the integer key itself. The hierarchy is a DAG — a node
/// may carry several parents.
#[derive(Debug, Clone)]
pub struct ConceptNode {
    pub code: ConceptCode,
    /// Display label, empty until resolved.
    pub label: String,
    pub parents: HashSet<ConceptCode>,
    pub children: HashSet<ConceptCode>,
    /// Patients recorded directly against this concept, descendants excluded.
    pub patients_a: HashSet<PatientId>,
    pub patients_b: HashSet<PatientId>,
    /// Minimum number of edges from the universal root. Never increases
    /// once assigned.
    pub depth: u32,
    pub raw_difference: f64,
    pub boosted_difference: f64,
    frozen: Option<ScoreSnapshot>,
    subtree_cache_a: Option<Arc<HashSet<PatientId>>>,
    subtree_cache_b: Option<Arc<HashSet<PatientId>>>,
}

impl ConceptNode {
    pub fn new(code: ConceptCode) -> Self {
        Self {
            code,
            label: String::new(),
            parents: HashSet::new(),
            children: HashSet::new(),
            patients_a: HashSet::new(),
            patients_b: HashSet::new(),
            depth: UNASSIGNED_DEPTH,
            raw_difference: 0.0,
            boosted_difference: 0.0,
            frozen: None,
            subtree_cache_a: None,
            subtree_cache_b: None,
        }
    }

    pub fn add_patient(&mut self, cohort: Cohort, patient: PatientId) {
        match cohort {
            Cohort::A => self.patients_a.insert(patient),
            Cohort::B => self.patients_b.insert(patient),
        };
    }

    pub fn direct_patients(&self, cohort: Cohort) -> &HashSet<PatientId> {
        match cohort {
            Cohort::A => &self.patients_a,
            Cohort::B => &self.patients_b,
        }
    }

    /// Memoized patient set for this node's full descendant closure.
    /// `None` until the scorer computes it; never invalidated within a run.
    pub fn subtree_cache(&self, cohort: Cohort) -> Option<Arc<HashSet<PatientId>>> {
        match cohort {
            Cohort::A => self.subtree_cache_a.clone(),
            Cohort::B => self.subtree_cache_b.clone(),
        }
    }

    pub fn set_subtree_cache(&mut self, cohort: Cohort, patients: Arc<HashSet<PatientId>>) {
        match cohort {
            Cohort::A => self.subtree_cache_a = Some(patients),
            Cohort::B => self.subtree_cache_b = Some(patients),
        }
    }

    pub fn frozen(&self) -> Option<ScoreSnapshot> {
        self.frozen
    }

    /// Capture the current working scores as the reported snapshot.
    /// A no-op once a snapshot exists.
    pub fn freeze_score(&mut self) {
        if self.frozen.is_none() {
            self.frozen = Some(ScoreSnapshot {
                raw: self.raw_difference,
                boosted: self.boosted_difference,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_starts_unassigned_and_unscored() {
        let node = ConceptNode::new(404684003);
        assert_eq!(node.depth, UNASSIGNED_DEPTH);
        assert!(node.frozen().is_none());
        assert!(node.subtree_cache(Cohort::A).is_none());
    }

    #[test]
    fn direct_patients_deduplicate_per_cohort() {
        let mut node = ConceptNode::new(195967001);
        node.add_patient(Cohort::A, "p1".to_string());
        node.add_patient(Cohort::A, "p1".to_string());
        node.add_patient(Cohort::B, "p1".to_string());
        assert_eq!(node.direct_patients(Cohort::A).len(), 1);
        assert_eq!(node.direct_patients(Cohort::B).len(), 1);
    }

    #[test]
    fn freeze_is_write_once() {
        let mut node = ConceptNode::new(195967001);
        node.raw_difference = 0.4;
        node.boosted_difference = 0.52;
        node.freeze_score();

        node.raw_difference = 0.0;
        node.boosted_difference = 0.0;
        node.freeze_score();

        let snapshot = node.frozen().unwrap();
        assert_eq!(snapshot.raw, 0.4);
        assert_eq!(snapshot.boosted, 0.52);
    }
}
