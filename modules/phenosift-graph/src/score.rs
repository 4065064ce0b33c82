use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use phenosift_common::{Cohort, ConceptCode, PatientId};

use crate::store::ConceptGraph;

pub const DEFAULT_DEPTH_MULTIPLIER: f64 = 0.1;

/// Scores concepts by depth-weighted prevalence difference between the two
/// cohorts, aggregating patient coverage over each concept's full
/// descendant closure.
pub struct DifferenceScorer {
    pub depth_multiplier: f64,
}

impl Default for DifferenceScorer {
    fn default() -> Self {
        Self {
            depth_multiplier: DEFAULT_DEPTH_MULTIPLIER,
        }
    }
}

impl DifferenceScorer {
    pub fn new(depth_multiplier: f64) -> Self {
        Self { depth_multiplier }
    }

    /// Deduplicated patient count over the node and all of its descendants
    /// for one cohort. A patient observed under several branches counts
    /// once.
    pub fn subtree_patient_count(
        &self,
        graph: &mut ConceptGraph,
        code: ConceptCode,
        cohort: Cohort,
    ) -> usize {
        self.subtree_patients(graph, code, cohort).len()
    }

    /// Memoized union of direct patient sets over the descendant closure.
    ///
    /// Iterative post-order: a node is folded only once every child holds a
    /// cached set, so each node's union is computed exactly once per run and
    /// shared branches are reused through the `Arc` caches.
    fn subtree_patients(
        &self,
        graph: &mut ConceptGraph,
        code: ConceptCode,
        cohort: Cohort,
    ) -> Arc<HashSet<PatientId>> {
        if !graph.contains(code) {
            return Arc::new(HashSet::new());
        }

        let mut stack = vec![code];
        while let Some(&top) = stack.last() {
            let node = match graph.get(top) {
                Some(node) => node,
                None => {
                    stack.pop();
                    continue;
                }
            };
            if node.subtree_cache(cohort).is_some() {
                stack.pop();
                continue;
            }

            let children: Vec<ConceptCode> = node.children.iter().copied().collect();
            let pending: Vec<ConceptCode> = children
                .iter()
                .copied()
                .filter(|c| {
                    graph
                        .get(*c)
                        .is_some_and(|n| n.subtree_cache(cohort).is_none())
                })
                .collect();
            if !pending.is_empty() {
                stack.extend(pending);
                continue;
            }

            let mut patients: HashSet<PatientId> = match graph.get(top) {
                Some(node) => node.direct_patients(cohort).clone(),
                None => HashSet::new(),
            };
            for child in children {
                if let Some(cache) = graph.get(child).and_then(|n| n.subtree_cache(cohort)) {
                    patients.extend(cache.iter().cloned());
                }
            }
            if let Some(node) = graph.get_mut(top) {
                node.set_subtree_cache(cohort, Arc::new(patients));
            }
            stack.pop();
        }

        graph
            .get(code)
            .and_then(|n| n.subtree_cache(cohort))
            .unwrap_or_else(|| Arc::new(HashSet::new()))
    }

    /// Recompute a node's working scores.
    ///
    /// Suppressed: both working scores go to zero, retracting the node's
    /// signal once an ancestor has captured it. Otherwise the raw score is
    /// the cohort-B coverage fraction minus the cohort-A fraction, and the
    /// boosted score weights it by `1 + depth * depth_multiplier` so deeper
    /// (more specific) concepts win ties against generic ancestors.
    ///
    /// The first non-suppressed call freezes the reported snapshot; cohort
    /// sizes must be non-zero (the pipeline rejects empty cohorts up front).
    pub fn score(
        &self,
        graph: &mut ConceptGraph,
        code: ConceptCode,
        group_a_size: usize,
        group_b_size: usize,
        suppress: bool,
    ) -> (f64, f64) {
        if suppress {
            if let Some(node) = graph.get_mut(code) {
                node.raw_difference = 0.0;
                node.boosted_difference = 0.0;
            }
            return (0.0, 0.0);
        }

        let count_a = self.subtree_patient_count(graph, code, Cohort::A);
        let count_b = self.subtree_patient_count(graph, code, Cohort::B);
        match graph.get_mut(code) {
            Some(node) => {
                let strength_a = count_a as f64 / group_a_size as f64;
                let strength_b = count_b as f64 / group_b_size as f64;
                node.raw_difference = strength_b - strength_a;
                node.boosted_difference =
                    node.raw_difference * (1.0 + node.depth as f64 * self.depth_multiplier);
                node.freeze_score();
                (node.raw_difference, node.boosted_difference)
            }
            None => (0.0, 0.0),
        }
    }

    /// Score every observed code plus all of its ancestors — the subgraph
    /// the selector will draw candidates from. Codes absent from the graph
    /// are skipped. Returns the touched candidate set.
    pub fn score_candidates(
        &self,
        graph: &mut ConceptGraph,
        observed: &HashSet<ConceptCode>,
        group_a_size: usize,
        group_b_size: usize,
    ) -> HashSet<ConceptCode> {
        let mut touched = HashSet::new();
        let total = observed.len();
        let mut done = 0usize;
        let mut last_progress: i64 = -1;

        for &code in observed {
            if graph.contains(code) {
                if touched.insert(code) {
                    self.score(graph, code, group_a_size, group_b_size, false);
                }
                for ancestor in graph.ancestors(code) {
                    if touched.insert(ancestor) {
                        self.score(graph, ancestor, group_a_size, group_b_size, false);
                    }
                }
            }
            done += 1;
            let progress = (done * 100 / total) as i64;
            if progress > last_progress && progress % 5 == 0 {
                info!(percent = progress, "Scoring progress");
                last_progress = progress;
            }
        }
        touched
    }
}
