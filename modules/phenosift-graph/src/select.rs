use std::collections::HashSet;

use tracing::{debug, info, warn};

use phenosift_common::{ClusterEntry, ConceptCode};

use crate::score::DifferenceScorer;
use crate::store::ConceptGraph;

pub const DEFAULT_MIN_DIFF: f64 = 0.05;
pub const DEFAULT_MAX_CLUSTERS: usize = 10;

/// Direction of one greedy pass: which cohort the selected concepts favor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Overrepresented in cohort B: maximum boosted difference.
    Positive,
    /// Overrepresented in cohort A: minimum boosted difference.
    Negative,
}

/// Greedily picks the non-subsuming top-k scored concepts, once in each
/// direction. Accepting a concept suppresses its whole descendant closure
/// so already-explained signal cannot be re-selected.
pub struct ClusterSelector {
    pub min_diff: f64,
    pub max_clusters: usize,
}

impl Default for ClusterSelector {
    fn default() -> Self {
        Self {
            min_diff: DEFAULT_MIN_DIFF,
            max_clusters: DEFAULT_MAX_CLUSTERS,
        }
    }
}

impl ClusterSelector {
    pub fn new(min_diff: f64, max_clusters: usize) -> Self {
        Self {
            min_diff,
            max_clusters,
        }
    }

    /// Run both passes over the scored candidate set and concatenate the
    /// results, positive pass first. Each entry reports the frozen score
    /// snapshot, not the possibly-suppressed working score.
    pub fn select(
        &self,
        graph: &mut ConceptGraph,
        scorer: &DifferenceScorer,
        candidates: &HashSet<ConceptCode>,
        group_a_size: usize,
        group_b_size: usize,
    ) -> Vec<ClusterEntry> {
        let mut entries = self.select_directed(
            graph,
            scorer,
            candidates,
            group_a_size,
            group_b_size,
            Direction::Positive,
        );
        entries.extend(self.select_directed(
            graph,
            scorer,
            candidates,
            group_a_size,
            group_b_size,
            Direction::Negative,
        ));
        entries
    }

    fn select_directed(
        &self,
        graph: &mut ConceptGraph,
        scorer: &DifferenceScorer,
        candidates: &HashSet<ConceptCode>,
        group_a_size: usize,
        group_b_size: usize,
        direction: Direction,
    ) -> Vec<ClusterEntry> {
        let mut pool: HashSet<ConceptCode> = candidates.clone();
        let mut accepted: Vec<ConceptCode> = Vec::new();
        let mut entries = Vec::new();
        info!(?direction, pool = pool.len(), "Selecting clusters");

        while accepted.len() < self.max_clusters && !pool.is_empty() {
            let Some(best) = best_candidate(graph, &pool, direction) else {
                break;
            };
            let (signed, _) = directed_rank(graph, best, direction);
            if signed < self.min_diff {
                break;
            }

            if !any_subsumption(graph, best, &accepted) {
                if let Some(node) = graph.get(best) {
                    // Report the frozen first-computed scores; the working
                    // scores may already be suppressed by an earlier pass.
                    let (raw, boosted) = match node.frozen() {
                        Some(snapshot) => (snapshot.raw, snapshot.boosted),
                        None => (node.raw_difference, node.boosted_difference),
                    };
                    entries.push(ClusterEntry {
                        code: best,
                        label: node.label.clone(),
                        raw_difference: raw,
                        boosted_difference: boosted,
                        depth: node.depth,
                    });
                }
                accepted.push(best);
                debug!(code = best, ?direction, "Accepted cluster");

                // Retract the already-explained signal of the whole subtree.
                for code in graph.descendant_closure(best) {
                    scorer.score(graph, code, group_a_size, group_b_size, true);
                }
            }

            if !pool.remove(&best) {
                warn!(code = best, "Failed to remove candidate from pool");
            }
        }

        entries
    }
}

/// Working boosted score oriented so that "bigger is better" for the pass,
/// paired with depth for tie-breaking toward the more specific concept.
fn directed_rank(graph: &ConceptGraph, code: ConceptCode, direction: Direction) -> (f64, u32) {
    match graph.get(code) {
        Some(node) => {
            let signed = match direction {
                Direction::Positive => node.boosted_difference,
                Direction::Negative => -node.boosted_difference,
            };
            (signed, node.depth)
        }
        None => (f64::NEG_INFINITY, 0),
    }
}

fn best_candidate(
    graph: &ConceptGraph,
    pool: &HashSet<ConceptCode>,
    direction: Direction,
) -> Option<ConceptCode> {
    pool.iter().copied().max_by(|&a, &b| {
        let (score_a, depth_a) = directed_rank(graph, a, direction);
        let (score_b, depth_b) = directed_rank(graph, b, direction);
        score_a.total_cmp(&score_b).then(depth_a.cmp(&depth_b))
    })
}

/// True when the candidate is an ancestor or descendant of (or identical
/// to) any already-accepted concept.
fn any_subsumption(graph: &ConceptGraph, code: ConceptCode, accepted: &[ConceptCode]) -> bool {
    if accepted.contains(&code) {
        return true;
    }
    let ancestors = graph.ancestors(code);
    accepted
        .iter()
        .any(|other| ancestors.contains(other) || graph.ancestors(*other).contains(&code))
}
