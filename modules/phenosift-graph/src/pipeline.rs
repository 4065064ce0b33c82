use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use phenosift_common::{ClusterEntry, Cohort, ConceptCode, PhenosiftError, SNOMED_ROOT};

use crate::cohort::CohortEvents;
use crate::loader::GraphLoader;
use crate::ontology::TerminologySource;
use crate::score::{DifferenceScorer, DEFAULT_DEPTH_MULTIPLIER};
use crate::select::{ClusterSelector, DEFAULT_MAX_CLUSTERS, DEFAULT_MIN_DIFF};

/// Tuning knobs for one clustering run.
#[derive(Debug, Clone)]
pub struct ClusteringParams {
    pub root_code: ConceptCode,
    pub depth_multiplier: f64,
    pub min_diff: f64,
    pub max_clusters: usize,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            root_code: SNOMED_ROOT,
            depth_multiplier: DEFAULT_DEPTH_MULTIPLIER,
            min_diff: DEFAULT_MIN_DIFF,
            max_clusters: DEFAULT_MAX_CLUSTERS,
        }
    }
}

/// Orchestrates the full run over two cohorts:
/// 1. Build the minimal sub-hierarchy for the observed codes
/// 2. Fold cohort events into the graph as direct patient membership
/// 3. Score every touched node
/// 4. Select non-subsuming clusters in both directions
/// 5. Resolve missing labels
pub struct DifferenceClustering<T: TerminologySource> {
    tx: T,
    params: ClusteringParams,
}

/// Result of one clustering run, positive-pass entries first.
#[derive(Debug)]
pub struct ClusteringOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub entries: Vec<ClusterEntry>,
    pub graph_size: usize,
    pub candidate_count: usize,
    pub missing_codes: usize,
    pub group_a_size: usize,
    pub group_b_size: usize,
}

impl<T: TerminologySource> DifferenceClustering<T> {
    pub fn new(tx: T) -> Self {
        Self {
            tx,
            params: ClusteringParams::default(),
        }
    }

    pub fn with_params(mut self, params: ClusteringParams) -> Self {
        self.params = params;
        self
    }

    pub async fn run(
        &self,
        cohort_a: &CohortEvents,
        cohort_b: &CohortEvents,
    ) -> Result<ClusteringOutcome, PhenosiftError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let group_a_size = cohort_a.distinct_patients();
        let group_b_size = cohort_b.distinct_patients();
        if group_a_size == 0 || group_b_size == 0 {
            return Err(PhenosiftError::Config(
                "both cohorts need at least one patient; prevalence is undefined otherwise"
                    .to_string(),
            ));
        }
        info!(%run_id, group_a_size, group_b_size, "Starting difference clustering");

        let observed: HashSet<ConceptCode> =
            cohort_a.codes().union(&cohort_b.codes()).copied().collect();

        let loader = GraphLoader::new(&self.tx, self.params.root_code);
        let mut graph = loader.load(&observed).await?;

        let mut missing = HashSet::new();
        cohort_a.apply(&mut graph, Cohort::A, &mut missing);
        cohort_b.apply(&mut graph, Cohort::B, &mut missing);
        if !missing.is_empty() {
            warn!(
                count = missing.len(),
                "Observed codes missing from the built graph; excluded from scoring"
            );
        }

        let scorer = DifferenceScorer::new(self.params.depth_multiplier);
        let candidates = scorer.score_candidates(&mut graph, &observed, group_a_size, group_b_size);

        let selector = ClusterSelector::new(self.params.min_diff, self.params.max_clusters);
        let mut entries = selector.select(&mut graph, &scorer, &candidates, group_a_size, group_b_size);

        for entry in &mut entries {
            if entry.label.is_empty() {
                entry.label = self.tx.label(entry.code).await?;
            }
        }

        info!(%run_id, clusters = entries.len(), "Difference clustering complete");
        Ok(ClusteringOutcome {
            run_id,
            started_at,
            entries,
            graph_size: graph.len(),
            candidate_count: candidates.len(),
            missing_codes: missing.len(),
            group_a_size,
            group_b_size,
        })
    }
}

impl std::fmt::Display for ClusteringOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Difference Clustering Complete ===")?;
        writeln!(f, "Run:            {}", self.run_id)?;
        writeln!(f, "Cohort sizes:   A={} B={}", self.group_a_size, self.group_b_size)?;
        writeln!(f, "Graph size:     {}", self.graph_size)?;
        writeln!(f, "Candidates:     {}", self.candidate_count)?;
        writeln!(f, "Missing codes:  {}", self.missing_codes)?;
        writeln!(f, "Clusters:       {}", self.entries.len())?;
        for entry in &self.entries {
            writeln!(
                f,
                "  {:>18}  raw {:+.4}  boosted {:+.4}  depth {:>2}  {}",
                entry.code,
                entry.raw_difference,
                entry.boosted_difference,
                entry.depth,
                entry.label
            )?;
        }
        Ok(())
    }
}
