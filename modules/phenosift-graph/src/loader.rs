use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use phenosift_common::{ConceptCode, ConceptRef, PhenosiftError};

use crate::ontology::TerminologySource;
use crate::store::ConceptGraph;

/// Builds the minimal sub-hierarchy covering a set of observed codes by
/// resolving parents upward until the root, one terminology lookup per
/// unresolved code.
pub struct GraphLoader<'a, T: TerminologySource> {
    tx: &'a T,
    root: ConceptCode,
}

impl<'a, T: TerminologySource> GraphLoader<'a, T> {
    pub fn new(tx: &'a T, root: ConceptCode) -> Self {
        Self { tx, root }
    }

    /// Resolve every observed code's ancestor chain and assemble the graph.
    ///
    /// Uses an explicit work stack with a resolved-map guard so each code is
    /// looked up exactly once and stack depth stays bounded on deep
    /// hierarchies. A non-root code whose parent list comes back empty is
    /// retired; its active replacements are grafted in as effective parents
    /// to keep the graph connected. Lookups run serially; any terminology
    /// failure aborts the build.
    pub async fn load(
        &self,
        observed: &HashSet<ConceptCode>,
    ) -> Result<ConceptGraph, PhenosiftError> {
        info!(
            observed = observed.len(),
            "Loading relevant slice of the concept hierarchy"
        );

        let mut resolved: HashMap<ConceptCode, Vec<ConceptRef>> = HashMap::new();
        resolved.insert(self.root, Vec::new());

        let mut stack: Vec<ConceptCode> = observed.iter().copied().collect();
        while let Some(code) = stack.pop() {
            if resolved.contains_key(&code) {
                continue;
            }
            let mut parents = self.tx.immediate_parents(code).await?;
            if parents.is_empty() {
                parents = self.tx.replacements(code).await?;
            }
            for parent in &parents {
                if !resolved.contains_key(&parent.code) {
                    stack.push(parent.code);
                }
            }
            resolved.insert(code, parents);
            if resolved.len() % 100 == 0 {
                debug!(resolved = resolved.len(), "Hierarchy resolution progress");
            }
        }

        let mut graph = ConceptGraph::new(self.root);
        for (child, parents) in &resolved {
            for parent in parents {
                graph.upsert_relationship(*child, parent);
            }
        }
        graph.assign_depths();

        let pruned = graph.prune_unreachable();
        if pruned > 0 {
            warn!(pruned, "Dropped concepts with no path to the root");
        }

        info!(
            observed = observed.len(),
            graph_size = graph.len(),
            "Concept graph built"
        );
        Ok(graph)
    }
}
