pub mod cohort;
pub mod loader;
pub mod node;
pub mod ontology;
pub mod pipeline;
pub mod score;
pub mod select;
pub mod store;
pub mod testutil;

pub use cohort::CohortEvents;
pub use loader::GraphLoader;
pub use node::{ConceptNode, ScoreSnapshot};
pub use ontology::TerminologySource;
pub use pipeline::{ClusteringOutcome, ClusteringParams, DifferenceClustering};
pub use score::DifferenceScorer;
pub use select::ClusterSelector;
pub use store::ConceptGraph;
