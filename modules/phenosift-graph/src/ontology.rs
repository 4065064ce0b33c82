use async_trait::async_trait;

use fhir_tx_client::FhirTxClient;
use phenosift_common::{ConceptCode, ConceptRef, PhenosiftError};

/// The ontology collaborator the graph engine is built against.
///
/// The hierarchy only ever needs three lookups: a concept's immediate
/// parents, the active replacements of a retired concept, and a display
/// label. Any failure is fatal to the run — a partially built graph is
/// never returned.
#[async_trait]
pub trait TerminologySource: Send + Sync {
    /// Immediate parents of a concept. Empty only for the universal root
    /// or a retired concept.
    async fn immediate_parents(&self, code: ConceptCode)
        -> Result<Vec<ConceptRef>, PhenosiftError>;

    /// Active replacement concepts for a retired code.
    async fn replacements(&self, code: ConceptCode) -> Result<Vec<ConceptRef>, PhenosiftError>;

    /// Display label for a concept.
    async fn label(&self, code: ConceptCode) -> Result<String, PhenosiftError>;
}

#[async_trait]
impl TerminologySource for FhirTxClient {
    async fn immediate_parents(
        &self,
        code: ConceptCode,
    ) -> Result<Vec<ConceptRef>, PhenosiftError> {
        FhirTxClient::immediate_parents(self, code)
            .await
            .map_err(|e| PhenosiftError::Terminology(e.to_string()))
    }

    async fn replacements(&self, code: ConceptCode) -> Result<Vec<ConceptRef>, PhenosiftError> {
        FhirTxClient::replacements(self, code)
            .await
            .map_err(|e| PhenosiftError::Terminology(e.to_string()))
    }

    async fn label(&self, code: ConceptCode) -> Result<String, PhenosiftError> {
        FhirTxClient::label(self, code)
            .await
            .map_err(|e| PhenosiftError::Terminology(e.to_string()))
    }
}
