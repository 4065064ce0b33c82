pub mod error;
pub mod types;

pub use error::{Result, TxError};

use phenosift_common::{ConceptCode, ConceptRef};
use types::{Parameters, ValueSetResponse};

pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

/// SAME AS historical association reference set. Maps retired concepts to
/// their active replacements.
const SAME_AS_ASSOCIATION: &str = "900000000000527005";

const DEFAULT_PAGE_SIZE: u32 = 10_000;

/// Client for a FHIR R4 terminology server carrying SNOMED CT
/// (e.g. Snowstorm Lite).
pub struct FhirTxClient {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
    logging: bool,
}

impl FhirTxClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            page_size: DEFAULT_PAGE_SIZE,
            logging: true,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_request_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Expand a ValueSet URL into its member codes, paging until
    /// `expansion.total` is exhausted.
    pub async fn expand_valueset(&self, vs_url: &str) -> Result<Vec<ConceptRef>> {
        let endpoint = format!("{}/ValueSet/$expand", self.base_url);
        let mut codes = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let resp = self
                .client
                .get(&endpoint)
                .query(&[
                    ("count", self.page_size.to_string()),
                    ("offset", offset.to_string()),
                    ("url", vs_url.to_string()),
                ])
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(TxError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let vs: ValueSetResponse = resp.json().await?;
            let total = vs.expansion.total;
            if self.logging && offset == 0 {
                tracing::info!(vs_url, total, "Expanding ValueSet");
            }

            for coding in vs.expansion.contains {
                codes.push(ConceptRef {
                    code: parse_sctid(&coding.code)?,
                    label: coding.display,
                });
            }

            offset += self.page_size as u64;
            // Progress marker only for expansions spanning more than three pages.
            if self.logging && total > self.page_size as u64 * 3 {
                tracing::debug!(fetched = codes.len(), total, "ValueSet expansion progress");
            }
            if offset >= total {
                break;
            }
        }

        Ok(codes)
    }

    /// Expand a SNOMED CT Expression Constraint (ECL) query.
    pub async fn expand_ecl(&self, ecl: &str) -> Result<Vec<ConceptRef>> {
        self.expand_valueset(&format!("{SNOMED_SYSTEM}?fhir_vs=ecl/{ecl}"))
            .await
    }

    /// Immediate is-a parents of a concept, with labels.
    /// Empty for the root concept and for retired codes.
    pub async fn immediate_parents(&self, code: ConceptCode) -> Result<Vec<ConceptRef>> {
        self.expand_ecl(&format!(">! {code}")).await
    }

    /// Active replacement concepts for a retired code, via the SAME AS
    /// historical association ConceptMap.
    pub async fn replacements(&self, code: ConceptCode) -> Result<Vec<ConceptRef>> {
        let endpoint = format!("{}/ConceptMap/$translate", self.base_url);
        let resp = self
            .client
            .get(&endpoint)
            .query(&[
                ("code", code.to_string()),
                ("system", SNOMED_SYSTEM.to_string()),
                (
                    "url",
                    format!("{SNOMED_SYSTEM}?fhir_cm={SAME_AS_ASSOCIATION}"),
                ),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TxError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let params: Parameters = resp.json().await?;
        let mut replacements = Vec::new();
        for coding in params
            .parameter
            .iter()
            .filter(|p| p.name == "match")
            .flat_map(|p| p.part.iter())
            .filter_map(|part| part.value_coding.as_ref())
        {
            if let Some(raw) = coding.code.as_deref() {
                replacements.push(ConceptRef {
                    code: parse_sctid(raw)?,
                    label: coding.display.clone().unwrap_or_default(),
                });
            }
        }

        if self.logging {
            tracing::debug!(code, count = replacements.len(), "Resolved inactive concept");
        }
        Ok(replacements)
    }

    /// Display label for a concept via `CodeSystem/$lookup`.
    pub async fn label(&self, code: ConceptCode) -> Result<String> {
        let endpoint = format!("{}/CodeSystem/$lookup", self.base_url);
        let resp = self
            .client
            .get(&endpoint)
            .query(&[
                ("system", SNOMED_SYSTEM.to_string()),
                ("code", code.to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TxError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let params: Parameters = resp.json().await?;
        let display = params
            .parameter
            .into_iter()
            .find(|p| p.name == "display")
            .and_then(|p| p.value_string)
            .ok_or_else(|| TxError::Parse(format!("$lookup response for {code} has no display")))?;

        Ok(display)
    }
}

fn parse_sctid(raw: &str) -> Result<ConceptCode> {
    raw.parse()
        .map_err(|_| TxError::Parse(format!("invalid SCTID: {raw}")))
}
