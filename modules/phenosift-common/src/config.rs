use std::env;

/// Application configuration loaded from environment variables.
///
/// Everything has a sensible local default; a run against a remote
/// terminology server only needs `TX_SERVER_URL` set.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the FHIR terminology server (e.g. Snowstorm Lite).
    pub tx_server_url: String,

    /// Page size for ValueSet expansions.
    pub tx_page_size: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            tx_server_url: env::var("TX_SERVER_URL")
                .unwrap_or_else(|_| "http://localhost:8080/fhir".to_string()),
            tx_page_size: env::var("TX_PAGE_SIZE")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .expect("TX_PAGE_SIZE must be a number"),
        }
    }
}
