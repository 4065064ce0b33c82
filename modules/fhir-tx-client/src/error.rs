use thiserror::Error;

pub type Result<T> = std::result::Result<T, TxError>;

#[derive(Debug, Error)]
pub enum TxError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Terminology server error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TxError {
    fn from(err: reqwest::Error) -> Self {
        TxError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for TxError {
    fn from(err: serde_json::Error) -> Self {
        TxError::Parse(err.to_string())
    }
}
