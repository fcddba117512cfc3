use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Target hash is not resolvable in the local view. It may still exist
    /// on a peer that has not replicated to us yet.
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),
    #[error("Invalid chain reference: {0}")]
    InvalidChainReference(String),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl LedgerError {
    /// Stable identifier used in call responses.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::NotFound(_) => "not_found",
            LedgerError::MalformedPayload(_) => "malformed_payload",
            LedgerError::StoreUnavailable(_) | LedgerError::IoError(_) => "store_unavailable",
            LedgerError::InvalidChainReference(_) => "invalid_chain_reference",
            LedgerError::ConfigError(_) => "config_error",
        }
    }
}

impl From<rmp_serde::encode::Error> for LedgerError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        LedgerError::MalformedPayload(format!("encode: {}", e))
    }
}

impl From<rmp_serde::decode::Error> for LedgerError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        LedgerError::MalformedPayload(format!("decode: {}", e))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::MalformedPayload(e.to_string())
    }
}
