//! Binary encoding for entries and actions.
//!
//! Both use MessagePack with named fields, so a stored blob can be decoded
//! without knowing the schema that wrote it.

use crate::core::error::LedgerError;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, LedgerError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LedgerError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Render a MessagePack blob as JSON without a target type. Used when the
/// entry kind is not known to the caller, e.g. dumping a synced view.
pub fn to_json(bytes: &[u8]) -> Result<serde_json::Value, LedgerError> {
    Ok(rmp_serde::from_slice::<serde_json::Value>(bytes)?)
}
