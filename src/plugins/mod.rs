//! Entity bindings.
//!
//! Each record kind contributes a payload shape, a shape check and its link
//! tags; all behaviour comes from `core::engine`.

pub mod agent_profile;
pub mod ballot;
pub mod vote_item;

use crate::core::error::LedgerError;

/// Kinds exposed through the call surface, by snake-case name.
pub const KINDS: &[&str] = &[
    agent_profile::KIND,
    ballot::KIND,
    vote_item::KIND,
];

pub(crate) fn require_non_blank(kind: &str, field: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::MalformedPayload(format!(
            "{}.{} must not be blank",
            kind, field
        )));
    }
    Ok(())
}

/// Schema description of one kind's operations, for `clrvote schema`.
pub(crate) fn kind_schema(kind: &str, description: &str, fields: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "name": kind,
        "version": "0.1.0",
        "description": description,
        "fields": fields,
        "commands": [
            { "name": format!("create_{}", kind), "payload": kind },
            { "name": format!("get_latest_{}", kind), "payload": "action_hash" },
            { "name": format!("get_original_{}", kind), "payload": "action_hash" },
            { "name": format!("get_all_revisions_for_{}", kind), "payload": "action_hash" },
            {
                "name": format!("update_{}", kind),
                "payload": [
                    format!("original_{}_hash", kind),
                    format!("previous_{}_hash", kind),
                    format!("updated_{}", kind)
                ]
            },
            { "name": format!("delete_{}", kind), "payload": "action_hash" },
            { "name": format!("get_all_deletes_for_{}", kind), "payload": "action_hash" },
            { "name": format!("get_oldest_delete_for_{}", kind), "payload": "action_hash" }
        ],
        "storage": ["ledger.db"]
    })
}
