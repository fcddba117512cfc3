//! Call surface.
//!
//! Callers (the registration form, the CLI, peers) address operations by
//! name, e.g. `create_agent_profile` or `get_all_revisions_for_ballot`, with
//! a JSON payload. This module decodes the payload into the kind's typed
//! input, runs the engine and encodes the result. No business logic lives
//! here beyond picking the binding.
//!
//! # Response envelope
//!
//! Every call returns a [`CallResponse`]: `success`, a [`Receipt`] with
//! input/output digests, the `result` on success and an [`CallError`]
//! (`code` = error kind) on failure. Absent records are `null` results,
//! not errors.

use crate::core::action::{Action, Record};
use crate::core::engine::{EntryPayload, VersionedEntity};
use crate::core::error::LedgerError;
use crate::core::hash::ActionHash;
use crate::core::store::Store;
use crate::core::time;
use crate::core::trace::{self, TraceEvent};
use crate::plugins::agent_profile::{self, AgentProfile};
use crate::plugins::ballot::{self, Ballot};
use crate::plugins::vote_item::{self, VoteItem};
use crate::plugins::KINDS;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Digest;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallRequest {
    /// Operation name, `<op>_<kind>`
    pub fn_name: String,
    #[serde(default)]
    pub payload: Value,
    /// Request ID for correlation
    #[serde(default = "default_request_id")]
    pub id: String,
}

pub fn default_request_id() -> String {
    time::new_event_id()
}

impl CallRequest {
    pub fn new(fn_name: &str, payload: Value) -> Self {
        CallRequest {
            fn_name: fn_name.to_string(),
            payload,
            id: default_request_id(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallResponse {
    pub id: String,
    pub success: bool,
    pub receipt: Receipt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CallError>,
}

/// What happened, with digests of what went in and came out.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Receipt {
    pub op: String,
    pub timestamp: String,
    pub inputs_hash: String,
    pub outputs_hash: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallError {
    /// Stable error kind (`not_found`, `malformed_payload`, ...)
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    GetLatest,
    GetOriginal,
    GetAllRevisions,
    Update,
    Delete,
    GetAllDeletes,
    GetOldestDelete,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Create,
        Operation::GetLatest,
        Operation::GetOriginal,
        Operation::GetAllRevisions,
        Operation::Update,
        Operation::Delete,
        Operation::GetAllDeletes,
        Operation::GetOldestDelete,
    ];

    pub fn fn_name(&self, kind: &str) -> String {
        match self {
            Operation::Create => format!("create_{}", kind),
            Operation::GetLatest => format!("get_latest_{}", kind),
            Operation::GetOriginal => format!("get_original_{}", kind),
            Operation::GetAllRevisions => format!("get_all_revisions_for_{}", kind),
            Operation::Update => format!("update_{}", kind),
            Operation::Delete => format!("delete_{}", kind),
            Operation::GetAllDeletes => format!("get_all_deletes_for_{}", kind),
            Operation::GetOldestDelete => format!("get_oldest_delete_for_{}", kind),
        }
    }
}

/// Every operation name the surface answers to.
pub fn fn_names() -> Vec<String> {
    KINDS
        .iter()
        .flat_map(|kind| Operation::ALL.iter().map(move |op| op.fn_name(kind)))
        .collect()
}

pub fn parse_fn_name(fn_name: &str) -> Option<(Operation, &'static str)> {
    KINDS.iter().find_map(|kind| {
        Operation::ALL
            .iter()
            .find(|op| op.fn_name(kind) == fn_name)
            .map(|op| (*op, *kind))
    })
}

/// Record as returned to callers: entry decoded to the kind's JSON shape.
#[derive(Debug, Serialize)]
pub struct RecordView<T> {
    pub hash: ActionHash,
    pub action: Action,
    pub entry: Option<T>,
}

impl<T: EntryPayload> RecordView<T> {
    pub fn from_record(record: Record) -> Result<Self, LedgerError> {
        let entry = record.entry_as::<T>()?;
        Ok(RecordView {
            hash: record.signed_action.hash,
            action: record.signed_action.action,
            entry,
        })
    }
}

/// Run one named operation against `store`.
pub fn dispatch(store: &Store, fn_name: &str, payload: Value) -> Result<Value, LedgerError> {
    let (op, kind) = parse_fn_name(fn_name)
        .ok_or_else(|| LedgerError::NotFound(format!("no operation named '{}'", fn_name)))?;
    match kind {
        agent_profile::KIND => dispatch_kind::<AgentProfile>(store, op, payload),
        ballot::KIND => dispatch_kind::<Ballot>(store, op, payload),
        vote_item::KIND => dispatch_kind::<VoteItem>(store, op, payload),
        other => Err(LedgerError::NotFound(format!("no binding for kind '{}'", other))),
    }
}

fn dispatch_kind<T: EntryPayload>(
    store: &Store,
    op: Operation,
    payload: Value,
) -> Result<Value, LedgerError> {
    let entities = VersionedEntity::<Store, T>::new(store);
    match op {
        Operation::Create => {
            let input: T = decode_entry(payload)?;
            record_json::<T>(entities.create(&input)?)
        }
        Operation::GetLatest => optional_record_json::<T>(entities.get_latest(&decode_hash(payload)?)?),
        Operation::GetOriginal => {
            optional_record_json::<T>(entities.get_original(&decode_hash(payload)?)?)
        }
        Operation::GetAllRevisions => {
            let records = entities.get_all_revisions(&decode_hash(payload)?)?;
            let views = records
                .into_iter()
                .map(RecordView::<T>::from_record)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(serde_json::to_value(views)?)
        }
        Operation::Update => {
            let input = UpdateInput::<T>::from_payload(payload)?;
            record_json::<T>(entities.update(&input.original, &input.previous, &input.updated)?)
        }
        Operation::Delete => Ok(serde_json::to_value(entities.delete(&decode_hash(payload)?)?)?),
        Operation::GetAllDeletes => Ok(serde_json::to_value(
            entities.get_all_deletes(&decode_hash(payload)?)?,
        )?),
        Operation::GetOldestDelete => Ok(serde_json::to_value(
            entities.get_oldest_delete(&decode_hash(payload)?)?,
        )?),
    }
}

/// Update payload: `{original_<kind>_hash, previous_<kind>_hash, updated_<kind>}`.
struct UpdateInput<T> {
    original: ActionHash,
    previous: ActionHash,
    updated: T,
}

impl<T: EntryPayload> UpdateInput<T> {
    fn from_payload(payload: Value) -> Result<Self, LedgerError> {
        let Value::Object(mut map) = payload else {
            return Err(LedgerError::MalformedPayload(format!(
                "update_{} expects an object payload",
                T::ENTRY_TYPE
            )));
        };
        let mut take = |key: String| {
            map.remove(&key)
                .ok_or_else(|| LedgerError::MalformedPayload(format!("missing field `{}`", key)))
        };
        let original = decode_hash(take(format!("original_{}_hash", T::ENTRY_TYPE))?)?;
        let previous = decode_hash(take(format!("previous_{}_hash", T::ENTRY_TYPE))?)?;
        let updated = decode_entry(take(format!("updated_{}", T::ENTRY_TYPE))?)?;
        Ok(UpdateInput {
            original,
            previous,
            updated,
        })
    }
}

fn decode_entry<T: EntryPayload>(payload: Value) -> Result<T, LedgerError> {
    serde_json::from_value(payload)
        .map_err(|e| LedgerError::MalformedPayload(format!("{}: {}", T::ENTRY_TYPE, e)))
}

fn decode_hash(payload: Value) -> Result<ActionHash, LedgerError> {
    match payload {
        Value::String(s) => s.parse(),
        other => Err(LedgerError::MalformedPayload(format!(
            "expected an action hash string, got {}",
            other
        ))),
    }
}

fn record_json<T: EntryPayload>(record: Record) -> Result<Value, LedgerError> {
    Ok(serde_json::to_value(RecordView::<T>::from_record(record)?)?)
}

fn optional_record_json<T: EntryPayload>(record: Option<Record>) -> Result<Value, LedgerError> {
    match record {
        Some(r) => record_json::<T>(r),
        None => Ok(Value::Null),
    }
}

/// Handle one request end to end: dispatch, build the envelope, trace it.
/// Only a failure to write the trace escapes as `Err`; operation failures
/// are reported inside the response.
pub fn call(store: &Store, request: CallRequest, trace_enabled: bool) -> Result<CallResponse, LedgerError> {
    let inputs_hash = digest_json(&request.payload);
    let outcome = dispatch(store, &request.fn_name, request.payload.clone());

    let response = match outcome {
        Ok(result) => CallResponse {
            id: request.id.clone(),
            success: true,
            receipt: Receipt {
                op: request.fn_name.clone(),
                timestamp: time::now_epoch_z(),
                inputs_hash,
                outputs_hash: digest_json(&result),
            },
            result: Some(result),
            error: None,
        },
        Err(e) => CallResponse {
            id: request.id.clone(),
            success: false,
            receipt: Receipt {
                op: request.fn_name.clone(),
                timestamp: time::now_epoch_z(),
                inputs_hash,
                outputs_hash: format!("{:x}", sha2::Sha256::digest("error")),
            },
            result: None,
            error: Some(CallError {
                code: e.kind().to_string(),
                message: e.to_string(),
            }),
        },
    };

    if trace_enabled {
        trace::append_trace(
            &store.root,
            TraceEvent {
                trace_id: request.id,
                ts: response.receipt.timestamp.clone(),
                actor: store.agent.to_hex(),
                op: request.fn_name,
                request: request.payload,
                response: serde_json::to_value(&response)?,
            },
        )?;
    }

    Ok(response)
}

fn digest_json(value: &Value) -> String {
    format!(
        "{:x}",
        sha2::Sha256::digest(serde_json::to_string(value).unwrap_or_default())
    )
}

pub fn schema() -> Value {
    serde_json::json!({
        "name": "surface",
        "version": "0.1.0",
        "description": "Named call surface over the record kinds",
        "kinds": [agent_profile::schema(), ballot::schema(), vote_item::schema()],
        "operations": fn_names(),
        "storage": [trace::TRACE_LOG_NAME]
    })
}
