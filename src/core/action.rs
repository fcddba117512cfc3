//! Ledger data model: actions, entries, records and links.
//!
//! An [`Action`] is immutable once committed and identified by the hash of
//! its encoded bytes. Entries are payload blobs addressed by their own hash;
//! several actions may point at the same entry. A [`Record`] pairs an action
//! with its entry and is the unit handed back to callers.

use crate::core::codec;
use crate::core::error::LedgerError;
use crate::core::hash::{ActionHash, AgentPubKey, EntryHash, LinkHash};
use crate::core::time::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionKind {
    Create {
        entry_type: String,
        entry_hash: EntryHash,
    },
    Update {
        entry_type: String,
        entry_hash: EntryHash,
        /// Chain root: the Create this revision ultimately descends from.
        original_action: ActionHash,
        /// Revision this update was based on.
        previous_action: ActionHash,
    },
    Delete {
        deletes_address: ActionHash,
        deletes_entry_address: EntryHash,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub author: AgentPubKey,
    pub timestamp: Timestamp,
    pub action_seq: u32,
    /// Author's previous action; `None` only for the first action of a chain.
    pub prev_action: Option<ActionHash>,
    pub kind: ActionKind,
}

impl Action {
    pub fn entry_hash(&self) -> Option<&EntryHash> {
        match &self.kind {
            ActionKind::Create { entry_hash, .. } | ActionKind::Update { entry_hash, .. } => {
                Some(entry_hash)
            }
            ActionKind::Delete { .. } => None,
        }
    }

    pub fn entry_type(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Create { entry_type, .. } | ActionKind::Update { entry_type, .. } => {
                Some(entry_type)
            }
            ActionKind::Delete { .. } => None,
        }
    }

    /// Origin hash of the logical entity this action belongs to, given the
    /// action's own hash. Deletes are not part of any update chain.
    pub fn origin(&self, own_hash: &ActionHash) -> Option<ActionHash> {
        match &self.kind {
            ActionKind::Create { .. } => Some(*own_hash),
            ActionKind::Update {
                original_action, ..
            } => Some(*original_action),
            ActionKind::Delete { .. } => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ActionKind::Create { .. } => "Create",
            ActionKind::Update { .. } => "Update",
            ActionKind::Delete { .. } => "Delete",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        codec::encode(self)
    }

    /// Encode and hash in one step. The returned bytes are exactly what the
    /// hash was computed over.
    pub fn into_hashed(self) -> Result<(ActionHashed, Vec<u8>), LedgerError> {
        let bytes = self.encode()?;
        let hash = ActionHash::digest(&bytes);
        Ok((ActionHashed { hash, action: self }, bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionHashed {
    pub hash: ActionHash,
    pub action: Action,
}

impl ActionHashed {
    /// Decode stored bytes and check them against the hash they were filed under.
    pub fn from_stored(hash: ActionHash, bytes: &[u8]) -> Result<Self, LedgerError> {
        if ActionHash::digest(bytes) != hash {
            return Err(LedgerError::MalformedPayload(format!(
                "stored action {} fails its hash check",
                hash
            )));
        }
        Ok(Self {
            hash,
            action: codec::decode(bytes)?,
        })
    }

    pub fn timestamp(&self) -> Timestamp {
        self.action.timestamp
    }
}

/// Serialized entry payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry(pub Vec<u8>);

impl Entry {
    pub fn from_payload<T: Serialize>(payload: &T) -> Result<Self, LedgerError> {
        Ok(Entry(codec::encode(payload)?))
    }

    pub fn hash(&self) -> EntryHash {
        EntryHash::digest(&self.0)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, LedgerError> {
        codec::decode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub signed_action: ActionHashed,
    /// `None` for Delete actions, or when the entry has not replicated yet.
    pub entry: Option<Entry>,
}

impl Record {
    pub fn action_hash(&self) -> &ActionHash {
        &self.signed_action.hash
    }

    pub fn action(&self) -> &Action {
        &self.signed_action.action
    }

    pub fn timestamp(&self) -> Timestamp {
        self.signed_action.action.timestamp
    }

    /// Decode the entry into a typed payload. `Ok(None)` when the record
    /// carries no entry.
    pub fn entry_as<T: DeserializeOwned>(&self) -> Result<Option<T>, LedgerError> {
        self.entry.as_ref().map(Entry::decode).transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub hash: LinkHash,
    pub base: ActionHash,
    pub target: ActionHash,
    pub tag: String,
    pub author: AgentPubKey,
    pub timestamp: Timestamp,
}

#[derive(Serialize)]
struct LinkContent<'a> {
    base: &'a ActionHash,
    target: &'a ActionHash,
    tag: &'a str,
    author: &'a AgentPubKey,
    timestamp: Timestamp,
}

impl Link {
    pub fn new(
        base: ActionHash,
        target: ActionHash,
        tag: &str,
        author: AgentPubKey,
        timestamp: Timestamp,
    ) -> Result<Self, LedgerError> {
        let hash = Self::compute_hash(&base, &target, tag, &author, timestamp)?;
        Ok(Link {
            hash,
            base,
            target,
            tag: tag.to_string(),
            author,
            timestamp,
        })
    }

    fn compute_hash(
        base: &ActionHash,
        target: &ActionHash,
        tag: &str,
        author: &AgentPubKey,
        timestamp: Timestamp,
    ) -> Result<LinkHash, LedgerError> {
        let bytes = codec::encode(&LinkContent {
            base,
            target,
            tag,
            author,
            timestamp,
        })?;
        Ok(LinkHash::digest(&bytes))
    }

    /// True when the link hash matches its content.
    pub fn verify(&self) -> Result<bool, LedgerError> {
        let expected = Self::compute_hash(
            &self.base,
            &self.target,
            &self.tag,
            &self.author,
            self.timestamp,
        )?;
        Ok(expected == self.hash)
    }
}
