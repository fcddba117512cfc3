//! Ballot: a question put to vote.

use crate::core::engine::{EntryPayload, VersionedEntity};
use crate::core::error::LedgerError;
use crate::core::hash::AgentPubKey;
use crate::core::store::Store;
use crate::core::time::Timestamp;
use crate::plugins::require_non_blank;
use serde::{Deserialize, Serialize};

pub const KIND: &str = "ballot";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ballot {
    pub title: String,
    pub description: String,
    pub created_by: AgentPubKey,
    pub created_at: Timestamp,
}

impl EntryPayload for Ballot {
    const ENTRY_TYPE: &'static str = KIND;
    const UPDATES_LINK: &'static str = "BallotUpdates";
    const DELETES_LINK: &'static str = "BallotDeletes";

    fn validate(&self) -> Result<(), LedgerError> {
        require_non_blank(KIND, "title", &self.title)
    }
}

pub type Ballots<'s> = VersionedEntity<'s, Store, Ballot>;

pub fn schema() -> serde_json::Value {
    super::kind_schema(
        KIND,
        "Ballot put to the electorate",
        serde_json::json!({
            "title": "string",
            "description": "string",
            "created_by": "agent_pub_key",
            "created_at": "timestamp_micros"
        }),
    )
}
