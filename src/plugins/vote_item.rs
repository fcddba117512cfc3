//! VoteItem: one weighted vote against a ballot.

use crate::core::engine::{EntryPayload, VersionedEntity};
use crate::core::error::LedgerError;
use crate::core::store::Store;
use crate::plugins::require_non_blank;
use serde::{Deserialize, Serialize};

pub const KIND: &str = "vote_item";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteItem {
    pub ballot_name: String,
    pub vote_weight: u8,
}

impl EntryPayload for VoteItem {
    const ENTRY_TYPE: &'static str = KIND;
    const UPDATES_LINK: &'static str = "VoteItemUpdates";
    const DELETES_LINK: &'static str = "VoteItemDeletes";

    fn validate(&self) -> Result<(), LedgerError> {
        require_non_blank(KIND, "ballot_name", &self.ballot_name)
    }
}

pub type VoteItems<'s> = VersionedEntity<'s, Store, VoteItem>;

pub fn schema() -> serde_json::Value {
    super::kind_schema(
        KIND,
        "Weighted vote cast against a ballot",
        serde_json::json!({
            "ballot_name": "string",
            "vote_weight": "u8"
        }),
    )
}
