//! AgentProfile: a registered voter.

use crate::core::engine::{EntryPayload, VersionedEntity};
use crate::core::error::LedgerError;
use crate::core::store::Store;
use crate::plugins::require_non_blank;
use serde::{Deserialize, Serialize};

pub const KIND: &str = "agent_profile";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentProfile {
    pub name: String,
    pub email: String,
    pub password: String,
    pub region: String,
}

impl EntryPayload for AgentProfile {
    const ENTRY_TYPE: &'static str = KIND;
    const UPDATES_LINK: &'static str = "AgentProfileUpdates";
    const DELETES_LINK: &'static str = "AgentProfileDeletes";

    fn validate(&self) -> Result<(), LedgerError> {
        require_non_blank(KIND, "name", &self.name)?;
        require_non_blank(KIND, "email", &self.email)
    }
}

pub type AgentProfiles<'s> = VersionedEntity<'s, Store, AgentProfile>;

pub fn schema() -> serde_json::Value {
    super::kind_schema(
        KIND,
        "Registered voter profile",
        serde_json::json!({
            "name": "string",
            "email": "string",
            "password": "string",
            "region": "string"
        }),
    )
}
