//! Store abstraction for the content-addressed ledger.
//!
//! [`RecordStore`] is the contract the versioned-entity engine consumes:
//! immutable hash-identified actions and entries, plus a typed link index
//! between hashes. [`Store`] is a handle on one local view of that ledger;
//! the SQLite-backed implementation lives in `core::ledger`.

use crate::core::action::{Entry, Link, Record};
use crate::core::error::LedgerError;
use crate::core::hash::{ActionHash, AgentPubKey, EntryHash, LinkHash};
use std::path::PathBuf;

/// Store handle representing one agent's local view of the ledger.
///
/// Every peer holds its own view; views converge through replication
/// (`core::sync`) but may disagree at any instant.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the store root directory (`<project>/.clrvote/data`)
    pub root: PathBuf,
    /// Author of every action committed through this handle
    pub agent: AgentPubKey,
}

/// A link committed together with the action it targets.
#[derive(Debug, Clone, Copy)]
pub struct LinkFrom<'a> {
    pub base: ActionHash,
    pub tag: &'a str,
}

/// Primitives offered by the content-addressed store.
///
/// Reads only see what the local view holds at call time. Absence is
/// reported as `None`/empty, never as an error.
pub trait RecordStore {
    fn agent(&self) -> &AgentPubKey;

    /// Commit a Create action wrapping `entry`.
    fn commit_entry(
        &self,
        entry_type: &str,
        entry: Entry,
    ) -> Result<(ActionHash, EntryHash), LedgerError>;

    /// Commit an Update action based on `previous`. The store records the
    /// chain root alongside the predecessor. `links` are written in the same
    /// transaction, each pointing at the new action.
    fn commit_update(
        &self,
        previous: &ActionHash,
        entry_type: &str,
        entry: Entry,
        links: &[LinkFrom<'_>],
    ) -> Result<ActionHash, LedgerError>;

    /// Commit a Delete action for `target`, with `links` to it written
    /// atomically alongside.
    fn commit_delete(
        &self,
        target: &ActionHash,
        links: &[LinkFrom<'_>],
    ) -> Result<ActionHash, LedgerError>;

    fn create_link(
        &self,
        base: &ActionHash,
        target: &ActionHash,
        tag: &str,
    ) -> Result<LinkHash, LedgerError>;

    /// Links from `base` with `tag`, in no particular order.
    fn get_links(&self, base: &ActionHash, tag: &str) -> Result<Vec<Link>, LedgerError>;

    fn get_record(&self, hash: &ActionHash) -> Result<Option<Record>, LedgerError>;
}
