//! View replication.
//!
//! Gossip and peer discovery belong to the network layer; this module only
//! provides the merge step: export everything a view holds, import it into
//! another view. Imports insert unknown rows and never remove anything, so
//! repeated or partial syncs only ever grow a view.

use crate::core::action::{ActionHashed, Entry, Link};
use crate::core::error::LedgerError;
use crate::core::hash::ActionHash;
use crate::core::ledger::{self, insert_action, insert_entry, insert_link};
use crate::core::store::Store;
use rusqlite::params;
use serde::Serialize;
use std::ops::AddAssign;

/// An action as stored: the hash it is filed under plus its encoded bytes.
#[derive(Debug, Clone)]
pub struct StoredAction {
    pub hash: ActionHash,
    pub body: Vec<u8>,
}

/// Everything one view holds at export time.
///
/// Fields are public so callers can replicate a subset, e.g. links whose
/// target actions have not arrived yet.
#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    pub entries: Vec<Entry>,
    pub actions: Vec<StoredAction>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub entries_added: usize,
    pub actions_added: usize,
    pub links_added: usize,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.entries_added == 0 && self.actions_added == 0 && self.links_added == 0
    }
}

impl AddAssign for SyncReport {
    fn add_assign(&mut self, rhs: Self) {
        self.entries_added += rhs.entries_added;
        self.actions_added += rhs.actions_added;
        self.links_added += rhs.links_added;
    }
}

impl Store {
    pub fn export_view(&self) -> Result<ViewSnapshot, LedgerError> {
        self.broker()
            .with_conn(&self.db_path(), &self.actor(), "sync.export", |conn| {
                let mut snapshot = ViewSnapshot::default();

                let mut stmt = conn.prepare("SELECT bytes FROM entries ORDER BY entry_hash")?;
                let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
                for r in rows {
                    snapshot.entries.push(Entry(r?));
                }

                let mut stmt = conn
                    .prepare("SELECT action_hash, body FROM actions ORDER BY author, action_seq")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?;
                for r in rows {
                    let (hash, body) = r?;
                    snapshot.actions.push(StoredAction {
                        hash: hash.parse()?,
                        body,
                    });
                }

                let mut stmt = conn.prepare(
                    "SELECT link_hash, base, target, tag, author, ts FROM links ORDER BY ts",
                )?;
                let rows = stmt.query_map([], ledger::link_row)?;
                for r in rows {
                    snapshot.links.push(ledger::parse_link_row(r?)?);
                }

                Ok(snapshot)
            })
    }

    /// Merge a snapshot into this view. Every action and link is hash-checked
    /// before anything is written; a single bad row rejects the whole import.
    pub fn import_view(&self, snapshot: &ViewSnapshot) -> Result<SyncReport, LedgerError> {
        let mut verified: Vec<(ActionHashed, &[u8])> = Vec::with_capacity(snapshot.actions.len());
        for stored in &snapshot.actions {
            verified.push((
                ActionHashed::from_stored(stored.hash, &stored.body)?,
                &stored.body,
            ));
        }
        for link in &snapshot.links {
            if !link.verify()? {
                return Err(LedgerError::MalformedPayload(format!(
                    "incoming link {} fails its hash check",
                    link.hash
                )));
            }
        }

        self.broker()
            .with_conn(&self.db_path(), &self.actor(), "sync.import", |conn| {
                let tx = conn.unchecked_transaction()?;
                let mut report = SyncReport::default();
                for entry in &snapshot.entries {
                    let known: bool = tx.query_row(
                        "SELECT EXISTS(SELECT 1 FROM entries WHERE entry_hash = ?1)",
                        params![entry.hash().to_hex()],
                        |row| row.get(0),
                    )?;
                    if !known {
                        insert_entry(&tx, entry)?;
                        report.entries_added += 1;
                    }
                }
                for (hashed, body) in &verified {
                    if insert_action(&tx, hashed, body)? {
                        report.actions_added += 1;
                    }
                }
                for link in &snapshot.links {
                    if insert_link(&tx, link)? {
                        report.links_added += 1;
                    }
                }
                tx.commit()?;
                Ok(report)
            })
    }

    /// Two-way exchange with one peer view.
    pub fn sync_with(&self, peer: &Store) -> Result<SyncReport, LedgerError> {
        sync_views(&[self, peer])
    }
}

/// Bring every view up to the union of all of them. This is the barrier
/// scenario tests wait on before reading from another agent's view.
pub fn sync_views(stores: &[&Store]) -> Result<SyncReport, LedgerError> {
    let snapshots = stores
        .iter()
        .map(|s| s.export_view())
        .collect::<Result<Vec<_>, _>>()?;

    let mut report = SyncReport::default();
    for (i, store) in stores.iter().enumerate() {
        for (j, snapshot) in snapshots.iter().enumerate() {
            if i != j {
                report += store.import_view(snapshot)?;
            }
        }
    }
    Ok(report)
}
