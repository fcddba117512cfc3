//! SQLite-backed implementation of [`RecordStore`].
//!
//! Each commit runs inside one transaction behind the broker lock: read the
//! author's chain head, build the next action, hash it and append it. Rows
//! are only ever inserted.

use crate::core::action::{Action, ActionHashed, ActionKind, Entry, Link, Record};
use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error::LedgerError;
use crate::core::hash::{ActionHash, AgentPubKey, EntryHash, LinkHash};
use crate::core::store::{LinkFrom, RecordStore, Store};
use crate::core::time::Timestamp;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

impl Store {
    /// Open (and initialize if needed) the ledger view rooted at `root`.
    pub fn open(root: &Path, agent: AgentPubKey) -> Result<Self, LedgerError> {
        db::initialize_ledger_db(root)?;
        Ok(Store {
            root: root.to_path_buf(),
            agent,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        db::ledger_db_path(&self.root)
    }

    pub(crate) fn actor(&self) -> String {
        self.agent.to_hex()
    }

    pub(crate) fn broker(&self) -> DbBroker {
        DbBroker::new(&self.root)
    }

    /// This agent's actions in chain order.
    pub fn source_chain(&self) -> Result<Vec<ActionHashed>, LedgerError> {
        self.author_chain(&self.agent)
    }

    /// Any author's actions as known to this view, in chain order.
    pub fn author_chain(&self, author: &AgentPubKey) -> Result<Vec<ActionHashed>, LedgerError> {
        let author_hex = author.to_hex();
        self.broker()
            .with_conn(&self.db_path(), &self.actor(), "ledger.source_chain", |conn| {
                let mut stmt = conn.prepare(
                    "SELECT action_hash, body FROM actions WHERE author = ?1 ORDER BY action_seq ASC",
                )?;
                let rows = stmt.query_map(params![author_hex], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?;
                let mut out = Vec::new();
                for r in rows {
                    let (hash, body) = r?;
                    out.push(ActionHashed::from_stored(hash.parse()?, &body)?);
                }
                Ok(out)
            })
    }
}

impl RecordStore for Store {
    fn agent(&self) -> &AgentPubKey {
        &self.agent
    }

    fn commit_entry(
        &self,
        entry_type: &str,
        entry: Entry,
    ) -> Result<(ActionHash, EntryHash), LedgerError> {
        let author = self.agent;
        self.broker()
            .with_conn(&self.db_path(), &self.actor(), "ledger.commit_entry", |conn| {
                let tx = conn.unchecked_transaction()?;
                let entry_hash = insert_entry(&tx, &entry)?;
                let hashed = append_action(
                    &tx,
                    &author,
                    ActionKind::Create {
                        entry_type: entry_type.to_string(),
                        entry_hash,
                    },
                )?;
                tx.commit()?;
                Ok((hashed.hash, entry_hash))
            })
    }

    fn commit_update(
        &self,
        previous: &ActionHash,
        entry_type: &str,
        entry: Entry,
        links: &[LinkFrom<'_>],
    ) -> Result<ActionHash, LedgerError> {
        let author = self.agent;
        self.broker()
            .with_conn(&self.db_path(), &self.actor(), "ledger.commit_update", |conn| {
                let tx = conn.unchecked_transaction()?;
                let prev = load_action(&tx, previous)?.ok_or_else(|| {
                    LedgerError::InvalidChainReference(format!(
                        "previous action {} is not in the local view",
                        previous
                    ))
                })?;
                let original_action = prev.action.origin(&prev.hash).ok_or_else(|| {
                    LedgerError::InvalidChainReference(format!(
                        "cannot update {}: it is a Delete action",
                        previous
                    ))
                })?;
                if prev.action.entry_type() != Some(entry_type) {
                    return Err(LedgerError::InvalidChainReference(format!(
                        "cannot update {} entry {} with a {} entry",
                        prev.action.entry_type().unwrap_or("?"),
                        previous,
                        entry_type
                    )));
                }
                let entry_hash = insert_entry(&tx, &entry)?;
                let hashed = append_action(
                    &tx,
                    &author,
                    ActionKind::Update {
                        entry_type: entry_type.to_string(),
                        entry_hash,
                        original_action,
                        previous_action: *previous,
                    },
                )?;
                append_links(&tx, &author, &hashed.hash, links)?;
                tx.commit()?;
                Ok(hashed.hash)
            })
    }

    fn commit_delete(
        &self,
        target: &ActionHash,
        links: &[LinkFrom<'_>],
    ) -> Result<ActionHash, LedgerError> {
        let author = self.agent;
        self.broker()
            .with_conn(&self.db_path(), &self.actor(), "ledger.commit_delete", |conn| {
                let tx = conn.unchecked_transaction()?;
                let deleted = load_action(&tx, target)?.ok_or_else(|| {
                    LedgerError::InvalidChainReference(format!(
                        "delete target {} is not in the local view",
                        target
                    ))
                })?;
                let deletes_entry_address = *deleted.action.entry_hash().ok_or_else(|| {
                    LedgerError::InvalidChainReference(format!(
                        "cannot delete {}: it is itself a Delete action",
                        target
                    ))
                })?;
                let hashed = append_action(
                    &tx,
                    &author,
                    ActionKind::Delete {
                        deletes_address: *target,
                        deletes_entry_address,
                    },
                )?;
                append_links(&tx, &author, &hashed.hash, links)?;
                tx.commit()?;
                Ok(hashed.hash)
            })
    }

    fn create_link(
        &self,
        base: &ActionHash,
        target: &ActionHash,
        tag: &str,
    ) -> Result<LinkHash, LedgerError> {
        let author = self.agent;
        self.broker()
            .with_conn(&self.db_path(), &self.actor(), "ledger.create_link", |conn| {
                let tx = conn.unchecked_transaction()?;
                let ts = Timestamp::now_after(last_author_timestamp(&tx, &author)?);
                let link = Link::new(*base, *target, tag, author, ts)?;
                insert_link(&tx, &link)?;
                tx.commit()?;
                Ok(link.hash)
            })
    }

    fn get_links(&self, base: &ActionHash, tag: &str) -> Result<Vec<Link>, LedgerError> {
        let base_hex = base.to_hex();
        self.broker()
            .with_conn(&self.db_path(), &self.actor(), "ledger.get_links", |conn| {
                let mut stmt = conn.prepare(
                    "SELECT link_hash, base, target, tag, author, ts FROM links
                     WHERE base = ?1 AND tag = ?2",
                )?;
                let rows = stmt.query_map(params![base_hex, tag], link_row)?;
                let mut links = Vec::new();
                for r in rows {
                    links.push(parse_link_row(r?)?);
                }
                Ok(links)
            })
    }

    fn get_record(&self, hash: &ActionHash) -> Result<Option<Record>, LedgerError> {
        self.broker()
            .with_conn(&self.db_path(), &self.actor(), "ledger.get_record", |conn| {
                let Some(signed_action) = load_action(conn, hash)? else {
                    return Ok(None);
                };
                let entry = match signed_action.action.entry_hash() {
                    Some(entry_hash) => load_entry(conn, entry_hash)?,
                    None => None,
                };
                Ok(Some(Record {
                    signed_action,
                    entry,
                }))
            })
    }
}

/// Build the author's next action on top of their current chain head and
/// append it.
fn append_action(
    conn: &Connection,
    author: &AgentPubKey,
    kind: ActionKind,
) -> Result<ActionHashed, LedgerError> {
    let head: Option<(String, u32)> = conn
        .query_row(
            "SELECT action_hash, action_seq FROM actions WHERE author = ?1
             ORDER BY action_seq DESC LIMIT 1",
            params![author.to_hex()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (prev_action, action_seq) = match head {
        Some((hash, seq)) => (Some(hash.parse::<ActionHash>()?), seq + 1),
        None => (None, 0),
    };
    let action = Action {
        author: *author,
        timestamp: Timestamp::now_after(last_author_timestamp(conn, author)?),
        action_seq,
        prev_action,
        kind,
    };
    let (hashed, bytes) = action.into_hashed()?;
    insert_action(conn, &hashed, &bytes)?;
    Ok(hashed)
}

/// Link `target` from each base, on the author's clock after the action.
fn append_links(
    conn: &Connection,
    author: &AgentPubKey,
    target: &ActionHash,
    links: &[LinkFrom<'_>],
) -> Result<(), LedgerError> {
    for pending in links {
        let ts = Timestamp::now_after(last_author_timestamp(conn, author)?);
        let link = Link::new(pending.base, *target, pending.tag, *author, ts)?;
        insert_link(conn, &link)?;
    }
    Ok(())
}

/// Latest timestamp this author has used for either an action or a link.
fn last_author_timestamp(
    conn: &Connection,
    author: &AgentPubKey,
) -> Result<Option<Timestamp>, LedgerError> {
    let ts: Option<i64> = conn.query_row(
        "SELECT MAX(ts) FROM (
             SELECT ts FROM actions WHERE author = ?1
             UNION ALL
             SELECT ts FROM links WHERE author = ?1
         )",
        params![author.to_hex()],
        |row| row.get(0),
    )?;
    Ok(ts.map(Timestamp))
}

pub(crate) fn insert_entry(conn: &Connection, entry: &Entry) -> Result<EntryHash, LedgerError> {
    let hash = entry.hash();
    conn.execute(
        "INSERT OR IGNORE INTO entries(entry_hash, bytes) VALUES(?1, ?2)",
        params![hash.to_hex(), entry.as_bytes()],
    )?;
    Ok(hash)
}

/// Returns true when the row was new to this view.
pub(crate) fn insert_action(
    conn: &Connection,
    hashed: &ActionHashed,
    bytes: &[u8],
) -> Result<bool, LedgerError> {
    let action = &hashed.action;
    let original = action.origin(&hashed.hash).map(|h| h.to_hex());
    let changed = conn.execute(
        "INSERT OR IGNORE INTO actions(action_hash, author, action_seq, ts, action_type,
                                       entry_type, entry_hash, original_action, body)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            hashed.hash.to_hex(),
            action.author.to_hex(),
            action.action_seq,
            action.timestamp.as_micros(),
            action.type_name(),
            action.entry_type(),
            action.entry_hash().map(|h| h.to_hex()),
            original,
            bytes
        ],
    )?;
    Ok(changed > 0)
}

pub(crate) fn insert_link(conn: &Connection, link: &Link) -> Result<bool, LedgerError> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO links(link_hash, base, target, tag, author, ts)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            link.hash.to_hex(),
            link.base.to_hex(),
            link.target.to_hex(),
            link.tag,
            link.author.to_hex(),
            link.timestamp.as_micros()
        ],
    )?;
    Ok(changed > 0)
}

pub(crate) fn load_action(
    conn: &Connection,
    hash: &ActionHash,
) -> Result<Option<ActionHashed>, LedgerError> {
    let body: Option<Vec<u8>> = conn
        .query_row(
            "SELECT body FROM actions WHERE action_hash = ?1",
            params![hash.to_hex()],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|b| ActionHashed::from_stored(*hash, &b))
        .transpose()
}

pub(crate) fn load_entry(
    conn: &Connection,
    hash: &EntryHash,
) -> Result<Option<Entry>, LedgerError> {
    let bytes: Option<Vec<u8>> = conn
        .query_row(
            "SELECT bytes FROM entries WHERE entry_hash = ?1",
            params![hash.to_hex()],
            |row| row.get(0),
        )
        .optional()?;
    match bytes {
        Some(b) => {
            let entry = Entry(b);
            if entry.hash() != *hash {
                return Err(LedgerError::MalformedPayload(format!(
                    "stored entry {} fails its hash check",
                    hash
                )));
            }
            Ok(Some(entry))
        }
        None => Ok(None),
    }
}

pub(crate) type LinkRow = (String, String, String, String, String, i64);

pub(crate) fn link_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LinkRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

pub(crate) fn parse_link_row(row: LinkRow) -> Result<Link, LedgerError> {
    let (hash, base, target, tag, author, ts) = row;
    let link = Link {
        hash: hash.parse()?,
        base: base.parse()?,
        target: target.parse()?,
        tag,
        author: author.parse()?,
        timestamp: Timestamp(ts),
    };
    if !link.verify()? {
        return Err(LedgerError::MalformedPayload(format!(
            "stored link {} fails its hash check",
            link.hash
        )));
    }
    Ok(link)
}
