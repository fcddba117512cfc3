//! Database schema definitions for the ledger view.
//!
//! One SQLite file per local view. Actions and entries are append-only
//! content-addressed tables; links are a secondary index keyed by
//! (base, tag). Nothing is ever updated or deleted in place.

pub const LEDGER_DB_NAME: &str = "ledger.db";

pub const LEDGER_DB_SCHEMA_ENTRIES: &str = "
    CREATE TABLE IF NOT EXISTS entries (
        entry_hash TEXT PRIMARY KEY,
        bytes BLOB NOT NULL
    )
";

pub const LEDGER_DB_SCHEMA_ACTIONS: &str = "
    CREATE TABLE IF NOT EXISTS actions (
        action_hash TEXT PRIMARY KEY,
        author TEXT NOT NULL,
        action_seq INTEGER NOT NULL,
        ts INTEGER NOT NULL,
        action_type TEXT NOT NULL,
        entry_type TEXT,
        entry_hash TEXT,
        original_action TEXT,
        body BLOB NOT NULL
    )
";
pub const LEDGER_DB_SCHEMA_ACTIONS_AUTHOR_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_actions_author_seq ON actions(author, action_seq)";

pub const LEDGER_DB_SCHEMA_LINKS: &str = "
    CREATE TABLE IF NOT EXISTS links (
        link_hash TEXT PRIMARY KEY,
        base TEXT NOT NULL,
        target TEXT NOT NULL,
        tag TEXT NOT NULL,
        author TEXT NOT NULL,
        ts INTEGER NOT NULL
    )
";
pub const LEDGER_DB_SCHEMA_LINKS_BASE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_links_base_tag ON links(base, tag)";
pub const LEDGER_DB_SCHEMA_LINKS_AUTHOR_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_links_author_ts ON links(author, ts)";

pub const LEDGER_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const LEDGER_SCHEMA_VERSION: &str = "1";

/// All ledger statements, in creation order.
pub const LEDGER_DB_SCHEMAS: &[&str] = &[
    LEDGER_DB_SCHEMA_ENTRIES,
    LEDGER_DB_SCHEMA_ACTIONS,
    LEDGER_DB_SCHEMA_ACTIONS_AUTHOR_INDEX,
    LEDGER_DB_SCHEMA_LINKS,
    LEDGER_DB_SCHEMA_LINKS_BASE_INDEX,
    LEDGER_DB_SCHEMA_LINKS_AUTHOR_INDEX,
    LEDGER_DB_SCHEMA_META,
];
