use crate::core::broker::DbBroker;
use crate::core::error;
use crate::core::schemas;
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, error::LedgerError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::LedgerError::StoreUnavailable)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::LedgerError::StoreUnavailable)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::LedgerError::StoreUnavailable)?;
    Ok(conn)
}

pub fn ledger_db_path(root: &Path) -> PathBuf {
    root.join(schemas::LEDGER_DB_NAME)
}

/// Create the ledger database under `root` if missing. Safe to call on an
/// already-initialized view.
pub fn initialize_ledger_db(root: &Path) -> Result<PathBuf, error::LedgerError> {
    let db_path = ledger_db_path(root);
    fs::create_dir_all(root).map_err(error::LedgerError::IoError)?;

    let broker = DbBroker::new(root);
    broker.with_conn(&db_path, "clrvote", "ledger.init", |conn| {
        for stmt in schemas::LEDGER_DB_SCHEMAS {
            conn.execute(stmt, [])?;
        }
        conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES('schema_version', ?1)",
            params![schemas::LEDGER_SCHEMA_VERSION],
        )?;
        Ok(())
    })?;

    Ok(db_path)
}
