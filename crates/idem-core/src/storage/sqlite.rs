use rusqlite::{Connection, Result};
use std::path::Path;
use tracing::{debug, warn};

const SCHEMA_VERSION: i64 = 2;

/// Owned handle to the index database. Opened once per run and handed by
/// reference to everything that reads or writes the index; the connection
/// closes when the handle is dropped.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.create_schema()?;
        debug!("Opened index database {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.create_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL, synchronous=NORMAL, foreign keys)");
        Ok(())
    }

    /// Idempotent: every statement is create-if-absent, so this runs on each open.
    fn create_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            warn!(
                "Index schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            );
        }

        self.with_transaction(|db| db.conn.execute_batch(include_str!("schema.sql")))?;
        debug!("SQLite schema initialized (version {})", SCHEMA_VERSION);
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ── Transactions ─────────────────────────────────────────────

    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")
    }

    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")
    }

    pub fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Run `f` inside `BEGIN … COMMIT`, rolling back if it fails.
    pub fn with_transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Self) -> std::result::Result<T, E>,
        E: From<rusqlite::Error>,
    {
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Rows changed by every INSERT/UPDATE/DELETE since the connection was opened.
    pub fn total_changes(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT total_changes()", [], |row| row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_schema() {
        let db = Database::open_in_memory().unwrap();
        let tables: Vec<String> = db
            .connection()
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(tables, vec!["dirs", "files", "hashes", "scan_pass"]);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("index.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_directory("/data").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert!(db.get_directory("/data").unwrap().is_some());

        let journal: String = db
            .connection()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal, "wal");
    }

    #[test]
    fn test_with_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: std::result::Result<(), rusqlite::Error> = db.with_transaction(|db| {
            db.insert_directory("/rolled/back")?;
            Err(rusqlite::Error::QueryReturnedNoRows)
        });
        assert!(result.is_err());
        assert!(!db.in_transaction());
        assert!(db.get_directory("/rolled/back").unwrap().is_none());
    }
}
