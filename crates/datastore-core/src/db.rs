//! SQLite storage handle.
//!
//! [`Database`] owns the single `rusqlite::Connection` the service uses for
//! its whole lifetime. It is opened once at startup and released either by
//! [`Database::close`] or on drop. Every public store operation runs its
//! statements through [`Database::transaction`] so they commit as a unit.

use std::path::Path;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// Owned handle to the backing SQLite database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database described by `config` and apply pragmas.
    ///
    /// Does not touch the schema; see [`crate::SchemaManager`].
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let path = config.path.as_path();
        if config.create_parent {
            ensure_parent_dir(path)?;
        }
        info!(path = %path.display(), "opening database");

        let conn = Connection::open(path)?;
        Self::apply_pragmas(&conn, config)?;

        Ok(Self { conn })
    }

    /// Create an in-memory database, useful for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        debug!("opening in-memory database");

        let conn = Connection::open_in_memory()?;
        Self::apply_pragmas(&conn, &StoreConfig::default())?;

        Ok(Self { conn })
    }

    /// Borrow the underlying connection for single statements.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside one immediate transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise. Immediate mode
    /// takes the write lock up front, so contention with another writer
    /// surfaces as [`crate::StoreError::Busy`] once the busy timeout expires.
    pub fn transaction<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                warn!(%err, "statement failed, rolling back");
                let _ = tx.rollback();
                Err(err)
            }
        }
    }

    /// Release the connection, reporting any error SQLite raises on close.
    pub fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, err)| StoreError::from(err))?;
        info!("database closed");
        Ok(())
    }

    // ── pragmas ──────────────────────────────────────────────────────

    fn apply_pragmas(conn: &Connection, config: &StoreConfig) -> StoreResult<()> {
        // WAL lets readers from other processes proceed while we write.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        // Bounded wait on locks held by external writers.
        conn.busy_timeout(config.busy_timeout)?;

        debug!(
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "database pragmas applied"
        );
        Ok(())
    }
}

/// Create the directory containing `path` if it does not exist yet.
///
/// New directories get mode `0755` on Unix.
pub fn ensure_parent_dir(path: &Path) -> StoreResult<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(parent)?;

    info!(dir = %parent.display(), "created data store directory");
    Ok(())
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn open_in_memory_works() {
        let db = Database::open_in_memory().unwrap();
        let version: String = db
            .conn()
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .unwrap();
        assert!(!version.is_empty());
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile").join("ds").join("data-store.db");
        let config = StoreConfig::new().with_path(&path);

        let db = Database::open(&config).unwrap();
        db.close().unwrap();

        assert!(path.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(path.parent().unwrap())
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o700, 0o700);
            assert_eq!(mode & 0o022, 0);
        }
    }

    #[test]
    fn open_without_parent_creation_fails_on_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new()
            .with_path(dir.path().join("missing").join("data-store.db"))
            .with_create_parent(false);

        assert!(Database::open(&config).is_err());
    }

    #[test]
    fn transaction_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        db.conn().execute_batch("CREATE TABLE t (x INTEGER)").unwrap();

        db.transaction(|tx| {
            tx.execute("INSERT INTO t (x) VALUES (1)", [])?;
            Ok(())
        })
        .unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT count(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn transaction_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        db.conn().execute_batch("CREATE TABLE t (x INTEGER)").unwrap();

        let result: StoreResult<()> = db.transaction(|tx| {
            tx.execute("INSERT INTO t (x) VALUES (1)", [])?;
            Err(StoreError::NotFound { uid: 1 })
        });
        assert!(matches!(result, Err(StoreError::NotFound { uid: 1 })));

        let count: i64 = db
            .conn()
            .query_row("SELECT count(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
