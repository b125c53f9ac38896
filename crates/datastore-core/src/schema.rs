//! Schema lifecycle.
//!
//! There is no versioning: the store either has its two tables and the
//! `objid` index, or it creates whichever of them are missing. Statements
//! are static SQL run inside one immediate transaction, so a crash halfway
//! leaves nothing behind and a second run is a no-op.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

/// A structure the store expects to find in `sqlite_master`.
struct SchemaObject {
    /// `table` or `index`.
    kind: &'static str,
    name: &'static str,
    sql: &'static str,
}

/// Everything the store needs, in creation order.
static SCHEMA: &[SchemaObject] = &[
    SchemaObject {
        kind: "table",
        name: "objects",
        // AUTOINCREMENT keeps uids from being reused after deletes.
        sql: "CREATE TABLE IF NOT EXISTS objects (
                uid  INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                data BLOB
            )",
    },
    SchemaObject {
        kind: "table",
        name: "properties",
        sql: "CREATE TABLE IF NOT EXISTS properties (
                objid INTEGER NOT NULL,
                key   VARCHAR(100),
                value VARCHAR(200)
            )",
    },
    SchemaObject {
        kind: "index",
        name: "objid_idx",
        sql: "CREATE INDEX IF NOT EXISTS objid_idx ON properties(objid)",
    },
];

/// Ensures the on-disk schema exists.
pub struct SchemaManager<'a> {
    db: &'a Database,
}

impl<'a> SchemaManager<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Whether every expected table and index already exists.
    pub fn is_present(&self) -> StoreResult<bool> {
        Ok(missing(self.db.conn())?.is_empty())
    }

    /// Create any missing structures. Idempotent.
    ///
    /// Every failure, including a locked or read-only file, is reported as
    /// [`StoreError::SchemaInit`]; callers treat it as fatal.
    pub fn ensure_schema(&self) -> StoreResult<()> {
        let absent = missing(self.db.conn()).map_err(schema_err)?;
        if absent.is_empty() {
            debug!("data store schema is present");
            return Ok(());
        }

        info!(missing = ?absent, "creating data store schema");
        self.db
            .transaction(|tx| {
                for object in SCHEMA {
                    tx.execute_batch(object.sql)?;
                }
                Ok(())
            })
            .map_err(|err| {
                warn!(%err, "could not create data store schema");
                schema_err(err)
            })?;

        info!("data store schema created");
        Ok(())
    }
}

/// Names of the expected structures not yet in `sqlite_master`.
fn missing(conn: &Connection) -> StoreResult<Vec<&'static str>> {
    let mut stmt = conn.prepare("SELECT count(*) FROM sqlite_master WHERE type = ?1 AND name = ?2")?;
    let mut absent = Vec::new();
    for object in SCHEMA {
        let count: i64 =
            stmt.query_row(rusqlite::params![object.kind, object.name], |row| row.get(0))?;
        if count == 0 {
            absent.push(object.name);
        }
    }
    Ok(absent)
}

fn schema_err(err: StoreError) -> StoreError {
    match err {
        StoreError::SchemaInit { .. } => err,
        other => StoreError::SchemaInit {
            message: other.to_string(),
        },
    }
}

// ── tests ────────────────────────────────────────────────────────────
