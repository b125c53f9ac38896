//! Object rows: the uid-to-blob mapping.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::Uid;
use crate::codec::DataValue;
use crate::error::{StoreError, StoreResult};

/// Statements against the `objects` table.
///
/// Borrows a connection (or an open transaction, via deref) so the façade
/// decides what commits together.
pub struct ObjectStore<'c> {
    conn: &'c Connection,
}

impl<'c> ObjectStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Whether an object row exists for `uid`.
    pub fn exists(&self, uid: Uid) -> StoreResult<bool> {
        let found = self
            .conn
            .query_row("SELECT uid FROM objects WHERE uid = ?1", [uid], |row| {
                row.get::<_, Uid>(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Return `uid` if the object exists, [`StoreError::NotFound`] otherwise.
    pub fn get(&self, uid: Uid) -> StoreResult<Uid> {
        if self.exists(uid)? {
            Ok(uid)
        } else {
            Err(StoreError::NotFound { uid })
        }
    }

    /// Insert a new object and return its freshly assigned uid.
    pub fn create(&self, data: &DataValue) -> StoreResult<Uid> {
        self.conn.execute(
            "INSERT INTO objects (uid, data) VALUES (NULL, ?1)",
            [data.encode()],
        )?;
        let uid = self.conn.last_insert_rowid();
        debug!(uid, "object row inserted");
        Ok(uid)
    }

    /// Overwrite the blob of an existing object.
    pub fn set_data(&self, uid: Uid, data: &DataValue) -> StoreResult<()> {
        let updated = self.conn.execute(
            "UPDATE objects SET data = ?1 WHERE uid = ?2",
            rusqlite::params![data.encode(), uid],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound { uid });
        }
        debug!(uid, "object data updated");
        Ok(())
    }

    /// Fetch the stored blob.
    pub fn get_data(&self, uid: Uid) -> StoreResult<Vec<u8>> {
        self.conn
            .query_row("SELECT data FROM objects WHERE uid = ?1", [uid], |row| {
                // Rows written by other tools may hold text or NULL.
                Ok(match row.get_ref(0)? {
                    ValueRef::Blob(bytes) | ValueRef::Text(bytes) => bytes.to_vec(),
                    ValueRef::Integer(n) => n.to_string().into_bytes(),
                    ValueRef::Real(f) => f.to_string().into_bytes(),
                    ValueRef::Null => Vec::new(),
                })
            })
            .optional()?
            .ok_or(StoreError::NotFound { uid })
    }

    /// Remove the object row. Returns whether a row was removed.
    pub fn delete(&self, uid: Uid) -> StoreResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM objects WHERE uid = ?1", [uid])?;
        Ok(deleted > 0)
    }

    /// Number of object rows.
    pub fn count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM objects", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

// ── tests ────────────────────────────────────────────────────────────
