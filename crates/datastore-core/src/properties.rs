//! Property rows: per-object string key/value pairs.
//!
//! A `(objid, key)` pair holds at most one value. Writing an empty value
//! removes the row instead of storing an empty string. Keys in
//! [`RESERVED_KEYS`] belong to the store and are refused before anything is
//! written.

use std::collections::BTreeMap;

use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::Uid;
use crate::codec::DataValue;
use crate::error::{StoreError, StoreResult};
use crate::objects::ObjectStore;

/// Keys applications may never set.
pub const RESERVED_KEYS: &[&str] = &["uid", "objid", "data", "created", "modified"];

/// Key synthesised into every [`PropertyStore::get_properties`] result.
pub const UID_KEY: &str = "uid";

/// Property input: key to value in any accepted shape.
pub type Properties = BTreeMap<String, DataValue>;

/// Property output: key to decoded text value.
pub type PropertyMap = BTreeMap<String, String>;

/// Whether `key` is managed by the store.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Refuse reserved keys and normalise every value to text.
///
/// Runs over the whole input before any row is touched, so a bad key or
/// value anywhere rejects the entire call.
pub fn validate(props: &Properties) -> StoreResult<Vec<(String, String)>> {
    if let Some(key) = props.keys().find(|key| is_reserved(key)) {
        return Err(StoreError::ReservedKey { key: key.clone() });
    }
    props
        .iter()
        .map(|(key, value)| Ok((key.clone(), value.encode_text()?)))
        .collect()
}

/// Statements against the `properties` table.
pub struct PropertyStore<'c> {
    conn: &'c Connection,
}

impl<'c> PropertyStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert the initial properties of a freshly created object.
    ///
    /// Empty values are skipped; there is no "present but empty" state.
    pub fn insert_all(&self, objid: Uid, pairs: &[(String, String)]) -> StoreResult<()> {
        let mut stmt = self
            .conn
            .prepare("INSERT INTO properties (objid, key, value) VALUES (?1, ?2, ?3)")?;
        for (key, value) in pairs.iter().filter(|(_, value)| !value.is_empty()) {
            stmt.execute(rusqlite::params![objid, key, value])?;
        }
        Ok(())
    }

    /// Set, overwrite or (for empty values) delete properties of `objid`.
    ///
    /// The object must exist. Validation is all-or-nothing; after it passes
    /// each pair is applied on its own, so a storage failure midway leaves
    /// the earlier pairs applied.
    pub fn set_properties(&self, objid: Uid, props: &Properties) -> StoreResult<()> {
        ObjectStore::new(self.conn).get(objid)?;
        let pairs = validate(props)?;
        for (key, value) in &pairs {
            self.apply(objid, key, value)?;
        }
        Ok(())
    }

    /// Apply one already validated pair.
    pub fn apply(&self, objid: Uid, key: &str, value: &str) -> StoreResult<()> {
        if value.is_empty() {
            let removed = self.conn.execute(
                "DELETE FROM properties WHERE objid = ?1 AND key = ?2",
                rusqlite::params![objid, key],
            )?;
            debug!(objid, key, removed, "property cleared");
            return Ok(());
        }

        let present = self
            .conn
            .query_row(
                "SELECT objid FROM properties WHERE objid = ?1 AND key = ?2",
                rusqlite::params![objid, key],
                |row| row.get::<_, Uid>(0),
            )
            .optional()?
            .is_some();

        if present {
            self.conn.execute(
                "UPDATE properties SET value = ?1 WHERE objid = ?2 AND key = ?3",
                rusqlite::params![value, objid, key],
            )?;
        } else {
            self.conn.execute(
                "INSERT INTO properties (objid, key, value) VALUES (?1, ?2, ?3)",
                rusqlite::params![objid, key, value],
            )?;
        }
        debug!(objid, key, updated = present, "property set");
        Ok(())
    }

    /// Properties of `objid`, all of them when `keys` is empty.
    ///
    /// The object must exist. The result always carries a `uid` entry equal
    /// to `objid`, whatever is stored under that key.
    pub fn get_properties(&self, objid: Uid, keys: &[String]) -> StoreResult<PropertyMap> {
        ObjectStore::new(self.conn).get(objid)?;

        let mut sql = String::from("SELECT key, value FROM properties WHERE objid = ?1");
        let mut params: Vec<Value> = vec![Value::Integer(objid)];
        if !keys.is_empty() {
            let placeholders = (0..keys.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" AND key IN ({placeholders})"));
            params.extend(keys.iter().cloned().map(Value::Text));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                Ok((text_of(row.get_ref(0)?), text_of(row.get_ref(1)?)))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut props: PropertyMap = rows
            .into_iter()
            .filter_map(|(key, value)| Some((key?, value.unwrap_or_default())))
            .collect();
        props.insert(UID_KEY.to_string(), objid.to_string());
        Ok(props)
    }

    /// Remove every property row of `objid`. Returns the number removed.
    pub fn delete_all(&self, objid: Uid) -> StoreResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM properties WHERE objid = ?1", [objid])?;
        Ok(removed)
    }

    /// Number of property rows.
    pub fn count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM properties", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Decode a stored cell as text; `None` for NULL.
fn text_of(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Null => None,
    }
}

// ── tests ────────────────────────────────────────────────────────────
