//! Property queries.
//!
//! A find filter matches a property row when the row equals **any** of the
//! filter's `(key, value)` pairs: the pairs are OR-ed, not AND-ed. Given an
//! object with `title=Foo` and another with `author=Bar`, the filter
//! `{title: Foo, author: Bar}` returns both.
//!
//! Results are drawn from the property table. An empty filter returns every
//! objid that has at least one property; objects with no properties never
//! appear. Property rows are not checked against the object table.

use std::collections::BTreeSet;

use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::debug;

use crate::Uid;
use crate::error::{StoreError, StoreResult};
use crate::properties::Properties;

/// Resolves find filters to objids.
pub struct QueryEngine<'c> {
    conn: &'c Connection,
}

impl<'c> QueryEngine<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Distinct objids of property rows matching any pair in `filter`.
    ///
    /// A blank value anywhere in the filter is an
    /// [`StoreError::InvalidQuery`], reported before the database is read.
    pub fn find(&self, filter: &Properties) -> StoreResult<BTreeSet<Uid>> {
        let (sql, params) = build_query(filter)?;
        debug!(%sql, terms = filter.len(), "running find");

        let mut stmt = self.conn.prepare(&sql)?;
        let uids = stmt
            .query_map(rusqlite::params_from_iter(params), |row| row.get::<_, Uid>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(uids)
    }
}

/// Build the statement and its bound values for `filter`.
fn build_query(filter: &Properties) -> StoreResult<(String, Vec<Value>)> {
    let mut terms = Vec::with_capacity(filter.len());
    let mut params = Vec::with_capacity(filter.len() * 2);

    for (key, value) in filter {
        let value = value.encode_text()?;
        if value.is_empty() {
            return Err(StoreError::InvalidQuery { key: key.clone() });
        }
        let n = params.len();
        terms.push(format!("(key = ?{} AND value = ?{})", n + 1, n + 2));
        params.push(Value::Text(key.clone()));
        params.push(Value::Text(value));
    }

    let mut sql = String::from("SELECT DISTINCT objid FROM properties");
    if !terms.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&terms.join(" OR "));
    }
    Ok((sql, params))
}

// ── tests ────────────────────────────────────────────────────────────
