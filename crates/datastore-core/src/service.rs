//! The data store façade.
//!
//! [`DataStore`] owns the storage handle and the notification sink and
//! exposes the public contract: `get`, `create`, `delete`, `find`,
//! `get_data`, `set_data`, `get_properties`, `set_properties`. Every call is
//! synchronous; it runs its statements, commits, and (for mutations) notifies
//! the sink before returning. Requests are expected one at a time from a
//! single dispatcher.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::Uid;
use crate::codec::DataValue;
use crate::config::StoreConfig;
use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::notify::{EventSink, NullSink, UpdateEvent};
use crate::objects::ObjectStore;
use crate::properties::{self, Properties, PropertyMap, PropertyStore};
use crate::query::QueryEngine;
use crate::schema::SchemaManager;

/// Row counts, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub objects: u64,
    pub properties: u64,
}

/// Object/property store with change notifications.
pub struct DataStore<S: EventSink = NullSink> {
    db: Database,
    sink: S,
}

impl<S: EventSink> DataStore<S> {
    /// Open the database described by `config` and ensure its schema.
    ///
    /// Any failure here is [`StoreError::SchemaInit`]: a store that cannot
    /// reach a valid schema must not start.
    pub fn open(config: &StoreConfig, sink: S) -> StoreResult<Self> {
        let db = Database::open(config).map_err(|err| StoreError::SchemaInit {
            message: format!("could not open {}: {err}", config.path.display()),
        })?;
        Self::with_database(db, sink)
    }

    /// Wrap an already open database, ensuring its schema.
    pub fn with_database(db: Database, sink: S) -> StoreResult<Self> {
        SchemaManager::new(&db).ensure_schema()?;
        info!("data store ready");
        Ok(Self { db, sink })
    }

    /// Release the storage handle.
    pub fn close(self) -> StoreResult<()> {
        self.db.close()
    }

    /// The notification sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Return `uid` if the object exists.
    #[instrument(skip(self))]
    pub fn get(&self, uid: Uid) -> StoreResult<Uid> {
        ObjectStore::new(self.db.conn()).get(uid)
    }

    /// Store a new object with its initial properties and return its uid.
    ///
    /// Properties are validated like `set_properties` before anything is
    /// written; empty values are not stored.
    #[instrument(skip(self, data, properties), fields(properties = properties.len()))]
    pub fn create(&self, data: impl Into<DataValue>, properties: &Properties) -> StoreResult<Uid> {
        let data = data.into();
        let pairs = properties::validate(properties)?;

        let uid = self.db.transaction(|tx| {
            let uid = ObjectStore::new(tx).create(&data)?;
            PropertyStore::new(tx).insert_all(uid, &pairs)?;
            Ok(uid)
        })?;

        debug!(uid, "object created");
        self.sink.updated(&UpdateEvent::data_changed(uid));
        Ok(uid)
    }

    /// Remove an object and all of its properties.
    ///
    /// Deleting a uid that does not exist is not an error and still
    /// notifies.
    #[instrument(skip(self))]
    pub fn delete(&self, uid: Uid) -> StoreResult<()> {
        let (existed, removed_props) = self.db.transaction(|tx| {
            let removed_props = PropertyStore::new(tx).delete_all(uid)?;
            let existed = ObjectStore::new(tx).delete(uid)?;
            Ok((existed, removed_props))
        })?;

        debug!(uid, existed, removed_props, "object deleted");
        self.sink.updated(&UpdateEvent::deleted(uid));
        Ok(())
    }

    /// Objids with a property equal to any pair of `filter`.
    ///
    /// Pairs are OR-ed; see [`crate::query`].
    #[instrument(skip(self, filter), fields(terms = filter.len()))]
    pub fn find(&self, filter: &Properties) -> StoreResult<BTreeSet<Uid>> {
        QueryEngine::new(self.db.conn()).find(filter)
    }

    /// The stored blob of `uid`.
    #[instrument(skip(self))]
    pub fn get_data(&self, uid: Uid) -> StoreResult<Vec<u8>> {
        ObjectStore::new(self.db.conn()).get_data(uid)
    }

    /// Replace the blob of `uid`.
    #[instrument(skip(self, data))]
    pub fn set_data(&self, uid: Uid, data: impl Into<DataValue>) -> StoreResult<()> {
        let data = data.into();
        self.db
            .transaction(|tx| ObjectStore::new(tx).set_data(uid, &data))?;

        self.sink.updated(&UpdateEvent::data_changed(uid));
        Ok(())
    }

    /// Properties of `uid`; all of them when `keys` is empty.
    #[instrument(skip(self))]
    pub fn get_properties(&self, uid: Uid, keys: &[String]) -> StoreResult<PropertyMap> {
        PropertyStore::new(self.db.conn()).get_properties(uid, keys)
    }

    /// Set, overwrite or clear properties of `uid`.
    ///
    /// Best effort, not atomic: the whole input is validated first, then
    /// each pair commits on its own.
    #[instrument(skip(self, props), fields(properties = props.len()))]
    pub fn set_properties(&self, uid: Uid, props: &Properties) -> StoreResult<()> {
        PropertyStore::new(self.db.conn()).set_properties(uid, props)?;

        debug!(uid, "properties updated");
        self.sink.updated(&UpdateEvent::properties_changed(uid));
        Ok(())
    }

    /// Object and property row counts.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        Ok(StoreStats {
            objects: ObjectStore::new(self.db.conn()).count()?,
            properties: PropertyStore::new(self.db.conn()).count()?,
        })
    }
}

// ── tests ────────────────────────────────────────────────────────────
