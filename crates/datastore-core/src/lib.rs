//! # datastore-core
//!
//! Local object and property store.
//!
//! Persists opaque binary objects next to an open-ended set of string
//! properties per object, answers lookups by uid and queries by property
//! equality, and reports every change to a notification sink. The store is
//! transport-agnostic: an adapter maps [`DataStore`] operations onto whatever
//! RPC mechanism it serves and implements [`EventSink`] to forward updates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  DataStore (façade) ──► EventSink        │
//! ├──────────────────────────────────────────┤
//! │  ObjectStore   PropertyStore  QueryEngine│
//! ├──────────────────────────────────────────┤
//! │  SchemaManager (create-if-absent)        │
//! │  Database (one owned rusqlite connection)│
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use datastore_core::{DataStore, EventBus, Properties, StoreConfig};
//!
//! let bus = EventBus::new(64);
//! let store = DataStore::open(&StoreConfig::new().with_profile_dir(profile), bus.clone())?;
//! let uid = store.create(&b"hello"[..], &Properties::new())?;
//! assert_eq!(store.get_data(uid)?, b"hello");
//! ```

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod objects;
pub mod properties;
pub mod query;
pub mod schema;
pub mod service;

/// Object identifier, assigned by the store and never reused.
pub type Uid = i64;

// ── re-exports ───────────────────────────────────────────────────────

pub use codec::DataValue;
pub use config::StoreConfig;
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use notify::{EventBus, EventSink, NullSink, UpdateEvent};
pub use objects::ObjectStore;
pub use properties::{Properties, PropertyMap, PropertyStore, RESERVED_KEYS};
pub use query::QueryEngine;
pub use schema::SchemaManager;
pub use service::{DataStore, StoreStats};
