//! Error types for the datastore-core crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].
//! Caller mistakes (unknown object, reserved key, blank filter, bad input
//! shape) are distinct variants from storage failures so an adapter can map
//! them onto its own error names without string matching.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::Uid;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the object/property store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation referenced a uid with no corresponding object.
    #[error("object {uid} was not found")]
    NotFound { uid: Uid },

    /// A blob or property value could not be normalised to bytes or text.
    #[error("unsupported data type: {found}")]
    UnsupportedDataType { found: String },

    /// Attempted to set a property key the store manages itself.
    #[error("key {key} is a reserved key")]
    ReservedKey { key: String },

    /// A find filter carried a blank value.
    #[error("property values must not be blank (key {key})")]
    InvalidQuery { key: String },

    /// The on-disk schema could not be established.
    #[error("schema initialisation failed: {message}")]
    SchemaInit { message: String },

    /// The database stayed locked past the busy timeout.
    #[error("database busy: {message}")]
    Busy { message: String },

    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Filesystem error while preparing the storage location.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether retrying the whole operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if matches!(
                    code.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                Self::Busy {
                    message: err.to_string(),
                }
            }
            _ => Self::Sqlite(err),
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = StoreError::NotFound { uid: 7 };
        assert_eq!(err.to_string(), "object 7 was not found");
    }

    #[test]
    fn reserved_key_display() {
        let err = StoreError::ReservedKey { key: "uid".into() };
        assert_eq!(err.to_string(), "key uid is a reserved key");
    }

    #[test]
    fn busy_failure_is_transient() {
        let raw = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".into()),
        );
        let err = StoreError::from(raw);
        assert!(matches!(err, StoreError::Busy { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn other_sqlite_failures_are_not_transient() {
        let err = StoreError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, StoreError::Sqlite(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn io_error_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = StoreError::from(io_err);
        assert!(err.to_string().contains("read-only"));
    }
}
