//! Store configuration.
//!
//! [`StoreConfig`] says where the database file lives and how long a
//! statement waits on a lock held by another writer before failing.
//! Defaults are provided via [`Default`], and builder-style `with_*`
//! methods customise individual fields.

use std::path::PathBuf;
use std::time::Duration;

/// Location and connection limits for the backing database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the SQLite database file.
    ///
    /// Default: **`<temp dir>/ds/data-store.db`**.
    pub path: PathBuf,

    /// How long a statement waits for a lock before reporting
    /// [`StoreError::Busy`](crate::StoreError::Busy).
    ///
    /// Default: **3 seconds**.
    pub busy_timeout: Duration,

    /// Create the containing directory (mode `0755`) if it is missing.
    ///
    /// Default: **true**.
    pub create_parent: bool,
}

/// Directory below the profile directory that holds the database file.
pub const STORE_DIR_NAME: &str = "ds";

/// File name of the database inside [`STORE_DIR_NAME`].
pub const STORE_FILE_NAME: &str = "data-store.db";

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: Self::path_in_profile(std::env::temp_dir()),
            busy_timeout: Duration::from_secs(3),
            create_parent: true,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// The database path used for a given profile directory.
    pub fn path_in_profile(profile: impl Into<PathBuf>) -> PathBuf {
        profile.into().join(STORE_DIR_NAME).join(STORE_FILE_NAME)
    }

    /// Set the database file path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Place the database inside `profile` using the standard layout.
    pub fn with_profile_dir(mut self, profile: impl Into<PathBuf>) -> Self {
        self.path = Self::path_in_profile(profile);
        self
    }

    /// Set the lock wait bound.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enable or disable creating the containing directory.
    pub fn with_create_parent(mut self, create: bool) -> Self {
        self.create_parent = create;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.busy_timeout, Duration::from_secs(3));
        assert!(cfg.create_parent);
        assert!(cfg.path.ends_with("ds/data-store.db"));
    }

    #[test]
    fn profile_dir_uses_standard_layout() {
        let cfg = StoreConfig::new().with_profile_dir("/home/olpc/.profile");
        assert_eq!(
            cfg.path,
            PathBuf::from("/home/olpc/.profile/ds/data-store.db")
        );
    }

    #[test]
    fn builder_chaining() {
        let cfg = StoreConfig::new()
            .with_path("/var/lib/ds.db")
            .with_busy_timeout(Duration::from_millis(250))
            .with_create_parent(false);
        assert_eq!(cfg.path, PathBuf::from("/var/lib/ds.db"));
        assert_eq!(cfg.busy_timeout, Duration::from_millis(250));
        assert!(!cfg.create_parent);
    }
}
