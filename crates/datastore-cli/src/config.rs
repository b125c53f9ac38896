//! Runtime configuration.
//!
//! Reads the `[datastore]` section of `config/datastore.toml` (or the file
//! given with `--config`), then applies environment overrides, then the
//! `--db` flag. A missing file or section falls back to defaults.
//!
//! | Setting          | TOML key          | Environment         |
//! |------------------|-------------------|---------------------|
//! | database path    | `path`            | `DATASTORE_DB`      |
//! | profile dir      | `profile_dir`     | `DATASTORE_PROFILE` |
//! | lock wait (ms)   | `busy_timeout_ms` |                     |
//! | log filter       | `log_level`       | `DATASTORE_LOG`     |
//! | event buffer     | `event_capacity`  |                     |

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use datastore_core::StoreConfig;
use serde::Deserialize;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "config/datastore.toml";

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub log_level: String,
    pub event_capacity: usize,
}

/// Shape of the `[datastore]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSection {
    path: Option<PathBuf>,
    profile_dir: Option<PathBuf>,
    busy_timeout_ms: Option<u64>,
    log_level: Option<String>,
    event_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    datastore: FileSection,
}

/// Load configuration from disk and the process environment.
///
/// An explicitly named `config_file` must exist; the default one may not.
pub fn load(config_file: Option<&Path>, db_override: Option<PathBuf>) -> Result<AppConfig> {
    let section = match config_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_section(&content).with_context(|| format!("invalid {}", path.display()))?
        }
        None => match std::fs::read_to_string(DEFAULT_CONFIG_FILE) {
            Ok(content) => parse_section(&content)
                .with_context(|| format!("invalid {DEFAULT_CONFIG_FILE}"))?,
            Err(_) => FileSection::default(),
        },
    };

    Ok(resolve(section, |name| std::env::var(name).ok(), db_override))
}

fn parse_section(content: &str) -> Result<FileSection> {
    let file: FileConfig = toml::from_str(content)?;
    Ok(file.datastore)
}

/// Merge file settings, environment and flag. Precedence, lowest first:
/// defaults, file, environment, `--db`.
fn resolve(
    section: FileSection,
    env: impl Fn(&str) -> Option<String>,
    db_override: Option<PathBuf>,
) -> AppConfig {
    let mut store = StoreConfig::default();

    if let Some(profile) = section.profile_dir {
        store = store.with_profile_dir(profile);
    }
    if let Some(path) = section.path {
        store = store.with_path(path);
    }
    if let Some(ms) = section.busy_timeout_ms {
        store = store.with_busy_timeout(Duration::from_millis(ms));
    }

    if let Some(profile) = env("DATASTORE_PROFILE").filter(|v| !v.is_empty()) {
        store = store.with_profile_dir(profile);
    }
    if let Some(path) = env("DATASTORE_DB").filter(|v| !v.is_empty()) {
        store = store.with_path(path);
    }
    if let Some(path) = db_override {
        store = store.with_path(path);
    }

    let log_level = env("DATASTORE_LOG")
        .filter(|v| !v.is_empty())
        .or(section.log_level)
        .unwrap_or_else(|| "info".to_string());

    AppConfig {
        store,
        log_level,
        event_capacity: section.event_capacity.unwrap_or(256).max(1),
    }
}
