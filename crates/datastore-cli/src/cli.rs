//! CLI argument definitions for the data store.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// datastore -- local object and property store.
#[derive(Parser)]
#[command(
    name = "datastore",
    version,
    about = "Local object and property store",
    long_about = "Stores opaque objects with string properties, finds them by property, \
                  and reports changes. `serve` speaks line-oriented JSON on stdin/stdout."
)]
pub struct Cli {
    /// Database file, overriding configuration and environment.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Configuration file (default: config/datastore.toml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and schema if absent.
    Init,

    /// Show database location and row counts.
    Status,

    /// Serve JSON requests from stdin, one per line.
    Serve,

    /// Check that an object exists.
    Get {
        uid: i64,
    },

    /// Create an object.
    Create {
        #[command(flatten)]
        data: DataArgs,

        /// Initial property, as KEY=VALUE. Repeatable.
        #[arg(long = "prop", value_parser = parse_pair)]
        props: Vec<(String, String)>,
    },

    /// Delete an object and its properties.
    Delete {
        /// Uid or object path.
        object: String,
    },

    /// Find objects having any of the given properties.
    Find {
        /// KEY=VALUE filters, OR-ed together.
        #[arg(value_parser = parse_pair)]
        filters: Vec<(String, String)>,
    },

    /// Print an object's data.
    GetData {
        /// Uid or object path.
        object: String,

        /// Write raw bytes instead of a JSON byte array.
        #[arg(long)]
        raw: bool,
    },

    /// Replace an object's data.
    SetData {
        /// Uid or object path.
        object: String,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Print an object's properties.
    GetProperties {
        /// Uid or object path.
        object: String,

        /// Keys to fetch; all when omitted.
        keys: Vec<String>,
    },

    /// Set properties; an empty VALUE deletes the key.
    SetProperties {
        /// Uid or object path.
        object: String,

        /// KEY=VALUE pairs.
        #[arg(value_parser = parse_pair, required = true)]
        pairs: Vec<(String, String)>,
    },
}

/// Where an object's data comes from.
#[derive(Args)]
#[group(multiple = false)]
pub struct DataArgs {
    /// Data as text.
    #[arg(long)]
    pub data: Option<String>,

    /// Read data from a file.
    #[arg(long)]
    pub data_file: Option<PathBuf>,
}

/// Parse `KEY=VALUE`. The value may be empty.
pub fn parse_pair(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{input}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{input}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
