//! datastore CLI entry point.
//!
//! Loads configuration, initialises logging, opens the store (refusing to
//! start if its schema cannot be established) and then either runs one
//! operation or serves JSON requests from stdin.

mod adapter;
mod cli;
mod config;
mod object_path;

use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::Parser;
use datastore_core::{DataStore, EventBus, EventSink, StoreConfig};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapter::{Dispatcher, LogSink, Request, Signal};
use crate::cli::{Cli, Commands, DataArgs};
use crate::config::AppConfig;
use crate::object_path::{object_path, parse_object_ref};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref(), cli.db.clone())?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Serve => cmd_serve(config).await,
        command => cmd_oneshot(config, command),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(config: AppConfig) -> Result<()> {
    let bus = EventBus::new(config.event_capacity);
    let mut events = bus.subscribe();
    let dispatcher = Dispatcher::new(open_or_exit(&config.store, bus));
    info!(path = %config.store.path.display(), "serving requests on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read request")?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                None
            }
        };
        let Some(line) = line else { break };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Requests run to completion one at a time.
        let response = dispatcher.handle_line(trimmed);
        write_line(&mut stdout, &response).await?;

        loop {
            match events.try_recv() {
                Ok(event) => write_line(&mut stdout, &Signal::from(event.as_ref())).await?,
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "update signals dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    dispatcher
        .into_store()
        .close()
        .context("failed to close the data store")?;
    info!("data store shut down");
    Ok(())
}

async fn write_line<T: Serialize>(out: &mut tokio::io::Stdout, value: &T) -> Result<()> {
    let mut buf = serde_json::to_vec(value)?;
    buf.push(b'\n');
    out.write_all(&buf).await?;
    out.flush().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// One-shot subcommands
// ---------------------------------------------------------------------------

fn cmd_oneshot(config: AppConfig, command: Commands) -> Result<()> {
    let dispatcher = Dispatcher::new(open_or_exit(&config.store, LogSink));

    let (method, params) = match command {
        Commands::Init => {
            info!(path = %config.store.path.display(), "data store initialised");
            return print_json(&json!({ "path": config.store.path }));
        }
        Commands::Status => {
            let stats = dispatcher.store().stats()?;
            return print_json(&json!({
                "path": config.store.path,
                "objects": stats.objects,
                "properties": stats.properties,
            }));
        }
        Commands::GetData { object, raw: true } => {
            let data = dispatcher.store().get_data(object_ref(&object)?)?;
            std::io::stdout().write_all(&data)?;
            return Ok(());
        }
        Commands::Get { uid } => ("get", json!({ "uid": uid })),
        Commands::Create { data, props } => (
            "create",
            json!({ "data": data_value(&data)?, "properties": pairs_to_map(props) }),
        ),
        Commands::Delete { object } => ("delete", json!({ "object": object_arg(&object)? })),
        Commands::Find { filters } => ("find", json!({ "properties": pairs_to_map(filters) })),
        Commands::GetData { object, raw: false } => {
            ("get_data", json!({ "object": object_arg(&object)? }))
        }
        Commands::SetData { object, data } => (
            "set_data",
            json!({ "object": object_arg(&object)?, "data": data_value(&data)? }),
        ),
        Commands::GetProperties { object, keys } => (
            "get_properties",
            json!({ "object": object_arg(&object)?, "keys": keys }),
        ),
        Commands::SetProperties { object, pairs } => (
            "set_properties",
            json!({ "object": object_arg(&object)?, "properties": pairs_to_map(pairs) }),
        ),
        Commands::Serve => unreachable!("serve is handled before one-shot dispatch"),
    };

    let request = Request {
        id: Value::Null,
        method: method.to_string(),
        params,
    };
    let response = dispatcher.handle(&request);
    if let Some(err) = response.error {
        bail!("{}: {}", err.kind, err.message);
    }
    print_json(&response.result.unwrap_or(Value::Null))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn object_ref(input: &str) -> Result<i64> {
    match parse_object_ref(input) {
        Some(uid) => Ok(uid),
        None => bail!("`{input}` is neither a uid nor an object path"),
    }
}

fn object_arg(input: &str) -> Result<String> {
    object_ref(input).map(object_path)
}

fn data_value(args: &DataArgs) -> Result<Value> {
    if let Some(path) = &args.data_file {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return Ok(json!(bytes));
    }
    Ok(json!(args.data.clone().unwrap_or_default()))
}

fn pairs_to_map(pairs: Vec<(String, String)>) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Startup helpers
// ---------------------------------------------------------------------------

/// Open the store or terminate: running without a valid schema risks
/// losing writes silently.
fn open_or_exit<S: EventSink>(config: &StoreConfig, sink: S) -> DataStore<S> {
    match DataStore::open(config, sink) {
        Ok(store) => store,
        Err(err) => {
            error!(%err, "could not access the data store, exiting");
            std::process::exit(1);
        }
    }
}

/// Initialise the tracing subscriber on stderr; `RUST_LOG` wins over
/// `default_level`.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
