//! rpc-cli: run recoverable remote operations from the command line.
//!
//! ```text
//! rpc.toml ─→ config::load_config ─→ ServiceStub::from_config
//!                                        │
//!   Ctrl-C ─→ Shutdown ─────────────────→│ (cancels backoff waits)
//!                                        ▼
//!                         query / create / update / delete
//!                                        │
//!                                        ▼
//!                             pretty JSON on stdout
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use recoverable_rpc::config::{load_config, load_credential};
use recoverable_rpc::lifecycle::signals::spawn_signal_listener;
use recoverable_rpc::lifecycle::Shutdown;
use recoverable_rpc::observability::{logging, metrics};
use recoverable_rpc::session::SessionType;
use recoverable_rpc::stub::{SObject, ServiceStub, Stub};

#[derive(Parser)]
#[command(name = "rpc-cli")]
#[command(about = "Session-aware client with automatic re-login and retries", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "rpc.toml")]
    config: PathBuf,

    /// Override the configured log level.
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the configured session type (enterprise, partner, rest).
    #[arg(long)]
    session_type: Option<SessionType>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the session details
    Login,
    /// Run a query and print the first page
    Query { soql: String },
    /// Run a query that includes deleted and archived records
    QueryAll { soql: String },
    /// Fetch the next page of a query
    QueryMore { locator: String },
    /// Create one record from a JSON object of fields
    Create {
        #[arg(long = "type")]
        object_type: String,
        fields: String,
    },
    /// Update one record from a JSON object of fields
    Update {
        #[arg(long = "type")]
        object_type: String,
        id: String,
        fields: String,
    },
    /// Delete records by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(session_type) = cli.session_type {
        config.endpoint.session_type = session_type;
    }

    let level = cli.log_level.as_deref().unwrap_or(&config.observability.log_level);
    logging::init_logging(level);

    tracing::info!(
        config = %cli.config.display(),
        session_type = %config.endpoint.session_type,
        max_retries = config.recovery.max_retries,
        base_delay_ms = config.recovery.base_delay_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let credential = load_credential(&config)?;
    let mut stub = ServiceStub::from_config(&config, credential)?.with_shutdown(shutdown);

    match cli.command {
        Commands::Login => {
            stub.prepare(false).await?;
            print_json(&stub.login_result())?;
        }
        Commands::Query { soql } => {
            print_json(&stub.query(&soql).await?)?;
        }
        Commands::QueryAll { soql } => {
            print_json(&stub.query_all(&soql).await?)?;
        }
        Commands::QueryMore { locator } => {
            print_json(&stub.query_more(&locator).await?)?;
        }
        Commands::Create { object_type, fields } => {
            let object = record(object_type, None, &fields)?;
            print_json(&stub.create(&[object]).await?)?;
        }
        Commands::Update { object_type, id, fields } => {
            let object = record(object_type, Some(id), &fields)?;
            print_json(&stub.update(&[object]).await?)?;
        }
        Commands::Delete { ids } => {
            print_json(&stub.delete(&ids).await?)?;
        }
    }

    Ok(())
}

fn record(object_type: String, id: Option<String>, fields: &str) -> Result<SObject, serde_json::Error> {
    let fields: serde_json::Map<String, serde_json::Value> = serde_json::from_str(fields)?;
    let mut object = SObject::new(object_type);
    object.id = id;
    object.fields = fields;
    Ok(object)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
