//! dvgraph CLI - Versioned data lineage from the command line
//!
//! A command-line interface for recording which tables and objects depend on
//! which, and querying that lineage.
//!
//! # Usage
//!
//! ```bash
//! # Record that a BigQuery table is built from a GCS object
//! dvgraph edge add GoogleCloudStorageObject raw/events.json BigQueryTable events
//!
//! # Everything `events` is built from
//! dvgraph upstream BigQueryTable events
//!
//! # Latest version of a table
//! dvgraph latest events
//!
//! # Render the graph
//! dvgraph export --format dot | dot -Tsvg > lineage.svg
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dvgraph_config::{ConfigOverrides, LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;

/// dvgraph - Versioned data lineage graph
#[derive(Parser, Debug)]
#[command(name = "dvgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Workspace directory (defaults to the current directory)
    #[arg(long, short = 'w', global = true, env = "DVGRAPH_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Lineage database file (overrides storage.database_path)
    #[arg(long, global = true, env = "DVGRAPH_DATABASE")]
    database: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        let log_level = if self.quiet {
            Some("error".to_string())
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            None
        };

        ConfigOverrides {
            database_path: self.database.clone(),
            log_level,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add or remove nodes
    #[command(subcommand)]
    Node(commands::node::NodeCommand),

    /// Add, remove or check dependency edges
    #[command(subcommand)]
    Edge(commands::edge::EdgeCommand),

    /// Find a node by name and version
    Find(commands::query::FindArgs),

    /// Show the latest version of a name
    Latest(commands::query::LatestArgs),

    /// List everything a node depends on
    Upstream(commands::query::LineageArgs),

    /// List everything that depends on a node
    Downstream(commands::query::LineageArgs),

    /// Export the graph as DOT or JSON
    Export(commands::export::ExportArgs),

    /// Show graph statistics
    Stats(commands::stats::StatsArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over flags and config
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let session = commands::Session::load(&cli.global)?;
    init_logging(&session.config.logging)?;

    match cli.command {
        Commands::Node(cmd) => commands::node::execute(cmd, &session),
        Commands::Edge(cmd) => commands::edge::execute(cmd, &session),
        Commands::Find(args) => commands::query::execute_find(args, &session),
        Commands::Latest(args) => commands::query::execute_latest(args, &session),
        Commands::Upstream(args) => commands::query::execute_upstream(args, &session),
        Commands::Downstream(args) => commands::query::execute_downstream(args, &session),
        Commands::Export(args) => commands::export::execute(args, &session),
        Commands::Stats(args) => commands::stats::execute(args, &session),
        Commands::Config(cmd) => commands::config::execute(cmd, &session),
    }
}
