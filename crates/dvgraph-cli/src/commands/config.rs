//! Config command - View and manage configuration
//!
//! Provides commands for inspecting and creating dvgraph configuration:
//! - Show configuration file paths
//! - Show the effective merged configuration
//! - Initialize a default config file (local or global)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use dvgraph_config::ConfigLoader;
use serde::Serialize;

use super::Session;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show configuration file paths
    Path(PathArgs),

    /// Show the effective configuration
    Show(ShowArgs),

    /// Create a config file with default values
    Init(InitArgs),
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON instead of TOML
    #[arg(long)]
    json: bool,
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Create the global config (~/.dvgraph/config.toml) instead of the local one
    #[arg(long)]
    global: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
    /// Effective database path
    pub database: PathBuf,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, session: &Session) -> Result<()> {
    match cmd {
        ConfigCommand::Path(args) => execute_path(args, session),
        ConfigCommand::Show(args) => execute_show(args, session),
        ConfigCommand::Init(args) => execute_init(args, session),
    }
}

fn execute_path(args: PathArgs, session: &Session) -> Result<()> {
    let loader = ConfigLoader::new();

    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(&session.workspace);

    let paths = ConfigPaths {
        global_exists: global_path.as_ref().is_some_and(|p| p.exists()),
        local_exists: local_path.exists(),
        global: global_path,
        local: local_path,
        database: session.database_path(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    println!("Configuration Paths");
    println!("===================\n");

    if let Some(ref gp) = paths.global {
        let status = if paths.global_exists {
            "exists"
        } else {
            "not found"
        };
        println!("Global:   {} ({})", gp.display(), status);
    } else {
        println!("Global:   not available (no home directory)");
    }

    let status = if paths.local_exists {
        "exists"
    } else {
        "not found"
    };
    println!("Local:    {} ({})", paths.local.display(), status);
    println!("Database: {}", paths.database.display());

    Ok(())
}

fn execute_show(args: ShowArgs, session: &Session) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&session.config)?);
    } else {
        print!(
            "{}",
            toml::to_string_pretty(&session.config).context("Failed to render configuration")?
        );
    }
    Ok(())
}

fn execute_init(args: InitArgs, session: &Session) -> Result<()> {
    let loader = ConfigLoader::new();

    let path = if args.global {
        loader.init_global()?
    } else {
        loader.init_local(&session.workspace)?
    };

    session.print_result(format!("Config file: {}", path.display()));
    Ok(())
}
