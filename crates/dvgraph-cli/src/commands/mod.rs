//! CLI command implementations
//!
//! This module contains all dvgraph CLI command implementations.

pub mod config;
pub mod edge;
pub mod export;
pub mod node;
pub mod query;
pub mod stats;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use dvgraph_config::{ConfigLoader, GraphConfig};
use dvgraph_core::{LineageGraph, LineageNode, LineageStore, NodeFactory, StoreOptions};
use tracing::debug;

use crate::GlobalOptions;

/// Resolved workspace and configuration shared by every command
#[derive(Debug)]
pub struct Session {
    pub workspace: PathBuf,
    pub config: GraphConfig,
    pub quiet: bool,
}

impl Session {
    /// Resolve the workspace and load its merged configuration
    pub fn load(global: &GlobalOptions) -> Result<Self> {
        let workspace = resolve_workspace(global)?;
        let loader = ConfigLoader::new();
        let config = loader
            .load(&workspace, Some(&global.to_config_overrides()))
            .context("Failed to load configuration")?;

        Ok(Self {
            workspace,
            config,
            quiet: global.quiet,
        })
    }

    /// Effective database file for this workspace
    pub fn database_path(&self) -> PathBuf {
        self.config.database_path(&self.workspace)
    }

    /// Open the store and rebuild the graph from it
    pub fn open_graph(&self) -> Result<LineageGraph> {
        let path = self.database_path();
        let options = StoreOptions {
            busy_timeout: self.config.storage.busy_timeout(),
            enforce_unique_identity: self.config.storage.enforce_unique_identity,
        };

        debug!(path = %path.display(), "Opening lineage database");
        let store = LineageStore::open(&path, &options)
            .with_context(|| format!("Failed to open lineage database {}", path.display()))?;
        LineageGraph::open(store).context("Failed to load lineage graph")
    }

    /// Print a confirmation line unless `--quiet`
    pub fn print_result(&self, message: impl std::fmt::Display) {
        if !self.quiet {
            println!("{}", message);
        }
    }
}

/// Resolve the workspace path from options or current directory.
pub fn resolve_workspace(global: &GlobalOptions) -> Result<PathBuf> {
    if let Some(ref ws) = global.workspace {
        if !ws.is_dir() {
            anyhow::bail!("Workspace '{}' is not a directory", ws.display());
        }
        return ws
            .canonicalize()
            .with_context(|| format!("Failed to resolve workspace {}", ws.display()));
    }

    std::env::current_dir().context("Failed to get current directory")
}

/// A node given on the command line as KIND NAME [--version N]
#[derive(Args, Debug, Clone)]
pub struct NodeRef {
    /// Node kind (Node, BigQueryTable, PostgresTable, GoogleCloudStorageObject)
    pub kind: String,

    /// Node name
    pub name: String,

    /// Node version (defaults to 1)
    #[arg(long)]
    pub version: Option<i64>,
}

impl NodeRef {
    pub fn to_node(&self) -> Result<LineageNode> {
        Ok(NodeFactory::create(&self.kind, self.name.as_str(), self.version)?)
    }
}

/// Render a list of nodes, one per line
pub fn print_nodes(nodes: &[&LineageNode]) {
    for node in nodes {
        println!("{}", node);
    }
}

/// Path relative to the workspace when it lies inside it
pub fn display_path(path: &Path, workspace: &Path) -> String {
    path.strip_prefix(workspace)
        .unwrap_or(path)
        .display()
        .to_string()
}
