//! Stats command - summarize the graph and its database

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use dvgraph_core::NodeKind;
use serde::Serialize;

use super::{display_path, Session};

/// Arguments for the stats command
#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Graph statistics
#[derive(Debug, Serialize)]
pub struct GraphStats {
    pub database: PathBuf,
    pub nodes: usize,
    pub edges: usize,
    /// Distinct node names
    pub names: usize,
    pub nodes_by_kind: BTreeMap<NodeKind, usize>,
}

/// Execute the stats command
pub fn execute(args: StatsArgs, session: &Session) -> Result<()> {
    let graph = session.open_graph()?;

    let mut nodes_by_kind: BTreeMap<NodeKind, usize> = BTreeMap::new();
    let mut names = std::collections::HashSet::new();
    for node in graph.nodes() {
        *nodes_by_kind.entry(node.kind()).or_default() += 1;
        names.insert(node.name());
    }

    let stats = GraphStats {
        database: session.database_path(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        names: names.len(),
        nodes_by_kind,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Lineage Graph");
    println!("=============\n");
    println!(
        "Database: {}",
        display_path(&stats.database, &session.workspace)
    );
    println!("Nodes:    {}", stats.nodes);
    println!("Edges:    {}", stats.edges);
    println!("Names:    {}", stats.names);
    for (kind, count) in &stats.nodes_by_kind {
        println!("  {:<26} {}", kind.as_str(), count);
    }
    Ok(())
}
