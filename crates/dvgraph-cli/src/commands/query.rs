//! Query commands - look up nodes and walk their lineage

use anyhow::Result;
use dvgraph_core::{LineageNode, SnapshotNode, DEFAULT_VERSION};

use super::{print_nodes, NodeRef, Session};

/// Arguments for the find command
#[derive(clap::Args, Debug)]
pub struct FindArgs {
    /// Node name
    name: String,

    /// Node version (defaults to 1)
    #[arg(long)]
    version: Option<i64>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the latest command
#[derive(clap::Args, Debug)]
pub struct LatestArgs {
    /// Node name
    name: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the upstream and downstream commands
#[derive(clap::Args, Debug)]
pub struct LineageArgs {
    #[command(flatten)]
    node: NodeRef,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn execute_find(args: FindArgs, session: &Session) -> Result<()> {
    let graph = session.open_graph()?;
    let version = args.version.unwrap_or(DEFAULT_VERSION);

    match graph.find_node(&args.name, version) {
        Some(node) => print_node(node, args.json),
        None => {
            session.print_result(format!("No node named '{}' at version {}", args.name, version));
            Ok(())
        }
    }
}

pub fn execute_latest(args: LatestArgs, session: &Session) -> Result<()> {
    let graph = session.open_graph()?;

    match graph.latest_version(&args.name)? {
        Some(node) => print_node(node, args.json),
        None => {
            session.print_result(format!("No node named '{}'", args.name));
            Ok(())
        }
    }
}

pub fn execute_upstream(args: LineageArgs, session: &Session) -> Result<()> {
    let node = args.node.to_node()?;
    let graph = session.open_graph()?;
    print_lineage(&graph.upstream(&node), args.json)
}

pub fn execute_downstream(args: LineageArgs, session: &Session) -> Result<()> {
    let node = args.node.to_node()?;
    let graph = session.open_graph()?;
    print_lineage(&graph.downstream(&node), args.json)
}

fn print_node(node: &LineageNode, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&SnapshotNode::from(node))?);
    } else {
        println!("{}", node);
        if let Some(properties) = node.properties() {
            println!("{}", serde_json::to_string_pretty(properties)?);
        }
    }
    Ok(())
}

fn print_lineage(nodes: &[&LineageNode], json: bool) -> Result<()> {
    if json {
        let views: Vec<SnapshotNode> = nodes.iter().map(|n| SnapshotNode::from(*n)).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
    } else {
        print_nodes(nodes);
    }
    Ok(())
}
