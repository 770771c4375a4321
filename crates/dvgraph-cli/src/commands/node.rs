//! Node command - add and remove lineage nodes

use anyhow::{Context, Result};
use clap::Subcommand;

use super::{NodeRef, Session};

/// Node management commands
#[derive(Subcommand, Debug)]
pub enum NodeCommand {
    /// Add a node (no-op if it already exists)
    Add(AddArgs),

    /// Remove a node and every edge touching it
    Remove(NodeRef),
}

/// Arguments for the add command
#[derive(clap::Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    node: NodeRef,

    /// Properties as a JSON object, e.g. '{"owner": "etl"}'
    #[arg(long)]
    properties: Option<String>,
}

/// Execute the node command
pub fn execute(cmd: NodeCommand, session: &Session) -> Result<()> {
    match cmd {
        NodeCommand::Add(args) => execute_add(args, session),
        NodeCommand::Remove(node) => execute_remove(node, session),
    }
}

fn execute_add(args: AddArgs, session: &Session) -> Result<()> {
    let mut node = args.node.to_node()?;
    if let Some(ref json) = args.properties {
        node = node.with_properties(parse_properties(json)?);
    }

    let mut graph = session.open_graph()?;
    graph.add_node(&node)?;

    session.print_result(format!("Added {}", node));
    Ok(())
}

fn execute_remove(node: NodeRef, session: &Session) -> Result<()> {
    let node = node.to_node()?;
    let mut graph = session.open_graph()?;

    if !graph.contains_node(&node) {
        session.print_result(format!("No such node: {}", node));
        return Ok(());
    }
    graph.remove_node(&node)?;

    session.print_result(format!("Removed {}", node));
    Ok(())
}

fn parse_properties(json: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
    let value: serde_json::Value =
        serde_json::from_str(json).context("--properties is not valid JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => anyhow::bail!("--properties must be a JSON object"),
    }
}
