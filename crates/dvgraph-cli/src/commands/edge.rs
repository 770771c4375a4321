//! Edge command - record, drop and test dependencies between nodes
//!
//! An edge `UP -> DOWN` means DOWN is built from UP.

use anyhow::Result;
use clap::Subcommand;
use dvgraph_core::{LineageNode, NodeFactory};

use super::Session;

/// Edge management commands
#[derive(Subcommand, Debug)]
pub enum EdgeCommand {
    /// Record that DOWN depends on UP (missing nodes are created)
    Add(EdgeArgs),

    /// Remove the dependency of DOWN on UP
    Remove(EdgeArgs),

    /// Report whether adding the edge would create a cycle
    Check(EdgeArgs),
}

/// An edge given as UP_KIND UP_NAME DOWN_KIND DOWN_NAME
#[derive(clap::Args, Debug)]
pub struct EdgeArgs {
    /// Upstream node kind
    up_kind: String,

    /// Upstream node name
    up_name: String,

    /// Downstream node kind
    down_kind: String,

    /// Downstream node name
    down_name: String,

    /// Upstream node version (defaults to 1)
    #[arg(long)]
    up_version: Option<i64>,

    /// Downstream node version (defaults to 1)
    #[arg(long)]
    down_version: Option<i64>,
}

impl EdgeArgs {
    fn to_nodes(&self) -> Result<(LineageNode, LineageNode)> {
        let upstream = NodeFactory::create(&self.up_kind, self.up_name.as_str(), self.up_version)?;
        let downstream =
            NodeFactory::create(&self.down_kind, self.down_name.as_str(), self.down_version)?;
        Ok((upstream, downstream))
    }
}

/// Execute the edge command
pub fn execute(cmd: EdgeCommand, session: &Session) -> Result<()> {
    match cmd {
        EdgeCommand::Add(args) => execute_add(args, session),
        EdgeCommand::Remove(args) => execute_remove(args, session),
        EdgeCommand::Check(args) => execute_check(args, session),
    }
}

fn execute_add(args: EdgeArgs, session: &Session) -> Result<()> {
    let (upstream, downstream) = args.to_nodes()?;
    let mut graph = session.open_graph()?;

    graph.add_edge(&upstream, &downstream)?;

    session.print_result(format!("Added {} -> {}", upstream, downstream));
    Ok(())
}

fn execute_remove(args: EdgeArgs, session: &Session) -> Result<()> {
    let (upstream, downstream) = args.to_nodes()?;
    let mut graph = session.open_graph()?;

    if !graph.contains_edge(&upstream, &downstream) {
        session.print_result(format!("No such edge: {} -> {}", upstream, downstream));
        return Ok(());
    }
    graph.remove_edge(&upstream, &downstream)?;

    session.print_result(format!("Removed {} -> {}", upstream, downstream));
    Ok(())
}

fn execute_check(args: EdgeArgs, session: &Session) -> Result<()> {
    let (upstream, downstream) = args.to_nodes()?;
    let graph = session.open_graph()?;

    if graph.would_create_cycle(&upstream, &downstream) {
        println!("cycle: {} -> {} would create a cycle", upstream, downstream);
    } else if graph.contains_edge(&upstream, &downstream) {
        println!("exists: {} -> {}", upstream, downstream);
    } else {
        println!("ok: {} -> {} can be added", upstream, downstream);
    }
    Ok(())
}
