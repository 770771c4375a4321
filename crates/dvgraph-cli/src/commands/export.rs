//! Export command - render the whole graph

use anyhow::Result;

use super::Session;

/// Arguments for the export command
#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = ExportFormat::Dot)]
    format: ExportFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ExportFormat {
    /// Graphviz DOT format
    Dot,
    /// JSON snapshot of nodes and edges
    Json,
}

/// Execute the export command
pub fn execute(args: ExportArgs, session: &Session) -> Result<()> {
    let graph = session.open_graph()?;

    match args.format {
        ExportFormat::Dot => print!("{}", graph.dot()),
        ExportFormat::Json => println!("{}", serde_json::to_string_pretty(&graph.snapshot())?),
    }
    Ok(())
}
