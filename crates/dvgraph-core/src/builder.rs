//! Lineage Builder
//!
//! Declares lineage as chains of dependencies before anything is persisted.
//!
//! ## Usage
//!
//! ```ignore
//! use dvgraph_core::{LineageBuilder, LineageGraph, NodeFactory};
//!
//! let raw = NodeFactory::create("GoogleCloudStorageObject", "raw/events.json", None)?;
//! let staged = NodeFactory::create("PostgresTable", "events_staging", None)?;
//! let report = NodeFactory::create("BigQueryTable", "events_daily", None)?;
//!
//! let mut builder = LineageBuilder::new();
//! let tail = builder.chain(&raw, &staged);
//! builder.chain(tail, &report);
//! builder.apply(&mut graph)?;
//! ```

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::LineageError;
use crate::graph::LineageGraph;
use crate::node::{LineageNode, NodeIdentity};

/// An in-memory declaration of dependency edges.
///
/// Edges are kept in declaration order without duplicates. Nothing touches
/// the store until [`LineageBuilder::apply`].
#[derive(Debug, Default)]
pub struct LineageBuilder {
    nodes: HashMap<NodeIdentity, LineageNode>,
    edges: Vec<(NodeIdentity, NodeIdentity)>,
}

impl LineageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `downstream` depends on `upstream`; returns `downstream`
    /// so chains read left to right.
    pub fn chain<'n>(
        &mut self,
        upstream: &LineageNode,
        downstream: &'n LineageNode,
    ) -> &'n LineageNode {
        self.remember(upstream);
        self.remember(downstream);

        let edge = (upstream.identity().clone(), downstream.identity().clone());
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        downstream
    }

    /// Declare that every node in `downstreams` depends on `upstream`
    pub fn chain_all<'n>(
        &mut self,
        upstream: &LineageNode,
        downstreams: impl IntoIterator<Item = &'n LineageNode>,
    ) {
        for downstream in downstreams {
            self.chain(upstream, downstream);
        }
    }

    /// Direct predecessors of `node`, in declaration order
    pub fn predecessors(&self, node: impl AsRef<NodeIdentity>) -> Vec<&LineageNode> {
        let target = node.as_ref();
        self.edges
            .iter()
            .filter(|(_, down)| down == target)
            .filter_map(|(up, _)| self.nodes.get(up))
            .collect()
    }

    /// All transitive predecessors of `node`, nearest first, each once
    pub fn predecessor_tree(&self, node: impl AsRef<NodeIdentity>) -> Vec<&LineageNode> {
        let mut seen: HashSet<&NodeIdentity> = HashSet::new();
        let mut tree = Vec::new();
        let mut stack: Vec<&NodeIdentity> = vec![node.as_ref()];
        seen.insert(node.as_ref());

        while let Some(current) = stack.pop() {
            for predecessor in self.predecessors(current) {
                if seen.insert(predecessor.identity()) {
                    tree.push(predecessor);
                    stack.push(predecessor.identity());
                }
            }
        }
        tree
    }

    /// Number of declared edges
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Add every declared edge to `graph`, stopping at the first failure.
    ///
    /// Returns the number of edges applied. Edges applied before a failure
    /// stay committed.
    pub fn apply(&self, graph: &mut LineageGraph) -> Result<usize, LineageError> {
        for (applied, (up, down)) in self.edges.iter().enumerate() {
            let (Some(upstream), Some(downstream)) = (self.nodes.get(up), self.nodes.get(down))
            else {
                return Err(LineageError::invalid_argument(format!(
                    "edge {up} -> {down} references an undeclared node"
                )));
            };
            if let Err(err) = graph.add_edge(upstream, downstream) {
                debug!(applied, error = %err, "Builder apply stopped");
                return Err(err);
            }
        }
        debug!(edges = self.edges.len(), "Applied lineage builder");
        Ok(self.edges.len())
    }

    fn remember(&mut self, node: &LineageNode) {
        self.nodes
            .entry(node.identity().clone())
            .or_insert_with(|| node.clone());
    }
}
