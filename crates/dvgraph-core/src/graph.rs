//! Lineage Graph
//!
//! The in-memory lineage DAG with write-through to the SQLite store.
//!
//! This implementation uses `petgraph::StableGraph` so that node and edge
//! removal does not invalidate the indices held in the identity map.
//!
//! Every mutation follows the same shape:
//! 1. Validate against the in-memory graph (idempotence, acyclicity)
//! 2. Persist the change in a single store transaction
//! 3. Apply the change to memory only after the transaction commits
//!
//! A failure at any step leaves both memory and store as they were.

use std::collections::HashMap;

use petgraph::algo::{has_path_connecting, is_cyclic_directed, toposort};
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{Dfs, EdgeRef, IntoEdgeReferences, Reversed};
use tracing::{debug, info, warn};

use crate::error::LineageError;
use crate::factory::NodeFactory;
use crate::node::{LineageNode, NodeIdentity};
use crate::store::LineageStore;

/// Node weight: the node plus its surrogate id in the store
#[derive(Debug, Clone)]
struct NodeEntry {
    node: LineageNode,
    row_id: i64,
}

/// Edge weight is the edge row's surrogate id
type LineageDiGraph = StableGraph<NodeEntry, i64, petgraph::Directed>;

/// Outcome of [`LineageGraph::reload`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadStats {
    /// Nodes loaded
    pub nodes: usize,
    /// Edges loaded
    pub edges: usize,
    /// Edge rows skipped because an endpoint was missing or the edge closed a cycle
    pub skipped_edges: usize,
}

// ============================================================================
// Adjacency
// ============================================================================

/// The in-memory half of the graph: petgraph storage plus identity map.
#[derive(Debug, Default)]
struct Adjacency {
    graph: LineageDiGraph,
    index: HashMap<NodeIdentity, NodeIndex>,
}

impl Adjacency {
    fn get(&self, identity: &NodeIdentity) -> Option<NodeIndex> {
        self.index.get(identity).copied()
    }

    /// Insert a node unless its identity is already present
    fn attach_node(&mut self, node: LineageNode, row_id: i64) -> NodeIndex {
        if let Some(idx) = self.get(node.identity()) {
            return idx;
        }
        let identity = node.identity().clone();
        let idx = self.graph.add_node(NodeEntry { node, row_id });
        self.index.insert(identity, idx);
        idx
    }

    fn detach_node(&mut self, idx: NodeIndex) {
        // petgraph drops incident edges with the node
        if let Some(entry) = self.graph.remove_node(idx) {
            self.index.remove(entry.node.identity());
        }
    }

    fn attach_edge(&mut self, upstream: NodeIndex, downstream: NodeIndex, row_id: i64) {
        if self.graph.find_edge(upstream, downstream).is_none() {
            self.graph.add_edge(upstream, downstream, row_id);
        }
    }

    /// Speculatively add the edge, test the whole graph, and roll back.
    fn closes_cycle(&mut self, upstream: NodeIndex, downstream: NodeIndex) -> bool {
        let edge = self.graph.add_edge(upstream, downstream, 0);
        let cyclic = is_cyclic_directed(&self.graph);
        self.graph.remove_edge(edge);
        cyclic
    }

    fn nodes(&self) -> impl Iterator<Item = &LineageNode> {
        self.graph.node_weights().map(|entry| &entry.node)
    }
}

// ============================================================================
// Lineage Graph
// ============================================================================

/// A versioned lineage DAG mirrored to a [`LineageStore`].
///
/// An edge `upstream -> downstream` means "downstream depends on upstream".
/// The graph is acyclic before and after every public call, and every edge's
/// endpoints are present in the node set.
///
/// Mutating methods take `&mut self`; share a graph between threads through
/// [`crate::SharedLineageGraph`], which holds a lock for the whole
/// check-and-commit window.
pub struct LineageGraph {
    adjacency: Adjacency,
    store: LineageStore,
}

impl LineageGraph {
    /// Open a graph over `store`, rebuilding memory from the stored rows
    pub fn open(store: LineageStore) -> Result<Self, LineageError> {
        let mut graph = Self {
            adjacency: Adjacency::default(),
            store,
        };
        graph.reload()?;
        Ok(graph)
    }

    /// Create an empty graph over an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, LineageError> {
        Self::open(LineageStore::in_memory()?)
    }

    /// The backing store
    pub fn store(&self) -> &LineageStore {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Add a node. Adding a node that is already present is a no-op.
    ///
    /// Fails with [`LineageError::DataIntegrity`] if a node of another kind
    /// already holds the same name and version.
    pub fn add_node(&mut self, node: &LineageNode) -> Result<(), LineageError> {
        if self.adjacency.get(node.identity()).is_some() {
            return Ok(());
        }
        self.check_version_free(node)?;

        let tx = self.store.transaction()?;
        let (row_id, _) = tx.upsert_node(node)?;
        tx.commit()?;

        self.adjacency.attach_node(node.clone(), row_id);
        debug!(node = %node, row_id, "Added node");
        Ok(())
    }

    /// Remove a node and every edge touching it. Absent nodes are a no-op.
    pub fn remove_node(&mut self, node: impl AsRef<NodeIdentity>) -> Result<(), LineageError> {
        let identity = node.as_ref();
        let Some(idx) = self.adjacency.get(identity) else {
            return Ok(());
        };
        let row_id = self.adjacency.graph[idx].row_id;

        let tx = self.store.transaction()?;
        tx.delete_node(row_id)?;
        tx.commit()?;

        self.adjacency.detach_node(idx);
        debug!(node = %identity, row_id, "Removed node");
        Ok(())
    }

    /// Record that `downstream` depends on `upstream`.
    ///
    /// Missing endpoints are created first. A duplicate edge is a no-op. If
    /// the edge would close a cycle the call fails with
    /// [`LineageError::Cycle`] and the graph is unchanged.
    pub fn add_edge(
        &mut self,
        upstream: &LineageNode,
        downstream: &LineageNode,
    ) -> Result<(), LineageError> {
        let up = self.adjacency.get(upstream.identity());
        let down = self.adjacency.get(downstream.identity());

        match (up, down) {
            (Some(u), Some(d)) => {
                if self.adjacency.graph.find_edge(u, d).is_some() {
                    return Ok(());
                }
                if self.adjacency.closes_cycle(u, d) {
                    return Err(LineageError::cycle(
                        upstream.identity(),
                        downstream.identity(),
                    ));
                }
            }
            // A fresh node has no edges, so only a self-loop can close a cycle
            _ if upstream.identity() == downstream.identity() => {
                return Err(LineageError::cycle(
                    upstream.identity(),
                    downstream.identity(),
                ));
            }
            _ => {}
        }

        if up.is_none() {
            self.check_version_free(upstream)?;
        }
        if down.is_none() {
            self.check_version_free(downstream)?;
            if up.is_none()
                && upstream.name() == downstream.name()
                && upstream.version() == downstream.version()
            {
                return Err(version_conflict(downstream, upstream));
            }
        }

        let tx = self.store.transaction()?;
        let up_row = match up {
            Some(u) => self.adjacency.graph[u].row_id,
            None => tx.upsert_node(upstream)?.0,
        };
        let down_row = match down {
            Some(d) => self.adjacency.graph[d].row_id,
            None => tx.upsert_node(downstream)?.0,
        };
        let edge_row = tx.insert_edge(up_row, down_row)?;
        tx.commit()?;

        let u = match up {
            Some(u) => u,
            None => self.adjacency.attach_node(upstream.clone(), up_row),
        };
        let d = match down {
            Some(d) => d,
            None => self.adjacency.attach_node(downstream.clone(), down_row),
        };
        self.adjacency.attach_edge(u, d, edge_row);

        debug!(
            upstream = %upstream,
            downstream = %downstream,
            edge_row,
            "Added edge"
        );
        Ok(())
    }

    /// Remove the edge `upstream -> downstream`. Absent edges are a no-op.
    pub fn remove_edge(
        &mut self,
        upstream: impl AsRef<NodeIdentity>,
        downstream: impl AsRef<NodeIdentity>,
    ) -> Result<(), LineageError> {
        let (Some(u), Some(d)) = (
            self.adjacency.get(upstream.as_ref()),
            self.adjacency.get(downstream.as_ref()),
        ) else {
            return Ok(());
        };
        let Some(edge) = self.adjacency.graph.find_edge(u, d) else {
            return Ok(());
        };
        let up_row = self.adjacency.graph[u].row_id;
        let down_row = self.adjacency.graph[d].row_id;

        let tx = self.store.transaction()?;
        tx.delete_edge(up_row, down_row)?;
        tx.commit()?;

        self.adjacency.graph.remove_edge(edge);
        debug!(
            upstream = %upstream.as_ref(),
            downstream = %downstream.as_ref(),
            "Removed edge"
        );
        Ok(())
    }

    /// Rebuild memory from the store.
    ///
    /// Node rows are replayed first, each reconstructed through the factory,
    /// then edge rows. Edge rows with a missing endpoint, or that would close
    /// a cycle, are logged and skipped. Fails with
    /// [`LineageError::UnknownKind`] for an unsupported kind tag and
    /// [`LineageError::DataIntegrity`] when two nodes share a name and
    /// version. On failure the previous in-memory state is kept.
    pub fn reload(&mut self) -> Result<ReloadStats, LineageError> {
        let node_rows = self.store.query_all_nodes()?;
        let edge_rows = self.store.query_all_edges()?;

        let mut adjacency = Adjacency::default();
        let mut by_row: HashMap<i64, NodeIndex> = HashMap::with_capacity(node_rows.len());

        for row in node_rows {
            let mut node = NodeFactory::create(&row.kind, row.name, Some(row.version))?;
            if let Some(properties) = row.properties {
                node = node.with_properties(properties);
            }
            if adjacency.get(node.identity()).is_some() {
                warn!(row_id = row.id, node = %node, "Duplicate node row, keeping the first");
            }
            let idx = adjacency.attach_node(node, row.id);
            by_row.insert(row.id, idx);
        }

        let mut stats = ReloadStats::default();
        for row in edge_rows {
            let (Some(&u), Some(&d)) = (
                by_row.get(&row.from_node_id),
                by_row.get(&row.to_node_id),
            ) else {
                warn!(
                    edge_id = row.id,
                    from_node_id = row.from_node_id,
                    to_node_id = row.to_node_id,
                    "Skipping dangling edge row"
                );
                stats.skipped_edges += 1;
                continue;
            };
            if adjacency.graph.find_edge(u, d).is_some() {
                continue;
            }
            if adjacency.closes_cycle(u, d) {
                warn!(edge_id = row.id, "Skipping edge row that closes a cycle");
                stats.skipped_edges += 1;
                continue;
            }
            adjacency.attach_edge(u, d, row.id);
        }

        check_unique_versions(&adjacency)?;

        stats.nodes = adjacency.graph.node_count();
        stats.edges = adjacency.graph.edge_count();
        self.adjacency = adjacency;

        info!(
            nodes = stats.nodes,
            edges = stats.edges,
            skipped_edges = stats.skipped_edges,
            "Reloaded lineage graph"
        );
        Ok(stats)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Whether adding `upstream -> downstream` would make the graph cyclic.
    ///
    /// The graph is acyclic, so this holds exactly when `downstream` already
    /// reaches `upstream` (or both are the same node).
    pub fn would_create_cycle(
        &self,
        upstream: impl AsRef<NodeIdentity>,
        downstream: impl AsRef<NodeIdentity>,
    ) -> bool {
        let (upstream, downstream) = (upstream.as_ref(), downstream.as_ref());
        if upstream == downstream {
            return true;
        }
        match (self.adjacency.get(upstream), self.adjacency.get(downstream)) {
            (Some(u), Some(d)) => has_path_connecting(&self.adjacency.graph, d, u, None),
            _ => false,
        }
    }

    /// Look up a node by identity
    pub fn get(&self, identity: &NodeIdentity) -> Option<&LineageNode> {
        self.adjacency
            .get(identity)
            .map(|idx| &self.adjacency.graph[idx].node)
    }

    /// Find the node with exactly this name and version, of any kind
    pub fn find_node(&self, name: &str, version: i64) -> Option<&LineageNode> {
        self.adjacency
            .nodes()
            .filter(|node| node.name() == name && node.version() == version)
            .min_by(|a, b| a.identity().cmp(b.identity()))
    }

    /// The node with the highest version among all nodes named `name`.
    ///
    /// Fails with [`LineageError::DataIntegrity`] if two nodes share that
    /// version.
    pub fn latest_version(&self, name: &str) -> Result<Option<&LineageNode>, LineageError> {
        latest_of(
            name,
            self.adjacency.nodes().filter(|node| node.name() == name),
        )
    }

    /// All nodes named `name`, oldest version first
    pub fn versions(&self, name: &str) -> Vec<&LineageNode> {
        let mut nodes: Vec<&LineageNode> = self
            .adjacency
            .nodes()
            .filter(|node| node.name() == name)
            .collect();
        nodes.sort_by_key(|node| (node.version(), node.kind()));
        nodes
    }

    /// Every node `node` transitively depends on
    pub fn upstream(&self, node: impl AsRef<NodeIdentity>) -> Vec<&LineageNode> {
        let Some(start) = self.adjacency.get(node.as_ref()) else {
            return Vec::new();
        };
        let reversed = Reversed(&self.adjacency.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut found = Vec::new();
        while let Some(idx) = dfs.next(reversed) {
            if idx != start {
                found.push(idx);
            }
        }
        self.sorted_nodes(found)
    }

    /// Every node that transitively depends on `node`
    pub fn downstream(&self, node: impl AsRef<NodeIdentity>) -> Vec<&LineageNode> {
        let Some(start) = self.adjacency.get(node.as_ref()) else {
            return Vec::new();
        };
        let mut dfs = Dfs::new(&self.adjacency.graph, start);
        let mut found = Vec::new();
        while let Some(idx) = dfs.next(&self.adjacency.graph) {
            if idx != start {
                found.push(idx);
            }
        }
        self.sorted_nodes(found)
    }

    /// Nodes ordered so that every upstream precedes its downstreams
    pub fn topological_order(&self) -> Result<Vec<&LineageNode>, LineageError> {
        let order = toposort(&self.adjacency.graph, None).map_err(|cycle| {
            LineageError::data_integrity(format!(
                "graph contains a cycle through {}",
                self.adjacency.graph[cycle.node_id()].node
            ))
        })?;
        Ok(order
            .into_iter()
            .map(|idx| &self.adjacency.graph[idx].node)
            .collect())
    }

    /// Check whether a node is present
    pub fn contains_node(&self, node: impl AsRef<NodeIdentity>) -> bool {
        self.adjacency.index.contains_key(node.as_ref())
    }

    /// Check whether the edge `upstream -> downstream` is present
    pub fn contains_edge(
        &self,
        upstream: impl AsRef<NodeIdentity>,
        downstream: impl AsRef<NodeIdentity>,
    ) -> bool {
        match (
            self.adjacency.get(upstream.as_ref()),
            self.adjacency.get(downstream.as_ref()),
        ) {
            (Some(u), Some(d)) => self.adjacency.graph.find_edge(u, d).is_some(),
            _ => false,
        }
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.adjacency.graph.node_count()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.adjacency.graph.edge_count()
    }

    /// Iterate over all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &LineageNode> {
        self.adjacency.nodes()
    }

    /// Iterate over all edges as (upstream, downstream) pairs
    pub fn edges(&self) -> impl Iterator<Item = (&LineageNode, &LineageNode)> {
        let graph = &self.adjacency.graph;
        graph
            .edge_references()
            .map(move |edge| (&graph[edge.source()].node, &graph[edge.target()].node))
    }

    fn sorted_nodes(&self, indices: Vec<NodeIndex>) -> Vec<&LineageNode> {
        let mut nodes: Vec<&LineageNode> = indices
            .into_iter()
            .map(|idx| &self.adjacency.graph[idx].node)
            .collect();
        nodes.sort_by(|a, b| a.identity().cmp(b.identity()));
        nodes
    }

    /// Name and version must stay unique across kinds
    fn check_version_free(&self, node: &LineageNode) -> Result<(), LineageError> {
        match self.find_node(node.name(), node.version()) {
            Some(existing) if existing.identity() != node.identity() => {
                Err(version_conflict(node, existing))
            }
            _ => Ok(()),
        }
    }
}

fn version_conflict(node: &LineageNode, existing: &LineageNode) -> LineageError {
    LineageError::data_integrity(format!(
        "cannot add {node}: version {} of '{}' is already held by {existing}",
        node.version(),
        node.name()
    ))
}

/// Highest-version node among `candidates`, rejecting ties
fn latest_of<'a>(
    name: &str,
    candidates: impl Iterator<Item = &'a LineageNode>,
) -> Result<Option<&'a LineageNode>, LineageError> {
    let mut latest: Option<&LineageNode> = None;
    let mut tied = false;

    for node in candidates {
        match latest {
            Some(current) if node.version() < current.version() => {}
            Some(current) if node.version() == current.version() => tied = true,
            _ => {
                latest = Some(node);
                tied = false;
            }
        }
    }

    match latest {
        Some(node) if tied => Err(LineageError::data_integrity(format!(
            "multiple nodes named '{name}' share the latest version {}",
            node.version()
        ))),
        _ => Ok(latest),
    }
}

/// Name and version must identify at most one node, whatever its kind
fn check_unique_versions(adjacency: &Adjacency) -> Result<(), LineageError> {
    let mut holders: HashMap<(&str, i64), &LineageNode> = HashMap::new();
    for node in adjacency.nodes() {
        if let Some(existing) = holders.insert((node.name(), node.version()), node) {
            let (first, second) = if existing.identity() < node.identity() {
                (existing, node)
            } else {
                (node, existing)
            };
            return Err(LineageError::data_integrity(format!(
                "{first} and {second} share version {} of '{}'",
                node.version(),
                node.name()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    fn node(name: &str) -> LineageNode {
        NodeFactory::create("Node", name, None).unwrap()
    }

    fn versioned(kind: &str, name: &str, version: i64) -> LineageNode {
        NodeFactory::create(kind, name, Some(version)).unwrap()
    }

    fn names(nodes: Vec<&LineageNode>) -> Vec<String> {
        nodes.into_iter().map(|n| n.name().to_string()).collect()
    }

    #[test]
    fn test_empty_graph() {
        let graph = LineageGraph::in_memory().unwrap();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.latest_version("anything").unwrap().is_none());
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let a = node("a");

        graph.add_node(&a).unwrap();
        graph.add_node(&a).unwrap();

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.store().node_count().unwrap(), 1);
        assert!(graph.contains_node(&a));
    }

    #[test]
    fn test_remove_node_is_idempotent() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let a = node("a");
        graph.add_node(&a).unwrap();

        graph.remove_node(&a).unwrap();
        graph.remove_node(&a).unwrap();

        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.store().node_count().unwrap(), 0);
    }

    #[test]
    fn test_remove_node_drops_touching_edges() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let (a, b, c) = (node("a"), node("b"), node("c"));
        graph.add_edge(&a, &b).unwrap();
        graph.add_edge(&b, &c).unwrap();

        graph.remove_node(&b).unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.store().edge_count().unwrap(), 0);
    }

    #[test]
    fn test_linear_chain_rejects_back_edge() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let (a, b) = (node("a"), node("b"));
        graph.add_node(&a).unwrap();
        graph.add_node(&b).unwrap();

        graph.add_edge(&a, &b).unwrap();
        let err = graph.add_edge(&b, &a).unwrap_err();

        match err {
            LineageError::Cycle {
                upstream,
                downstream,
            } => {
                assert_eq!(&upstream, b.identity());
                assert_eq!(&downstream, a.identity());
            }
            other => panic!("expected cycle error, got {other}"),
        }
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains_edge(&a, &b));
        assert_eq!(graph.store().edge_count().unwrap(), 1);
    }

    #[test]
    fn test_long_cycle_rejected() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let nodes: Vec<LineageNode> = ["a", "b", "c", "d"].into_iter().map(node).collect();
        for pair in nodes.windows(2) {
            graph.add_edge(&pair[0], &pair[1]).unwrap();
        }

        assert!(graph.add_edge(&nodes[3], &nodes[0]).is_err());
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_self_loop_rejected_without_creating_node() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let a = node("a");

        let err = graph.add_edge(&a, &a).unwrap_err();

        assert!(matches!(err, LineageError::Cycle { .. }));
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.store().node_count().unwrap(), 0);
    }

    #[test]
    fn test_add_edge_creates_missing_endpoints() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let x = versioned("Node", "x", 1);
        let y = versioned("Node", "y", 1);

        graph.add_edge(&x, &y).unwrap();

        assert!(graph.contains_node(&x));
        assert!(graph.contains_node(&y));
        assert!(graph.contains_edge(&x, &y));
        assert_eq!(graph.store().node_count().unwrap(), 2);
        assert_eq!(graph.store().edge_count().unwrap(), 1);
    }

    #[test]
    fn test_add_edge_is_idempotent() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let (a, b) = (node("a"), node("b"));

        graph.add_edge(&a, &b).unwrap();
        graph.add_edge(&a, &b).unwrap();

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.store().edge_count().unwrap(), 1);
    }

    #[test]
    fn test_diamond_with_redundant_edge() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let (a, b, c, d) = (node("a"), node("b"), node("c"), node("d"));

        graph.add_edge(&a, &b).unwrap();
        graph.add_edge(&a, &c).unwrap();
        graph.add_edge(&b, &d).unwrap();
        graph.add_edge(&c, &d).unwrap();
        graph.add_edge(&a, &d).unwrap();

        assert_eq!(graph.edge_count(), 5);
        assert!(graph.add_edge(&d, &a).is_err());
    }

    #[test]
    fn test_remove_edge_is_idempotent() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let (a, b, c) = (node("a"), node("b"), node("c"));
        graph.add_edge(&a, &b).unwrap();
        graph.add_edge(&b, &c).unwrap();

        graph.remove_edge(&a, &b).unwrap();
        graph.remove_edge(&a, &b).unwrap();

        assert!(!graph.contains_edge(&a, &b));
        assert!(graph.contains_edge(&b, &c));
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.store().edge_count().unwrap(), 1);
    }

    #[test]
    fn test_remove_edge_unknown_nodes() {
        let mut graph = LineageGraph::in_memory().unwrap();
        graph.remove_edge(&node("ghost"), &node("phantom")).unwrap();
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_would_create_cycle() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let (a, b, c) = (node("a"), node("b"), node("c"));
        graph.add_edge(&a, &b).unwrap();

        assert!(graph.would_create_cycle(&b, &a));
        assert!(!graph.would_create_cycle(&a, &c));
        assert!(!graph.would_create_cycle(&c, &a));
        assert!(graph.would_create_cycle(&c, &c));

        graph.add_edge(&b, &c).unwrap();
        assert!(!graph.would_create_cycle(&a, &c));
        assert!(graph.would_create_cycle(&c, &a));

        // The predicate never mutates
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_would_create_cycle_agrees_with_add_edge() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let nodes: Vec<LineageNode> = ["a", "b", "c", "d", "e"].into_iter().map(node).collect();
        graph.add_edge(&nodes[0], &nodes[1]).unwrap();
        graph.add_edge(&nodes[1], &nodes[2]).unwrap();
        graph.add_edge(&nodes[3], &nodes[2]).unwrap();
        graph.add_edge(&nodes[2], &nodes[4]).unwrap();

        for up in &nodes {
            for down in &nodes {
                let predicted = graph.would_create_cycle(up, down);
                let already = graph.contains_edge(up, down);
                let result = graph.add_edge(up, down);
                assert_eq!(predicted, result.is_err(), "{up} -> {down}");
                if !already && result.is_ok() {
                    graph.remove_edge(up, down).unwrap();
                }
            }
        }
    }

    #[test]
    fn test_find_node() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let v1 = versioned("Node", "test", 1);
        let v2 = versioned("Node", "test", 2);
        graph.add_node(&v1).unwrap();
        graph.add_node(&v2).unwrap();

        assert_eq!(graph.find_node("test", 1), Some(&v1));
        assert_eq!(graph.find_node("test", 2), Some(&v2));
        assert_eq!(graph.find_node("test", 3), None);
    }

    #[test]
    fn test_latest_version() {
        let mut graph = LineageGraph::in_memory().unwrap();
        for version in [1, 5, 2] {
            graph.add_node(&versioned("PostgresTable", "t", version)).unwrap();
        }
        graph.add_node(&node("other")).unwrap();

        let latest = graph.latest_version("t").unwrap().unwrap();
        assert_eq!(latest.version(), 5);
        assert!(graph.latest_version("missing").unwrap().is_none());
    }

    #[test]
    fn test_latest_version_spans_kinds() {
        let mut graph = LineageGraph::in_memory().unwrap();
        graph.add_node(&versioned("GoogleCloudStorageObject", "t", 1)).unwrap();
        graph.add_node(&versioned("BigQueryTable", "t", 2)).unwrap();

        let latest = graph.latest_version("t").unwrap().unwrap();
        assert_eq!(latest.kind(), NodeKind::BigQueryTable);
    }

    #[test]
    fn test_add_node_rejects_shared_version_across_kinds() {
        let mut graph = LineageGraph::in_memory().unwrap();
        graph.add_node(&versioned("Node", "t", 1)).unwrap();

        let err = graph
            .add_node(&versioned("PostgresTable", "t", 1))
            .unwrap_err();

        assert!(matches!(err, LineageError::DataIntegrity(_)));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_add_edge_rejects_conflicting_new_endpoints() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let up = versioned("Node", "t", 1);
        let down = versioned("BigQueryTable", "t", 1);

        let err = graph.add_edge(&up, &down).unwrap_err();

        assert!(matches!(err, LineageError::DataIntegrity(_)));
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.store().node_count().unwrap(), 0);
    }

    #[test]
    fn test_versions_sorted() {
        let mut graph = LineageGraph::in_memory().unwrap();
        for version in [3, 1, 2] {
            graph.add_node(&versioned("Node", "t", version)).unwrap();
        }
        let versions: Vec<i64> = graph.versions("t").into_iter().map(|n| n.version()).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn test_upstream_and_downstream() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let (a, b, c, d, e) = (node("a"), node("b"), node("c"), node("d"), node("e"));
        graph.add_edge(&a, &b).unwrap();
        graph.add_edge(&b, &d).unwrap();
        graph.add_edge(&c, &d).unwrap();
        graph.add_edge(&d, &e).unwrap();

        assert_eq!(names(graph.upstream(&d)), vec!["a", "b", "c"]);
        assert_eq!(names(graph.downstream(&b)), vec!["d", "e"]);
        assert!(graph.upstream(&a).is_empty());
        assert!(graph.downstream(&node("missing")).is_empty());
    }

    #[test]
    fn test_topological_order() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let (a, b, c) = (node("a"), node("b"), node("c"));
        graph.add_edge(&b, &c).unwrap();
        graph.add_edge(&a, &b).unwrap();

        let order = names(graph.topological_order().unwrap());
        let position = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(position("a") < position("b"));
        assert!(position("b") < position("c"));
    }

    #[test]
    fn test_edges_iteration() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let (a, b) = (node("a"), node("b"));
        graph.add_edge(&a, &b).unwrap();

        let edges: Vec<(&LineageNode, &LineageNode)> = graph.edges().collect();
        assert_eq!(edges, vec![(&a, &b)]);
    }

    #[test]
    fn test_store_failure_leaves_graph_unchanged() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let (a, b) = (node("a"), node("b"));
        graph.add_node(&a).unwrap();
        graph
            .store
            .connection()
            .execute_batch("DROP TABLE edges")
            .unwrap();

        let err = graph.add_edge(&a, &b).unwrap_err();

        assert!(matches!(err, LineageError::Store(_)));
        assert!(!graph.contains_node(&b));
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.store().node_count().unwrap(), 1);
    }

    #[test]
    fn test_reload_rebuilds_same_graph() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let (a, b, c) = (
            versioned("BigQueryTable", "a", 1),
            versioned("PostgresTable", "b", 2),
            versioned("GoogleCloudStorageObject", "c", 1),
        );
        graph.add_edge(&a, &b).unwrap();
        graph.add_edge(&b, &c).unwrap();

        let stats = graph.reload().unwrap();

        assert_eq!(
            stats,
            ReloadStats {
                nodes: 3,
                edges: 2,
                skipped_edges: 0
            }
        );
        assert!(graph.contains_edge(&a, &b));
        assert!(graph.contains_edge(&b, &c));
        assert_eq!(graph.get(b.identity()).unwrap().color(), "red");
    }

    #[test]
    fn test_reload_skips_dangling_edges() {
        let mut graph = LineageGraph::in_memory().unwrap();
        graph.add_edge(&node("a"), &node("b")).unwrap();
        {
            let conn = graph.store.connection();
            conn.pragma_update(None, "foreign_keys", "OFF").unwrap();
            conn.execute(
                "INSERT INTO edges (from_node_id, to_node_id) VALUES (1, 999)",
                [],
            )
            .unwrap();
            conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        }

        let stats = graph.reload().unwrap();

        assert_eq!(stats.edges, 1);
        assert_eq!(stats.skipped_edges, 1);
    }

    #[test]
    fn test_reload_rejects_unknown_kind_and_keeps_state() {
        let mut graph = LineageGraph::in_memory().unwrap();
        graph.add_node(&node("a")).unwrap();
        graph
            .store
            .connection()
            .execute(
                "INSERT INTO nodes (kind, name, version) VALUES ('RedshiftTable', 'r', 1)",
                [],
            )
            .unwrap();

        let err = graph.reload().unwrap_err();

        assert!(matches!(err, LineageError::UnknownKind { ref tag } if tag == "RedshiftTable"));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_reload_rejects_shared_latest_version() {
        let mut graph = LineageGraph::in_memory().unwrap();
        graph.add_node(&versioned("Node", "t", 5)).unwrap();
        graph
            .store
            .connection()
            .execute(
                "INSERT INTO nodes (kind, name, version) VALUES ('PostgresTable', 't', 5)",
                [],
            )
            .unwrap();

        let err = graph.reload().unwrap_err();
        assert!(matches!(err, LineageError::DataIntegrity(_)));
    }

    #[test]
    fn test_reload_rejects_shared_older_version() {
        let mut graph = LineageGraph::in_memory().unwrap();
        graph.add_node(&versioned("Node", "t", 1)).unwrap();
        graph.add_node(&versioned("Node", "t", 2)).unwrap();
        graph
            .store
            .connection()
            .execute(
                "INSERT INTO nodes (kind, name, version) VALUES ('PostgresTable', 't', 1)",
                [],
            )
            .unwrap();

        let err = graph.reload().unwrap_err();

        assert!(
            matches!(err, LineageError::DataIntegrity(ref msg) if msg.contains("version 1 of 't'"))
        );
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.find_node("t", 1).unwrap().kind(), NodeKind::Generic);
    }
}
