//! Common test utilities for integration tests.
//!
//! Builders for sample nodes plus invariant checks shared across the
//! integration test files.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;

use dvgraph_core::{LineageGraph, LineageNode, LineageStore, NodeFactory, StoreOptions};

/// A generic node at the default version
pub fn node(name: &str) -> LineageNode {
    NodeFactory::create("Node", name, None).unwrap()
}

/// A node of a given kind and version
pub fn versioned(kind: &str, name: &str, version: i64) -> LineageNode {
    NodeFactory::create(kind, name, Some(version)).unwrap()
}

/// Open a graph backed by a database file
pub fn open_graph(path: &Path) -> LineageGraph {
    let store = LineageStore::open(path, &StoreOptions::default()).unwrap();
    LineageGraph::open(store).unwrap()
}

/// Check every structural invariant the graph promises:
/// acyclic, edges only between present nodes, memory and store in step.
pub fn assert_consistent(graph: &LineageGraph) {
    assert!(
        graph.topological_order().is_ok(),
        "graph must stay acyclic"
    );

    let identities: HashSet<_> = graph.nodes().map(|n| n.identity().clone()).collect();
    for (up, down) in graph.edges() {
        assert!(identities.contains(up.identity()), "dangling upstream {up}");
        assert!(identities.contains(down.identity()), "dangling downstream {down}");
    }

    assert_eq!(graph.store().node_count().unwrap(), graph.node_count());
    assert_eq!(graph.store().edge_count().unwrap(), graph.edge_count());
}
