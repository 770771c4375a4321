//! Graph Export
//!
//! Renders a [`LineageGraph`] for people and tools:
//! - Graphviz DOT, one box per node colored by kind
//! - A serde snapshot (nodes plus edges) for JSON output and comparisons
//!
//! Both outputs are sorted by identity so they are stable across runs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::LineageGraph;
use crate::node::{LineageNode, NodeIdentity, NodeKind};

/// A node as it appears in a [`GraphSnapshot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub kind: NodeKind,
    pub name: String,
    pub version: i64,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

impl From<&LineageNode> for SnapshotNode {
    fn from(node: &LineageNode) -> Self {
        Self {
            kind: node.kind(),
            name: node.name().to_string(),
            version: node.version(),
            color: node.color().to_string(),
            properties: node.properties().cloned(),
        }
    }
}

/// An edge as it appears in a [`GraphSnapshot`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub upstream: NodeIdentity,
    pub downstream: NodeIdentity,
}

/// Point-in-time copy of the whole graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<SnapshotNode>,
    pub edges: Vec<SnapshotEdge>,
}

impl LineageGraph {
    /// Copy the graph into a serializable snapshot
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<&LineageNode> = self.nodes().collect();
        nodes.sort_by(|a, b| a.identity().cmp(b.identity()));

        let mut edges: Vec<SnapshotEdge> = self
            .edges()
            .map(|(upstream, downstream)| SnapshotEdge {
                upstream: upstream.identity().clone(),
                downstream: downstream.identity().clone(),
            })
            .collect();
        edges.sort();

        GraphSnapshot {
            nodes: nodes.into_iter().map(SnapshotNode::from).collect(),
            edges,
        }
    }

    /// Graphviz view of the graph, rendered through `Display`
    pub fn dot(&self) -> DotExport {
        DotExport {
            snapshot: self.snapshot(),
        }
    }

    /// Render the graph as a Graphviz digraph
    pub fn to_dot(&self) -> String {
        self.dot().to_string()
    }
}

/// A graph snapshot formatted as Graphviz DOT
#[derive(Debug, Clone)]
pub struct DotExport {
    snapshot: GraphSnapshot,
}

impl fmt::Display for DotExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph lineage {{")?;
        writeln!(f, "  rankdir=LR;")?;
        writeln!(f, "  node [shape=box];")?;
        for node in &self.snapshot.nodes {
            let label = dot_label(node.kind, &node.name, node.version);
            writeln!(f, "  \"{label}\" [color={}];", node.color)?;
        }
        for edge in &self.snapshot.edges {
            writeln!(
                f,
                "  \"{}\" -> \"{}\";",
                dot_label(edge.upstream.kind(), edge.upstream.name(), edge.upstream.version()),
                dot_label(
                    edge.downstream.kind(),
                    edge.downstream.name(),
                    edge.downstream.version()
                ),
            )?;
        }
        writeln!(f, "}}")
    }
}

fn dot_label(kind: NodeKind, name: &str, version: i64) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{kind}(name={escaped}, version={version})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::NodeFactory;
    use pretty_assertions::assert_eq;

    fn sample() -> LineageGraph {
        let mut graph = LineageGraph::in_memory().unwrap();
        let raw = NodeFactory::create("GoogleCloudStorageObject", "raw", None).unwrap();
        let events = NodeFactory::create("BigQueryTable", "events", Some(2)).unwrap();
        graph.add_edge(&raw, &events).unwrap();
        graph
    }

    #[test]
    fn test_to_dot() {
        let dot = sample().to_dot();
        assert_eq!(
            dot,
            "digraph lineage {\n\
             \x20 rankdir=LR;\n\
             \x20 node [shape=box];\n\
             \x20 \"BigQueryTable(name=events, version=2)\" [color=blue];\n\
             \x20 \"GoogleCloudStorageObject(name=raw, version=1)\" [color=green];\n\
             \x20 \"GoogleCloudStorageObject(name=raw, version=1)\" -> \"BigQueryTable(name=events, version=2)\";\n\
             }\n"
        );
    }

    #[test]
    fn test_dot_display_matches_to_dot() {
        let graph = sample();
        assert_eq!(format!("{}", graph.dot()), graph.to_dot());
    }

    #[test]
    fn test_dot_escapes_quotes() {
        let mut graph = LineageGraph::in_memory().unwrap();
        let odd = NodeFactory::create("Node", "say \"hi\"", None).unwrap();
        graph.add_node(&odd).unwrap();

        assert!(graph
            .to_dot()
            .contains("\"Node(name=say \\\"hi\\\", version=1)\" [color=black]"));
    }

    #[test]
    fn test_snapshot() {
        let snapshot = sample().snapshot();

        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[0].name, "events");
        assert_eq!(snapshot.nodes[0].color, "blue");
        assert_eq!(snapshot.edges.len(), 1);
        assert_eq!(snapshot.edges[0].upstream.name(), "raw");
        assert_eq!(snapshot.edges[0].downstream.name(), "events");
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json = serde_json::to_value(sample().snapshot()).unwrap();

        assert_eq!(json["nodes"][0]["kind"], "BigQueryTable");
        assert_eq!(json["edges"][0]["upstream"]["kind"], "GoogleCloudStorageObject");
        assert!(json["nodes"][0].get("properties").is_none());
    }
}
