//! dvgraph Core - Versioned data lineage graph
//!
//! This crate provides the core functionality for tracking data lineage:
//! - Typed, versioned node identities for tables and objects across backends
//! - A factory that resolves kind tags into nodes
//! - An acyclic lineage graph with dependency queries
//! - Write-through persistence to SQLite with reload on startup
//! - DOT and JSON exports

pub mod builder;
pub mod error;
pub mod export;
pub mod factory;
pub mod graph;
pub mod node;
pub mod shared;
pub mod store;

// Re-exports for convenience
pub use builder::LineageBuilder;
pub use error::LineageError;
pub use export::{DotExport, GraphSnapshot, SnapshotEdge, SnapshotNode};
pub use factory::NodeFactory;
pub use graph::{LineageGraph, ReloadStats};
pub use node::{LineageNode, NodeIdentity, NodeKind, DEFAULT_VERSION};
pub use shared::SharedLineageGraph;
pub use store::{EdgeRow, LineageStore, NodeRow, StoreError, StoreOptions, StoreTransaction};
