//! Node Identity and Kinds
//!
//! This module defines the value types that identify a lineage asset:
//! - `NodeKind`: the closed set of storage backends an asset can live in
//! - `NodeIdentity`: the (kind, name, version) key that defines node identity
//! - `LineageNode`: an identity plus its optional property bag
//!
//! Equality and hashing are both derived over the full (kind, name, version)
//! triple. Properties never take part in identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LineageError;

/// Version assigned when a caller does not supply one.
pub const DEFAULT_VERSION: i64 = 1;

// ============================================================================
// Node Kinds
// ============================================================================

/// Kinds of lineage assets.
///
/// The tag strings are stable: they are what the store persists in the
/// `nodes.kind` column and what callers pass to the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// Generic table with no particular backend
    #[serde(rename = "Node")]
    Generic,
    /// Warehouse table (BigQuery)
    BigQueryTable,
    /// Relational table (PostgreSQL)
    PostgresTable,
    /// Object-store blob (Google Cloud Storage)
    GoogleCloudStorageObject,
}

impl NodeKind {
    /// Every known kind, in declaration order.
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Generic,
        NodeKind::BigQueryTable,
        NodeKind::PostgresTable,
        NodeKind::GoogleCloudStorageObject,
    ];

    /// Get the kind tag as stored and accepted by the factory
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Generic => "Node",
            NodeKind::BigQueryTable => "BigQueryTable",
            NodeKind::PostgresTable => "PostgresTable",
            NodeKind::GoogleCloudStorageObject => "GoogleCloudStorageObject",
        }
    }

    /// Display color used when rendering the graph
    pub fn color(&self) -> &'static str {
        match self {
            NodeKind::Generic => "black",
            NodeKind::BigQueryTable => "blue",
            NodeKind::PostgresTable => "red",
            NodeKind::GoogleCloudStorageObject => "green",
        }
    }

    /// Resolve a kind tag. Matching is exact.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| LineageError::unknown_kind(s))
    }
}

// ============================================================================
// Node Identity
// ============================================================================

/// Immutable (kind, name, version) key of a lineage asset.
///
/// A new version of an asset is a new identity, never an edit of an
/// existing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIdentity {
    kind: NodeKind,
    name: String,
    version: i64,
}

impl NodeIdentity {
    /// Create an identity. The name must be non-empty.
    pub fn new(kind: NodeKind, name: impl Into<String>, version: i64) -> Result<Self, LineageError> {
        let name = name.into();
        if name.is_empty() {
            return Err(LineageError::invalid_argument("node name must not be empty"));
        }
        Ok(Self {
            kind,
            name,
            version,
        })
    }

    /// Create an identity at the default version
    pub fn unversioned(kind: NodeKind, name: impl Into<String>) -> Result<Self, LineageError> {
        Self::new(kind, name, DEFAULT_VERSION)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> i64 {
        self.version
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(name={}, version={})",
            self.kind.as_str(),
            self.name,
            self.version
        )
    }
}

impl AsRef<NodeIdentity> for NodeIdentity {
    fn as_ref(&self) -> &NodeIdentity {
        self
    }
}

// ============================================================================
// Lineage Node
// ============================================================================

/// A lineage asset: its identity and an optional opaque property bag.
///
/// Construct through [`crate::NodeFactory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageNode {
    identity: NodeIdentity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
}

impl LineageNode {
    pub(crate) fn new(identity: NodeIdentity) -> Self {
        Self {
            identity,
            properties: None,
        }
    }

    /// Attach a property bag. An empty map is stored as no properties.
    pub fn with_properties(mut self, properties: serde_json::Map<String, serde_json::Value>) -> Self {
        self.properties = if properties.is_empty() {
            None
        } else {
            Some(properties)
        };
        self
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn kind(&self) -> NodeKind {
        self.identity.kind
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn version(&self) -> i64 {
        self.identity.version
    }

    /// Display color, determined solely by kind
    pub fn color(&self) -> &'static str {
        self.identity.kind.color()
    }

    pub fn properties(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.properties.as_ref()
    }
}

impl PartialEq for LineageNode {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for LineageNode {}

impl std::hash::Hash for LineageNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl AsRef<NodeIdentity> for LineageNode {
    fn as_ref(&self) -> &NodeIdentity {
        &self.identity
    }
}

impl fmt::Display for LineageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.identity, f)
    }
}
