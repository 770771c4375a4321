//! Node Factory
//!
//! The single place lineage nodes are constructed. Kind tags arriving from
//! callers or from stored rows are resolved here against the closed set of
//! [`NodeKind`]s.

use crate::error::LineageError;
use crate::node::{LineageNode, NodeIdentity, NodeKind, DEFAULT_VERSION};

/// Resolves a kind tag plus constructor arguments into a [`LineageNode`].
pub struct NodeFactory;

impl NodeFactory {
    /// Create a node from a kind tag.
    ///
    /// `version` defaults to [`DEFAULT_VERSION`] when `None`. Unknown tags fail
    /// with [`LineageError::UnknownKind`]; an empty name fails with
    /// [`LineageError::InvalidArgument`].
    pub fn create(
        kind_tag: &str,
        name: impl Into<String>,
        version: Option<i64>,
    ) -> Result<LineageNode, LineageError> {
        let kind: NodeKind = kind_tag.parse()?;
        Self::create_kind(kind, name, version)
    }

    /// Create a node when the kind is already known at compile time
    pub fn create_kind(
        kind: NodeKind,
        name: impl Into<String>,
        version: Option<i64>,
    ) -> Result<LineageNode, LineageError> {
        let identity = NodeIdentity::new(kind, name, version.unwrap_or(DEFAULT_VERSION))?;
        Ok(LineageNode::new(identity))
    }
}
