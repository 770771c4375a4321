//! Lineage error types.

use thiserror::Error;

use crate::node::NodeIdentity;
use crate::store::StoreError;

/// Errors returned by the factory and the lineage graph.
#[derive(Debug, Error)]
pub enum LineageError {
    /// Kind tag outside the known set
    #[error("unknown node kind: '{tag}'")]
    UnknownKind { tag: String },

    /// A value the operation cannot accept
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The edge would close a cycle; the graph is unchanged
    #[error("adding edge {upstream} -> {downstream} would create a cycle")]
    Cycle {
        upstream: NodeIdentity,
        downstream: NodeIdentity,
    },

    /// The persistent store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Stored or in-memory data violates a documented invariant
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),
}

impl LineageError {
    /// Create an UnknownKind error.
    pub fn unknown_kind(tag: impl Into<String>) -> Self {
        Self::UnknownKind { tag: tag.into() }
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a Cycle error for the rejected edge.
    pub fn cycle(upstream: &NodeIdentity, downstream: &NodeIdentity) -> Self {
        Self::Cycle {
            upstream: upstream.clone(),
            downstream: downstream.clone(),
        }
    }

    /// Create a DataIntegrity error.
    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrity(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn test_error_display() {
        let err = LineageError::unknown_kind("Parquet");
        assert_eq!(err.to_string(), "unknown node kind: 'Parquet'");

        let err = LineageError::data_integrity("two nodes named 't' share version 5");
        assert!(err.to_string().contains("data integrity"));
    }

    #[test]
    fn test_cycle_error_names_edge() {
        let a = NodeIdentity::unversioned(NodeKind::Generic, "a").unwrap();
        let b = NodeIdentity::unversioned(NodeKind::Generic, "b").unwrap();
        let err = LineageError::cycle(&b, &a);

        assert_eq!(
            err.to_string(),
            "adding edge Node(name=b, version=1) -> Node(name=a, version=1) would create a cycle"
        );
    }

    #[test]
    fn test_store_error_converts() {
        let err = LineageError::from(StoreError::SchemaVersionMismatch {
            expected: "1".to_string(),
            found: "0".to_string(),
        });
        assert!(matches!(err, LineageError::Store(_)));
        assert!(err.to_string().starts_with("store error: Schema version mismatch"));
    }
}
