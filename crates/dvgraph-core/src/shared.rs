//! Thread-shareable handle to a lineage graph.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::graph::LineageGraph;

/// A cloneable handle that serializes all access to one [`LineageGraph`].
///
/// The cycle check and the store commit of a mutation run under the same
/// lock, so two concurrent `add_edge` calls can never jointly close a cycle.
#[derive(Clone)]
pub struct SharedLineageGraph {
    inner: Arc<Mutex<LineageGraph>>,
}

impl SharedLineageGraph {
    pub fn new(graph: LineageGraph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Lock the graph for the duration of the guard
    pub fn lock(&self) -> MutexGuard<'_, LineageGraph> {
        self.inner.lock()
    }
}

impl From<LineageGraph> for SharedLineageGraph {
    fn from(graph: LineageGraph) -> Self {
        Self::new(graph)
    }
}
