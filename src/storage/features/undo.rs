use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::storage::graph::CoreObject;
use crate::types::{EdgeId, VertexId};

/// Identifier of one recorded undo step.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct UndoStepId(pub u64);

impl fmt::Display for UndoStepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "undo#{}", self.0)
    }
}

/// Monotonic source of [`UndoStepId`]s.
#[derive(Debug, Default)]
pub struct UndoStepIds {
    next: AtomicU64,
}

impl UndoStepIds {
    /// Hands out the next unused id.
    pub fn next_id(&self) -> UndoStepId {
        UndoStepId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Per-feature undo storage keyed by undo step.
///
/// Snapshots are exact copies of the value at `store` time; whether an
/// object had a value is decided by map membership, never by comparing with
/// a sentinel. None of these operations notify change listeners.
pub trait FeatureUndo<K>: Send + Sync {
    /// Snapshots the current value of `obj` under `step` if it has one.
    fn store(&self, step: UndoStepId, obj: K);

    /// Restores the snapshot under `step` (consuming it), or unsets `obj`
    /// when nothing was snapshotted.
    fn retrieve(&self, step: UndoStepId, obj: K);

    /// Exchanges the current value of `obj` with the snapshot under `step`.
    ///
    /// Correct whether either side is set or not; applying it twice is the
    /// identity.
    fn swap(&self, step: UndoStepId, obj: K);

    /// Drops the snapshot under `step`.
    fn clear(&self, step: UndoStepId);
}

/// Undo access to a materialized map, with its key type erased.
#[derive(Clone)]
pub enum ErasedUndo {
    /// Map keyed by vertices.
    Vertex(Arc<dyn FeatureUndo<VertexId>>),
    /// Map keyed by edges.
    Edge(Arc<dyn FeatureUndo<EdgeId>>),
}

impl ErasedUndo {
    /// Drops the snapshot under `step`, whatever the key type.
    pub fn clear(&self, step: UndoStepId) {
        match self {
            ErasedUndo::Vertex(undo) => undo.clear(step),
            ErasedUndo::Edge(undo) => undo.clear(step),
        }
    }
}

/// Key types whose undo handles can be erased and recovered.
pub trait UndoKey: CoreObject {
    /// Wraps a typed undo handle.
    fn erase(undo: Arc<dyn FeatureUndo<Self>>) -> ErasedUndo;

    /// Recovers the typed handle if `erased` is keyed by `Self`.
    fn recover(erased: &ErasedUndo) -> Option<Arc<dyn FeatureUndo<Self>>>;
}

impl UndoKey for VertexId {
    fn erase(undo: Arc<dyn FeatureUndo<Self>>) -> ErasedUndo {
        ErasedUndo::Vertex(undo)
    }

    fn recover(erased: &ErasedUndo) -> Option<Arc<dyn FeatureUndo<Self>>> {
        match erased {
            ErasedUndo::Vertex(undo) => Some(Arc::clone(undo)),
            ErasedUndo::Edge(_) => None,
        }
    }
}

impl UndoKey for EdgeId {
    fn erase(undo: Arc<dyn FeatureUndo<Self>>) -> ErasedUndo {
        ErasedUndo::Edge(undo)
    }

    fn recover(erased: &ErasedUndo) -> Option<Arc<dyn FeatureUndo<Self>>> {
        match erased {
            ErasedUndo::Edge(undo) => Some(Arc::clone(undo)),
            ErasedUndo::Vertex(_) => None,
        }
    }
}
