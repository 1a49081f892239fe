//! Two-way translation between representations of the same graph objects.
//!
//! The *left* side is the representation a model is written against (core
//! vertices, say); the *right* side is the one a view works with (branch
//! vertices, wrapped vertices). Bimaps store no mappings: every lookup is
//! answered from the structures they borrow.
//!
//! Scratch references come from a pool. The branch bimaps hand out right-side
//! references from the branch graph's own pools; everything else keeps a
//! [`RefStack`] per side.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::branch::BranchSource;
use crate::primitives::pool::{ObjRef, RefPool, RefStack};
use crate::types::{BranchEdgeId, BranchVertexId, GraphObject};

/// Pure translation between left objects `L` and right objects `R`.
pub trait RefBimap<L: GraphObject, R: GraphObject>: Send + Sync {
    /// Left object denoted by `right`, if any.
    fn get_left(&self, right: R) -> Option<L>;

    /// Right object denoted by `left`, if any.
    fn get_right(&self, left: L) -> Option<R>;

    /// Borrows a scratch left-side reference.
    ///
    /// The default is a plain constructor with nothing to give back; pooled
    /// implementations override all four reference methods together.
    fn reusable_left_ref(&self) -> ObjRef<L> {
        ObjRef::new()
    }

    /// Borrows a scratch right-side reference.
    fn reusable_right_ref(&self) -> ObjRef<R> {
        ObjRef::new()
    }

    /// Returns a left-side reference for reuse.
    fn release_left_ref(&self, _obj_ref: ObjRef<L>) {}

    /// Returns a right-side reference for reuse.
    fn release_right_ref(&self, _obj_ref: ObjRef<R>) {}
}

impl<L: GraphObject, R: GraphObject, B: RefBimap<L, R> + ?Sized> RefBimap<L, R> for Arc<B> {
    fn get_left(&self, right: R) -> Option<L> {
        (**self).get_left(right)
    }

    fn get_right(&self, left: L) -> Option<R> {
        (**self).get_right(left)
    }

    fn reusable_left_ref(&self) -> ObjRef<L> {
        (**self).reusable_left_ref()
    }

    fn reusable_right_ref(&self) -> ObjRef<R> {
        (**self).reusable_right_ref()
    }

    fn release_left_ref(&self, obj_ref: ObjRef<L>) {
        (**self).release_left_ref(obj_ref)
    }

    fn release_right_ref(&self, obj_ref: ObjRef<R>) {
        (**self).release_right_ref(obj_ref)
    }
}

/// Bimap between a type and itself.
///
/// Both sides are the same type, so they share one reference stack.
pub struct IdentityBimap<T> {
    refs: RefStack<T>,
}

impl<T> Default for IdentityBimap<T> {
    fn default() -> Self {
        Self {
            refs: RefStack::default(),
        }
    }
}

impl<T> IdentityBimap<T> {
    /// Creates the identity bimap.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: GraphObject> RefBimap<T, T> for IdentityBimap<T> {
    fn get_left(&self, right: T) -> Option<T> {
        Some(right)
    }

    fn get_right(&self, left: T) -> Option<T> {
        Some(left)
    }

    fn reusable_left_ref(&self) -> ObjRef<T> {
        self.refs.create_ref()
    }

    fn reusable_right_ref(&self) -> ObjRef<T> {
        self.refs.create_ref()
    }

    fn release_left_ref(&self, obj_ref: ObjRef<T>) {
        self.refs.release_ref(obj_ref)
    }

    fn release_right_ref(&self, obj_ref: ObjRef<T>) {
        self.refs.release_ref(obj_ref)
    }
}

/// Chains `L <-> M` and `M <-> R` into `L <-> R`.
pub struct ComposedBimap<A, B, M> {
    inner: A,
    outer: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> ComposedBimap<A, B, M> {
    /// Composes `inner` (`L <-> M`) with `outer` (`M <-> R`).
    pub fn new(inner: A, outer: B) -> Self {
        Self {
            inner,
            outer,
            _marker: PhantomData,
        }
    }
}

impl<L, M, R, A, B> RefBimap<L, R> for ComposedBimap<A, B, M>
where
    L: GraphObject,
    M: GraphObject,
    R: GraphObject,
    A: RefBimap<L, M>,
    B: RefBimap<M, R>,
{
    fn get_left(&self, right: R) -> Option<L> {
        self.inner.get_left(self.outer.get_left(right)?)
    }

    fn get_right(&self, left: L) -> Option<R> {
        self.outer.get_right(self.inner.get_right(left)?)
    }

    fn reusable_left_ref(&self) -> ObjRef<L> {
        self.inner.reusable_left_ref()
    }

    fn reusable_right_ref(&self) -> ObjRef<R> {
        self.outer.reusable_right_ref()
    }

    fn release_left_ref(&self, obj_ref: ObjRef<L>) {
        self.inner.release_left_ref(obj_ref)
    }

    fn release_right_ref(&self, obj_ref: ObjRef<R>) {
        self.outer.release_right_ref(obj_ref)
    }
}

/// Underlying vertex `<->` branch vertex.
///
/// Only branch points have a right-side counterpart; an interior vertex
/// maps to `None`.
pub struct BranchVertexBimap<S, V, E> {
    source: Arc<S>,
    left_refs: RefStack<V>,
    _marker: PhantomData<fn() -> E>,
}

impl<S, V, E> BranchVertexBimap<S, V, E> {
    /// Creates a bimap reading from `source`.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            left_refs: RefStack::default(),
            _marker: PhantomData,
        }
    }
}

impl<S, V, E> RefBimap<V, BranchVertexId> for BranchVertexBimap<S, V, E>
where
    S: BranchSource<V, E>,
    V: GraphObject,
    E: GraphObject,
{
    fn get_left(&self, right: BranchVertexId) -> Option<V> {
        self.source.with_branch(|b| b.linked_vertex(right))
    }

    fn get_right(&self, left: V) -> Option<BranchVertexId> {
        self.source.with_branch(|b| b.branch_vertex(left))
    }

    fn reusable_left_ref(&self) -> ObjRef<V> {
        self.left_refs.create_ref()
    }

    fn reusable_right_ref(&self) -> ObjRef<BranchVertexId> {
        self.source.with_branch(|b| b.vertex_pool().create_ref())
    }

    fn release_left_ref(&self, obj_ref: ObjRef<V>) {
        self.left_refs.release_ref(obj_ref)
    }

    fn release_right_ref(&self, obj_ref: ObjRef<BranchVertexId>) {
        self.source.with_branch(|b| b.vertex_pool().release_ref(obj_ref))
    }
}

/// Underlying edge `<->` branch edge.
///
/// Every edge maps to the branch edge containing it; a branch edge maps back
/// to the first edge of its chain.
pub struct BranchEdgeBimap<S, V, E> {
    source: Arc<S>,
    left_refs: RefStack<E>,
    _marker: PhantomData<fn() -> V>,
}

impl<S, V, E> BranchEdgeBimap<S, V, E> {
    /// Creates a bimap reading from `source`.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            left_refs: RefStack::default(),
            _marker: PhantomData,
        }
    }
}

impl<S, V, E> RefBimap<E, BranchEdgeId> for BranchEdgeBimap<S, V, E>
where
    S: BranchSource<V, E>,
    V: GraphObject,
    E: GraphObject,
{
    fn get_left(&self, right: BranchEdgeId) -> Option<E> {
        self.source.with_branch(|b| b.linked_edge(right))
    }

    fn get_right(&self, left: E) -> Option<BranchEdgeId> {
        self.source.with_branch(|b| b.branch_edge_of_edge(left))
    }

    fn reusable_left_ref(&self) -> ObjRef<E> {
        self.left_refs.create_ref()
    }

    fn reusable_right_ref(&self) -> ObjRef<BranchEdgeId> {
        self.source.with_branch(|b| b.edge_pool().create_ref())
    }

    fn release_left_ref(&self, obj_ref: ObjRef<E>) {
        self.left_refs.release_ref(obj_ref)
    }

    fn release_right_ref(&self, obj_ref: ObjRef<BranchEdgeId>) {
        self.source.with_branch(|b| b.edge_pool().release_ref(obj_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;

    use crate::model::{ModelGraph, ModelOptions};
    use crate::types::{EdgeId, LineageError, Result, VertexId};

    /// Even numbers on the left, their halves on the right.
    struct Halves;

    impl RefBimap<u32, u32> for Halves {
        fn get_left(&self, right: u32) -> Option<u32> {
            right.checked_mul(2)
        }

        fn get_right(&self, left: u32) -> Option<u32> {
            (left % 2 == 0).then_some(left / 2)
        }
    }

    #[test]
    fn identity_maps_both_ways() {
        let id = IdentityBimap::<u64>::new();
        assert_eq!(id.get_left(4), Some(4));
        assert_eq!(id.get_right(9), Some(9));
        let r = id.reusable_left_ref();
        assert!(r.is_unset());
        id.release_left_ref(r);
    }

    #[test]
    fn composition_threads_through_the_middle() {
        let quarter: ComposedBimap<Halves, Halves, u32> = ComposedBimap::new(Halves, Halves);
        assert_eq!(quarter.get_right(12), Some(3));
        assert_eq!(quarter.get_right(6), None);
        assert_eq!(quarter.get_left(3), Some(12));

        let shared: ComposedBimap<Arc<Halves>, IdentityBimap<u32>, u32> =
            ComposedBimap::new(Arc::new(Halves), IdentityBimap::new());
        assert_eq!(shared.get_right(8), Some(4));
    }

    #[test]
    fn shared_branch_bimap_draws_refs_from_the_branch_graph() -> Result<()> {
        let mut graph = ModelGraph::new(&ModelOptions::default());
        let a = graph.add_vertex()?;
        let b = graph.add_vertex()?;
        graph.add_edge(a, b)?;
        let shared = Arc::new(RwLock::new(graph));
        let bimap: Arc<dyn RefBimap<VertexId, BranchVertexId>> =
            Arc::new(BranchVertexBimap::<_, VertexId, EdgeId>::new(shared.clone()));

        let mut right = bimap.reusable_right_ref();
        right.point_at(bimap.get_right(a).ok_or(LineageError::NotFound("root"))?);
        assert_eq!(shared.read().branch().vertex_pool().outstanding_refs(), 1);
        bimap.release_right_ref(right);
        assert_eq!(shared.read().branch().vertex_pool().outstanding_refs(), 0);

        let reused = bimap.reusable_right_ref();
        assert!(reused.is_unset());
        bimap.release_right_ref(reused);
        Ok(())
    }
}
