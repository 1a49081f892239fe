//! Branch graph condenser.
//!
//! The branch graph condenses every maximal chain of in/out-degree (1,1)
//! vertices of an underlying graph into a single branch edge. Vertices that
//! are not (1,1) (roots, leaves, divisions and merges) become branch
//! vertices. Every underlying vertex and edge is linked to exactly one
//! branch object: a branch vertex, or the branch edge whose chain contains
//! it.
//!
//! A cycle made only of (1,1) vertices has no natural branch point. One of
//! its vertices is *anchored*: it is treated as a branch point, and the
//! cycle becomes one branch edge from the anchor back to itself.
//!
//! The structure is maintained incrementally: each mutation handler
//! dissolves the branch objects whose shape changed and rebuilds chains from
//! what was dissolved. [`BranchGraph::rebuild`] recomputes everything.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::primitives::listeners::Listeners;
use crate::primitives::pool::{Handles, Pool, RefPool};
use crate::storage::ReadOnlyGraph;
use crate::types::{BranchEdgeId, BranchVertexId, GraphObject};

mod repair;
mod tests;
mod verify;

/// Observer of branch graph changes.
pub trait BranchGraphListener: Send + Sync {
    /// The branch graph was repaired or rebuilt.
    fn branch_graph_changed(&self);
}

/// Either kind of branch object.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BranchItem {
    /// A branch vertex.
    Vertex(BranchVertexId),
    /// A branch edge.
    Edge(BranchEdgeId),
}

impl From<BranchVertexId> for BranchItem {
    fn from(bv: BranchVertexId) -> Self {
        BranchItem::Vertex(bv)
    }
}

impl From<BranchEdgeId> for BranchItem {
    fn from(be: BranchEdgeId) -> Self {
        BranchItem::Edge(be)
    }
}

/// Branch object an underlying vertex is linked to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum VertexLink {
    /// The vertex is a branch point.
    Vertex(BranchVertexId),
    /// The vertex is interior to this branch edge's chain.
    Interior(BranchEdgeId),
}

/// Counters describing the work done by the condenser.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BranchStats {
    /// Branch edges created.
    pub chains_built: u64,
    /// Branch edges dissolved by incremental repair.
    pub chains_dissolved: u64,
    /// Branch vertices dissolved by incremental repair.
    pub vertices_dissolved: u64,
    /// Incremental repairs performed.
    pub repairs: u64,
    /// Full rebuilds performed.
    pub rebuilds: u64,
}

/// Record of a branch vertex.
pub struct BranchVertexRecord<V> {
    vertex: V,
    incoming: SmallVec<[BranchEdgeId; 2]>,
    outgoing: SmallVec<[BranchEdgeId; 2]>,
}

/// Record of a branch edge.
pub struct BranchEdgeRecord<V, E> {
    source: BranchVertexId,
    target: BranchVertexId,
    /// Interior vertices in chain order.
    vertices: Vec<V>,
    /// All chain edges in chain order; never empty.
    edges: Vec<E>,
}

/// Condensed view of a graph with vertex type `V` and edge type `E`.
pub struct BranchGraph<V, E> {
    vertices: Pool<BranchVertexId, BranchVertexRecord<V>>,
    edges: Pool<BranchEdgeId, BranchEdgeRecord<V, E>>,
    vertex_links: FxHashMap<V, VertexLink>,
    edge_links: FxHashMap<E, BranchEdgeId>,
    anchors: FxHashSet<V>,
    listeners: Listeners<dyn BranchGraphListener>,
    stats: BranchStats,
}

impl<V: GraphObject, E: GraphObject> Default for BranchGraph<V, E> {
    fn default() -> Self {
        Self::with_capacity(0, 0)
    }
}

impl<V: GraphObject, E: GraphObject> BranchGraph<V, E> {
    /// Creates an empty branch graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty branch graph sized for an underlying graph of the
    /// given dimensions.
    pub fn with_capacity(vertices: usize, edges: usize) -> Self {
        Self {
            vertices: Pool::with_capacity(vertices / 4),
            edges: Pool::with_capacity(edges / 4),
            vertex_links: FxHashMap::with_capacity_and_hasher(vertices, Default::default()),
            edge_links: FxHashMap::with_capacity_and_hasher(edges, Default::default()),
            anchors: FxHashSet::default(),
            listeners: Listeners::new(),
            stats: BranchStats::default(),
        }
    }

    /// Creates a branch graph condensing `graph`.
    pub fn build<G>(graph: &G) -> Self
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        let mut branch = Self::with_capacity(graph.vertex_count(), graph.edge_count());
        branch.rebuild(graph);
        branch
    }

    /// Listeners told about every repair and rebuild.
    pub fn listeners(&self) -> &Listeners<dyn BranchGraphListener> {
        &self.listeners
    }

    /// Work counters.
    pub fn stats(&self) -> BranchStats {
        self.stats
    }

    /// Branch object `vertex` is linked to.
    pub fn vertex_link(&self, vertex: V) -> Option<VertexLink> {
        self.vertex_links.get(&vertex).copied()
    }

    /// Branch vertex of `vertex`, or `None` if it is interior to a chain.
    pub fn branch_vertex(&self, vertex: V) -> Option<BranchVertexId> {
        match self.vertex_link(vertex)? {
            VertexLink::Vertex(bv) => Some(bv),
            VertexLink::Interior(_) => None,
        }
    }

    /// Branch edge whose chain has `vertex` as an interior vertex.
    pub fn branch_edge_of_vertex(&self, vertex: V) -> Option<BranchEdgeId> {
        match self.vertex_link(vertex)? {
            VertexLink::Interior(be) => Some(be),
            VertexLink::Vertex(_) => None,
        }
    }

    /// Branch edge whose chain contains `edge`.
    pub fn branch_edge_of_edge(&self, edge: E) -> Option<BranchEdgeId> {
        self.edge_links.get(&edge).copied()
    }

    /// Underlying vertex of a branch vertex.
    pub fn linked_vertex(&self, bv: BranchVertexId) -> Option<V> {
        self.vertices.get(bv).map(|r| r.vertex)
    }

    /// First underlying edge of a branch edge's chain.
    ///
    /// The first edge is the chain's canonical representative.
    pub fn linked_edge(&self, be: BranchEdgeId) -> Option<E> {
        self.edges.get(be).and_then(|r| r.edges.first().copied())
    }

    /// Underlying vertex at the start of a branch object.
    ///
    /// For a branch edge this is the vertex of its source branch vertex.
    pub fn first_linked_vertex(&self, item: impl Into<BranchItem>) -> Option<V> {
        match item.into() {
            BranchItem::Vertex(bv) => self.linked_vertex(bv),
            BranchItem::Edge(be) => self.linked_vertex(self.edges.get(be)?.source),
        }
    }

    /// Underlying vertex at the end of a branch object.
    ///
    /// For a branch edge this is the vertex of its target branch vertex.
    pub fn last_linked_vertex(&self, item: impl Into<BranchItem>) -> Option<V> {
        match item.into() {
            BranchItem::Vertex(bv) => self.linked_vertex(bv),
            BranchItem::Edge(be) => self.linked_vertex(self.edges.get(be)?.target),
        }
    }

    /// Underlying vertices of a branch object in chain order.
    ///
    /// A branch vertex yields its own vertex; a branch edge yields the
    /// interior vertices of its chain (not its endpoints). A stale item
    /// yields nothing.
    pub fn vertex_branch_iter(&self, item: impl Into<BranchItem>) -> std::slice::Iter<'_, V> {
        match item.into() {
            BranchItem::Vertex(bv) => self
                .vertices
                .get(bv)
                .map(|r| std::slice::from_ref(&r.vertex))
                .unwrap_or(&[])
                .iter(),
            BranchItem::Edge(be) => self
                .edges
                .get(be)
                .map(|r| r.vertices.as_slice())
                .unwrap_or(&[])
                .iter(),
        }
    }

    /// Underlying edges of a branch object in chain order.
    ///
    /// A branch vertex yields nothing.
    pub fn edge_branch_iter(&self, item: impl Into<BranchItem>) -> std::slice::Iter<'_, E> {
        match item.into() {
            BranchItem::Vertex(_) => (&[] as &[E]).iter(),
            BranchItem::Edge(be) => self
                .edges
                .get(be)
                .map(|r| r.edges.as_slice())
                .unwrap_or(&[])
                .iter(),
        }
    }

    /// Source branch vertex of a branch edge.
    pub fn branch_source(&self, be: BranchEdgeId) -> Option<BranchVertexId> {
        self.edges.get(be).map(|r| r.source)
    }

    /// Target branch vertex of a branch edge.
    pub fn branch_target(&self, be: BranchEdgeId) -> Option<BranchVertexId> {
        self.edges.get(be).map(|r| r.target)
    }

    /// Whether `vertex` is currently anchoring a (1,1) cycle.
    pub fn is_anchor(&self, vertex: V) -> bool {
        self.anchors.contains(&vertex)
    }

    /// Number of branch vertices.
    pub fn branch_vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of branch edges.
    pub fn branch_edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Branch vertex pool, for scratch reference acquisition.
    pub fn vertex_pool(&self) -> &impl RefPool<BranchVertexId> {
        &self.vertices
    }

    /// Branch edge pool, for scratch reference acquisition.
    pub fn edge_pool(&self) -> &impl RefPool<BranchEdgeId> {
        &self.edges
    }

    fn notify_changed(&self) {
        self.listeners.for_each(|l| l.branch_graph_changed());
    }
}

impl<V: GraphObject, E: GraphObject> ReadOnlyGraph for BranchGraph<V, E> {
    type Vertex = BranchVertexId;
    type Edge = BranchEdgeId;
    type Vertices<'a> = Handles<'a, BranchVertexId, BranchVertexRecord<V>>;
    type Edges<'a> = Handles<'a, BranchEdgeId, BranchEdgeRecord<V, E>>;

    fn contains_vertex(&self, bv: BranchVertexId) -> bool {
        self.vertices.is_valid(bv)
    }

    fn contains_edge(&self, be: BranchEdgeId) -> bool {
        self.edges.is_valid(be)
    }

    fn source(&self, be: BranchEdgeId) -> Option<BranchVertexId> {
        self.branch_source(be)
    }

    fn target(&self, be: BranchEdgeId) -> Option<BranchVertexId> {
        self.branch_target(be)
    }

    fn incoming_edges(&self, bv: BranchVertexId) -> &[BranchEdgeId] {
        self.vertices
            .get(bv)
            .map(|r| r.incoming.as_slice())
            .unwrap_or(&[])
    }

    fn outgoing_edges(&self, bv: BranchVertexId) -> &[BranchEdgeId] {
        self.vertices
            .get(bv)
            .map(|r| r.outgoing.as_slice())
            .unwrap_or(&[])
    }

    fn vertices(&self) -> Self::Vertices<'_> {
        self.vertices.handles()
    }

    fn edges(&self) -> Self::Edges<'_> {
        self.edges.handles()
    }

    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Anything that can lend a read view of a branch graph.
///
/// Adapters over the branch graph hold a source rather than the graph
/// itself, so the condensation can keep being repaired between calls.
pub trait BranchSource<V, E>: Send + Sync {
    /// Runs `f` with the current branch graph.
    fn with_branch<R>(&self, f: impl FnOnce(&BranchGraph<V, E>) -> R) -> R;
}
