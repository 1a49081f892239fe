//! Core lineage graph.
//!
//! Vertices and edges live in generation-checked pools; each vertex keeps its
//! incoming and outgoing incidence lists in insertion order. Self-loops and
//! parallel edges are allowed. Mutations are the only way identities are
//! created or destroyed, and every mutation is reported to the registered
//! [`GraphListener`]s once it has taken effect.

use std::sync::Arc;

use crate::primitives::listeners::{ListenerRegistry, Listeners};
use crate::primitives::pool::{ObjRef, Pool, RefPool};
use crate::types::{EdgeId, VertexId};

mod edge_ops;
mod graph_types;
mod node_ops;

pub use graph_types::{CoreObject, GraphListener, ObjectKind, ReadOnlyGraph};

use graph_types::{EdgeRecord, VertexRecord};

/// Mutable directed multigraph of tracked objects.
pub struct Graph {
    vertices: Pool<VertexId, VertexRecord>,
    edges: Pool<EdgeId, EdgeRecord>,
    listeners: Arc<Listeners<dyn GraphListener>>,
    paused: bool,
    suppressed: usize,
}

impl Default for Graph {
    fn default() -> Self {
        Self::with_capacity(0, 0)
    }
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty graph with preallocated pools.
    pub fn with_capacity(vertices: usize, edges: usize) -> Self {
        Self {
            vertices: Pool::with_capacity(vertices),
            edges: Pool::with_capacity(edges),
            listeners: Arc::new(Listeners::new()),
            paused: false,
            suppressed: 0,
        }
    }

    /// Registry of graph listeners.
    pub fn listeners(&self) -> Arc<Listeners<dyn GraphListener>> {
        Arc::clone(&self.listeners)
    }

    /// Same registry, typed for consumers that only add and remove.
    pub fn listener_registry(&self) -> Arc<dyn ListenerRegistry<dyn GraphListener>> {
        self.listeners.clone()
    }

    /// Stops delivering events until [`Graph::resume_listeners`].
    pub fn pause_listeners(&mut self) {
        self.paused = true;
    }

    /// Resumes delivery; emits `graph_rebuilt` if anything was suppressed.
    pub fn resume_listeners(&mut self) {
        self.paused = false;
        let suppressed = std::mem::take(&mut self.suppressed);
        if suppressed > 0 {
            tracing::debug!(suppressed, "graph.listeners.resumed");
            let this: &Graph = self;
            this.listeners.for_each(|l| l.graph_rebuilt(this));
        }
    }

    /// Whether event delivery is paused.
    pub fn listeners_paused(&self) -> bool {
        self.paused
    }

    /// Whether `vertex` is live.
    pub fn is_valid_vertex(&self, vertex: VertexId) -> bool {
        self.vertices.is_valid(vertex)
    }

    /// Whether `edge` is live.
    pub fn is_valid_edge(&self, edge: EdgeId) -> bool {
        self.edges.is_valid(edge)
    }

    /// Source of a live edge.
    pub fn source(&self, edge: EdgeId) -> Option<VertexId> {
        self.edges.get(edge).map(|e| e.source)
    }

    /// Target of a live edge.
    pub fn target(&self, edge: EdgeId) -> Option<VertexId> {
        self.edges.get(edge).map(|e| e.target)
    }

    /// Incoming edges of `vertex` in insertion order.
    pub fn incoming_edges(&self, vertex: VertexId) -> &[EdgeId] {
        self.vertices
            .get(vertex)
            .map(|v| v.incoming.as_slice())
            .unwrap_or(&[])
    }

    /// Outgoing edges of `vertex` in insertion order.
    pub fn outgoing_edges(&self, vertex: VertexId) -> &[EdgeId] {
        self.vertices
            .get(vertex)
            .map(|v| v.outgoing.as_slice())
            .unwrap_or(&[])
    }

    /// Number of incoming edges.
    pub fn in_degree(&self, vertex: VertexId) -> usize {
        self.incoming_edges(vertex).len()
    }

    /// Number of outgoing edges.
    pub fn out_degree(&self, vertex: VertexId) -> usize {
        self.outgoing_edges(vertex).len()
    }

    /// First edge from `source` to `target`, if any.
    pub fn edge_between(&self, source: VertexId, target: VertexId) -> Option<EdgeId> {
        self.outgoing_edges(source)
            .iter()
            .copied()
            .find(|e| self.target(*e) == Some(target))
    }

    /// Live vertices in slot order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.handles()
    }

    /// Live edges in slot order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.handles()
    }

    /// Number of live vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Borrows a scratch vertex reference pointing at nothing.
    pub fn vertex_ref(&self) -> ObjRef<VertexId> {
        self.vertices.create_ref()
    }

    /// Borrows a scratch edge reference pointing at nothing.
    pub fn edge_ref(&self) -> ObjRef<EdgeId> {
        self.edges.create_ref()
    }

    /// Returns a vertex reference for reuse.
    pub fn release_vertex_ref(&self, obj_ref: ObjRef<VertexId>) {
        self.vertices.release_ref(obj_ref)
    }

    /// Returns an edge reference for reuse.
    pub fn release_edge_ref(&self, obj_ref: ObjRef<EdgeId>) {
        self.edges.release_ref(obj_ref)
    }

    /// Vertex pool, for scoped reference acquisition.
    pub fn vertex_pool(&self) -> &impl RefPool<VertexId> {
        &self.vertices
    }

    /// Edge pool, for scoped reference acquisition.
    pub fn edge_pool(&self) -> &impl RefPool<EdgeId> {
        &self.edges
    }

    fn notify(&mut self, event: impl Fn(&dyn GraphListener, &Graph)) {
        if self.paused {
            self.suppressed += 1;
            return;
        }
        if self.listeners.is_empty() {
            return;
        }
        let this: &Graph = self;
        this.listeners.for_each(|l| event(l, this));
    }
}

impl ReadOnlyGraph for Graph {
    type Vertex = VertexId;
    type Edge = EdgeId;
    type Vertices<'a> = crate::primitives::pool::Handles<'a, VertexId, VertexRecord>;
    type Edges<'a> = crate::primitives::pool::Handles<'a, EdgeId, EdgeRecord>;

    fn contains_vertex(&self, vertex: VertexId) -> bool {
        self.is_valid_vertex(vertex)
    }

    fn contains_edge(&self, edge: EdgeId) -> bool {
        self.is_valid_edge(edge)
    }

    fn source(&self, edge: EdgeId) -> Option<VertexId> {
        Graph::source(self, edge)
    }

    fn target(&self, edge: EdgeId) -> Option<VertexId> {
        Graph::target(self, edge)
    }

    fn incoming_edges(&self, vertex: VertexId) -> &[EdgeId] {
        Graph::incoming_edges(self, vertex)
    }

    fn outgoing_edges(&self, vertex: VertexId) -> &[EdgeId] {
        Graph::outgoing_edges(self, vertex)
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
