use smallvec::SmallVec;

use crate::types::{EdgeId, GraphObject, VertexId};

use super::Graph;

/// Incidence lists of a core vertex.
#[derive(Clone, Debug, Default)]
pub struct VertexRecord {
    pub(crate) incoming: SmallVec<[EdgeId; 2]>,
    pub(crate) outgoing: SmallVec<[EdgeId; 2]>,
}

/// Endpoints of a core edge.
#[derive(Clone, Copy, Debug)]
pub struct EdgeRecord {
    pub(crate) source: VertexId,
    pub(crate) target: VertexId,
}

/// Which kind of core object a key or feature refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Core vertices.
    Vertex,
    /// Core edges.
    Edge,
}

/// Read access to a directed multigraph with pooled handles.
///
/// Implemented by the core [`Graph`], by the model graph wrapping it and by
/// the condensed branch graph, so traversal and verification code is written
/// once for every shape.
pub trait ReadOnlyGraph {
    /// Vertex handle type.
    type Vertex: GraphObject;
    /// Edge handle type.
    type Edge: GraphObject;
    /// Iterator over live vertices.
    type Vertices<'a>: Iterator<Item = Self::Vertex> + 'a
    where
        Self: 'a;
    /// Iterator over live edges.
    type Edges<'a>: Iterator<Item = Self::Edge> + 'a
    where
        Self: 'a;

    /// Whether `vertex` is live.
    fn contains_vertex(&self, vertex: Self::Vertex) -> bool;
    /// Whether `edge` is live.
    fn contains_edge(&self, edge: Self::Edge) -> bool;
    /// Source of a live edge.
    fn source(&self, edge: Self::Edge) -> Option<Self::Vertex>;
    /// Target of a live edge.
    fn target(&self, edge: Self::Edge) -> Option<Self::Vertex>;
    /// Edges ending at `vertex`; empty for a stale handle.
    fn incoming_edges(&self, vertex: Self::Vertex) -> &[Self::Edge];
    /// Edges starting at `vertex`; empty for a stale handle.
    fn outgoing_edges(&self, vertex: Self::Vertex) -> &[Self::Edge];
    /// All live vertices.
    fn vertices(&self) -> Self::Vertices<'_>;
    /// All live edges.
    fn edges(&self) -> Self::Edges<'_>;
    /// Number of live vertices.
    fn vertex_count(&self) -> usize;
    /// Number of live edges.
    fn edge_count(&self) -> usize;

    /// Number of incoming edges.
    fn in_degree(&self, vertex: Self::Vertex) -> usize {
        self.incoming_edges(vertex).len()
    }

    /// Number of outgoing edges.
    fn out_degree(&self, vertex: Self::Vertex) -> usize {
        self.outgoing_edges(vertex).len()
    }
}

/// Observer of core graph mutations.
///
/// Every callback is delivered after the mutation took effect, with the graph
/// in its new state. Removal callbacks receive handles that are already
/// stale; `edge_removed` passes the former endpoints along.
pub trait GraphListener: Send + Sync {
    /// A vertex was added.
    fn vertex_added(&self, _graph: &Graph, _vertex: VertexId) {}
    /// A vertex was removed (after all of its edges).
    fn vertex_removed(&self, _graph: &Graph, _vertex: VertexId) {}
    /// An edge was added.
    fn edge_added(&self, _graph: &Graph, _edge: EdgeId) {}
    /// An edge was removed.
    fn edge_removed(&self, _graph: &Graph, _edge: EdgeId, _source: VertexId, _target: VertexId) {}
    /// Events were suppressed; listeners must resynchronise from `graph`.
    fn graph_rebuilt(&self, _graph: &Graph) {}
}

/// Core object handle usable as a key by feature maps and models.
pub trait CoreObject: GraphObject {
    /// Kind of core object this handle denotes.
    const KIND: ObjectKind;

    /// `Some(vertex)` if this key type denotes vertices.
    fn from_removed_vertex(vertex: VertexId) -> Option<Self>;

    /// `Some(edge)` if this key type denotes edges.
    fn from_removed_edge(edge: EdgeId) -> Option<Self>;

    /// Whether the object is still part of `graph`.
    fn is_live(self, graph: &Graph) -> bool;
}

impl CoreObject for VertexId {
    const KIND: ObjectKind = ObjectKind::Vertex;

    fn from_removed_vertex(vertex: VertexId) -> Option<Self> {
        Some(vertex)
    }

    fn from_removed_edge(_edge: EdgeId) -> Option<Self> {
        None
    }

    fn is_live(self, graph: &Graph) -> bool {
        graph.is_valid_vertex(self)
    }
}

impl CoreObject for EdgeId {
    const KIND: ObjectKind = ObjectKind::Edge;

    fn from_removed_vertex(_vertex: VertexId) -> Option<Self> {
        None
    }

    fn from_removed_edge(edge: EdgeId) -> Option<Self> {
        Some(edge)
    }

    fn is_live(self, graph: &Graph) -> bool {
        graph.is_valid_edge(self)
    }
}
