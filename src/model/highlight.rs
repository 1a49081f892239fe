use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bimap::RefBimap;
use crate::branch::{BranchSource, VertexLink};
use crate::primitives::listeners::{ForwardedListeners, ListenerRegistry, Listeners, NotifyGate};
use crate::storage::{Graph, GraphListener};
use crate::types::{BranchEdgeId, BranchVertexId, EdgeId, GraphObject, VertexId};

/// Observer of highlight changes.
pub trait HighlightListener: Send + Sync {
    /// The highlighted object changed.
    fn highlight_changed(&self);
}

/// At most one highlighted object, vertex or edge.
pub trait HighlightModel<V, E>: Send + Sync {
    /// Highlights `vertex`, or clears the highlight for `None`.
    fn highlight_vertex(&self, vertex: Option<V>);

    /// Highlights `edge`, or clears the highlight for `None`.
    fn highlight_edge(&self, edge: Option<E>);

    /// Clears the highlight.
    fn clear_highlight(&self);

    /// Highlighted vertex, if a vertex is highlighted.
    fn highlighted_vertex(&self) -> Option<V>;

    /// Highlighted edge, if an edge is highlighted.
    fn highlighted_edge(&self) -> Option<E>;

    /// Registry of highlight listeners.
    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn HighlightListener>>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Highlighted {
    #[default]
    Nothing,
    Vertex(VertexId),
    Edge(EdgeId),
}

/// Highlight over core vertices and edges.
///
/// Registered as a graph listener, it drops the highlight when the
/// highlighted object is removed.
#[derive(Default)]
pub struct DefaultHighlightModel {
    current: Mutex<Highlighted>,
    listeners: Arc<Listeners<dyn HighlightListener>>,
    gate: NotifyGate,
}

impl DefaultHighlightModel {
    /// Creates a model with nothing highlighted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds back change notifications. Pauses nest.
    pub fn pause_listeners(&self) {
        self.gate.hold();
    }

    /// Releases one pause; the outermost resume notifies once if the
    /// highlight changed in between.
    pub fn resume_listeners(&self) {
        if self.gate.release() {
            self.notify();
        }
    }

    fn notify(&self) {
        self.listeners.for_each(|l| l.highlight_changed());
    }

    fn replace(&self, next: Highlighted) {
        let changed = std::mem::replace(&mut *self.current.lock(), next) != next;
        if changed && self.gate.changed() {
            self.notify();
        }
    }

    fn clear_if(&self, stale: Highlighted) {
        let changed = {
            let mut current = self.current.lock();
            let hit = *current == stale;
            if hit {
                *current = Highlighted::Nothing;
            }
            hit
        };
        if changed && self.gate.changed() {
            self.notify();
        }
    }
}

impl HighlightModel<VertexId, EdgeId> for DefaultHighlightModel {
    fn highlight_vertex(&self, vertex: Option<VertexId>) {
        self.replace(vertex.map_or(Highlighted::Nothing, Highlighted::Vertex));
    }

    fn highlight_edge(&self, edge: Option<EdgeId>) {
        self.replace(edge.map_or(Highlighted::Nothing, Highlighted::Edge));
    }

    fn clear_highlight(&self) {
        self.replace(Highlighted::Nothing);
    }

    fn highlighted_vertex(&self) -> Option<VertexId> {
        match *self.current.lock() {
            Highlighted::Vertex(v) => Some(v),
            _ => None,
        }
    }

    fn highlighted_edge(&self) -> Option<EdgeId> {
        match *self.current.lock() {
            Highlighted::Edge(e) => Some(e),
            _ => None,
        }
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn HighlightListener>> {
        self.listeners.clone()
    }
}

impl GraphListener for DefaultHighlightModel {
    fn vertex_removed(&self, _graph: &Graph, vertex: VertexId) {
        self.clear_if(Highlighted::Vertex(vertex));
    }

    fn edge_removed(&self, _graph: &Graph, edge: EdgeId, _source: VertexId, _target: VertexId) {
        self.clear_if(Highlighted::Edge(edge));
    }

    fn graph_rebuilt(&self, graph: &Graph) {
        let current = *self.current.lock();
        let live = match current {
            Highlighted::Nothing => true,
            Highlighted::Vertex(v) => graph.is_valid_vertex(v),
            Highlighted::Edge(e) => graph.is_valid_edge(e),
        };
        if !live {
            self.clear_if(current);
        }
    }
}

/// Highlight model seen through a pair of bimaps.
pub struct HighlightModelAdapter<V, E, M: ?Sized, VB, EB> {
    model: Arc<M>,
    vertex_map: VB,
    edge_map: EB,
    listeners: Arc<ForwardedListeners<dyn HighlightListener>>,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E, M, VB, EB> HighlightModelAdapter<V, E, M, VB, EB>
where
    V: GraphObject,
    E: GraphObject,
    M: HighlightModel<V, E> + ?Sized,
{
    /// Wraps `model`.
    pub fn new(model: Arc<M>, vertex_map: VB, edge_map: EB) -> Self {
        let listeners = Arc::new(ForwardedListeners::new(model.listeners()));
        Self {
            model,
            vertex_map,
            edge_map,
            listeners,
            _marker: PhantomData,
        }
    }

    /// Deregisters every listener added through this adapter.
    pub fn remove_all_listeners(&self) {
        self.listeners.remove_all();
    }
}

impl<V, E, WV, WE, M, VB, EB> HighlightModel<WV, WE> for HighlightModelAdapter<V, E, M, VB, EB>
where
    V: GraphObject,
    E: GraphObject,
    WV: GraphObject,
    WE: GraphObject,
    M: HighlightModel<V, E> + ?Sized,
    VB: RefBimap<V, WV>,
    EB: RefBimap<E, WE>,
{
    fn highlight_vertex(&self, vertex: Option<WV>) {
        self.model
            .highlight_vertex(vertex.and_then(|v| self.vertex_map.get_left(v)));
    }

    fn highlight_edge(&self, edge: Option<WE>) {
        self.model
            .highlight_edge(edge.and_then(|e| self.edge_map.get_left(e)));
    }

    fn clear_highlight(&self) {
        self.model.clear_highlight();
    }

    fn highlighted_vertex(&self) -> Option<WV> {
        self.vertex_map.get_right(self.model.highlighted_vertex()?)
    }

    fn highlighted_edge(&self) -> Option<WE> {
        self.edge_map.get_right(self.model.highlighted_edge()?)
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn HighlightListener>> {
        self.listeners.clone()
    }
}

/// Highlight of core objects seen on the branch graph.
///
/// Highlighting a branch edge highlights the first edge of its chain. Any
/// highlighted chain member, interior vertex included, reads back as the
/// branch edge of the chain.
pub struct BranchGraphHighlightAdapter<V, E, S, M: ?Sized> {
    source: Arc<S>,
    model: Arc<M>,
    listeners: Arc<ForwardedListeners<dyn HighlightListener>>,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E, S, M> BranchGraphHighlightAdapter<V, E, S, M>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
    M: HighlightModel<V, E> + ?Sized,
{
    /// Wraps `model`, reading the condensation from `source`.
    pub fn new(source: Arc<S>, model: Arc<M>) -> Self {
        let listeners = Arc::new(ForwardedListeners::new(model.listeners()));
        Self {
            source,
            model,
            listeners,
            _marker: PhantomData,
        }
    }

    /// Deregisters every listener added through this adapter.
    pub fn remove_all_listeners(&self) {
        self.listeners.remove_all();
    }
}

impl<V, E, S, M> HighlightModel<BranchVertexId, BranchEdgeId> for BranchGraphHighlightAdapter<V, E, S, M>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
    M: HighlightModel<V, E> + ?Sized,
{
    fn highlight_vertex(&self, bv: Option<BranchVertexId>) {
        let vertex = bv.and_then(|bv| self.source.with_branch(|b| b.linked_vertex(bv)));
        self.model.highlight_vertex(vertex);
    }

    fn highlight_edge(&self, be: Option<BranchEdgeId>) {
        let edge = be.and_then(|be| self.source.with_branch(|b| b.linked_edge(be)));
        self.model.highlight_edge(edge);
    }

    fn clear_highlight(&self) {
        self.model.clear_highlight();
    }

    fn highlighted_vertex(&self) -> Option<BranchVertexId> {
        let vertex = self.model.highlighted_vertex()?;
        self.source.with_branch(|b| b.branch_vertex(vertex))
    }

    fn highlighted_edge(&self) -> Option<BranchEdgeId> {
        if let Some(edge) = self.model.highlighted_edge() {
            return self.source.with_branch(|b| b.branch_edge_of_edge(edge));
        }
        let vertex = self.model.highlighted_vertex()?;
        match self.source.with_branch(|b| b.vertex_link(vertex))? {
            VertexLink::Interior(be) => Some(be),
            VertexLink::Vertex(_) => None,
        }
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn HighlightListener>> {
        self.listeners.clone()
    }
}
