use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::bimap::RefBimap;
use crate::branch::{BranchItem, BranchSource};
use crate::primitives::listeners::{ForwardedListeners, ListenerRegistry, Listeners};
use crate::storage::{Graph, GraphListener};
use crate::types::{BranchEdgeId, BranchVertexId, EdgeId, GraphObject, VertexId};

/// Observer of selection changes.
pub trait SelectionListener: Send + Sync {
    /// The set of selected objects changed.
    fn selection_changed(&self);
}

/// Set of selected vertices and edges.
///
/// Setters return whether the selection actually changed; listeners are only
/// told about actual changes.
pub trait SelectionModel<V: GraphObject, E: GraphObject>: Send + Sync {
    /// Whether `vertex` is selected.
    fn is_vertex_selected(&self, vertex: V) -> bool;

    /// Whether `edge` is selected.
    fn is_edge_selected(&self, edge: E) -> bool;

    /// Selects or deselects `vertex`.
    fn set_vertex_selected(&self, vertex: V, selected: bool) -> bool;

    /// Selects or deselects `edge`.
    fn set_edge_selected(&self, edge: E, selected: bool) -> bool;

    /// Flips the selection state of `vertex`.
    fn toggle_vertex(&self, vertex: V) {
        let selected = self.is_vertex_selected(vertex);
        self.set_vertex_selected(vertex, !selected);
    }

    /// Flips the selection state of `edge`.
    fn toggle_edge(&self, edge: E) {
        let selected = self.is_edge_selected(edge);
        self.set_edge_selected(edge, !selected);
    }

    /// Selects or deselects every vertex in `vertices`, notifying once.
    fn set_vertices_selected(&self, vertices: &[V], selected: bool) -> bool;

    /// Selects or deselects every edge in `edges`, notifying once.
    fn set_edges_selected(&self, edges: &[E], selected: bool) -> bool;

    /// Currently selected vertices, in no particular order.
    fn selected_vertices(&self) -> Vec<V>;

    /// Currently selected edges, in no particular order.
    fn selected_edges(&self) -> Vec<E>;

    /// Deselects everything. Returns `false` if nothing was selected.
    fn clear_selection(&self) -> bool;

    /// Whether nothing is selected.
    fn is_empty(&self) -> bool;

    /// Holds back notifications until the matching
    /// [`SelectionModel::resume_listeners`]. Pauses nest.
    fn pause_listeners(&self);

    /// Releases one pause; the outermost resume sends a single notification
    /// if anything changed in between.
    fn resume_listeners(&self);

    /// Registry of selection listeners.
    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn SelectionListener>>;
}

#[derive(Default)]
struct SelectionState {
    vertices: FxHashSet<VertexId>,
    edges: FxHashSet<EdgeId>,
    paused: u32,
    pending: bool,
}

fn flag<T: GraphObject>(set: &mut FxHashSet<T>, obj: T, selected: bool) -> bool {
    if selected {
        set.insert(obj)
    } else {
        set.remove(&obj)
    }
}

/// Selection over core vertices and edges.
///
/// Registered as a graph listener, it forgets removed objects.
#[derive(Default)]
pub struct DefaultSelectionModel {
    state: Mutex<SelectionState>,
    listeners: Arc<Listeners<dyn SelectionListener>>,
}

impl DefaultSelectionModel {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `edit` and notifies if it reports a change.
    fn update(&self, edit: impl FnOnce(&mut SelectionState) -> bool) -> bool {
        let notify = {
            let mut state = self.state.lock();
            if !edit(&mut state) {
                return false;
            }
            if state.paused > 0 {
                state.pending = true;
                false
            } else {
                true
            }
        };
        if notify {
            self.listeners.for_each(|l| l.selection_changed());
        }
        true
    }
}

impl SelectionModel<VertexId, EdgeId> for DefaultSelectionModel {
    fn is_vertex_selected(&self, vertex: VertexId) -> bool {
        self.state.lock().vertices.contains(&vertex)
    }

    fn is_edge_selected(&self, edge: EdgeId) -> bool {
        self.state.lock().edges.contains(&edge)
    }

    fn set_vertex_selected(&self, vertex: VertexId, selected: bool) -> bool {
        self.update(|s| flag(&mut s.vertices, vertex, selected))
    }

    fn set_edge_selected(&self, edge: EdgeId, selected: bool) -> bool {
        self.update(|s| flag(&mut s.edges, edge, selected))
    }

    fn set_vertices_selected(&self, vertices: &[VertexId], selected: bool) -> bool {
        self.update(|s| {
            vertices
                .iter()
                .fold(false, |changed, v| flag(&mut s.vertices, *v, selected) | changed)
        })
    }

    fn set_edges_selected(&self, edges: &[EdgeId], selected: bool) -> bool {
        self.update(|s| {
            edges
                .iter()
                .fold(false, |changed, e| flag(&mut s.edges, *e, selected) | changed)
        })
    }

    fn selected_vertices(&self) -> Vec<VertexId> {
        self.state.lock().vertices.iter().copied().collect()
    }

    fn selected_edges(&self) -> Vec<EdgeId> {
        self.state.lock().edges.iter().copied().collect()
    }

    fn clear_selection(&self) -> bool {
        self.update(|s| {
            if s.vertices.is_empty() && s.edges.is_empty() {
                return false;
            }
            s.vertices.clear();
            s.edges.clear();
            true
        })
    }

    fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.vertices.is_empty() && state.edges.is_empty()
    }

    fn pause_listeners(&self) {
        self.state.lock().paused += 1;
    }

    fn resume_listeners(&self) {
        let notify = {
            let mut state = self.state.lock();
            state.paused = state.paused.saturating_sub(1);
            let notify = state.paused == 0 && state.pending;
            if notify {
                state.pending = false;
            }
            notify
        };
        if notify {
            self.listeners.for_each(|l| l.selection_changed());
        }
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn SelectionListener>> {
        self.listeners.clone()
    }
}

impl GraphListener for DefaultSelectionModel {
    fn vertex_removed(&self, _graph: &Graph, vertex: VertexId) {
        self.set_vertex_selected(vertex, false);
    }

    fn edge_removed(&self, _graph: &Graph, edge: EdgeId, _source: VertexId, _target: VertexId) {
        self.set_edge_selected(edge, false);
    }

    fn graph_rebuilt(&self, graph: &Graph) {
        self.update(|s| {
            let before = s.vertices.len() + s.edges.len();
            s.vertices.retain(|v| graph.is_valid_vertex(*v));
            s.edges.retain(|e| graph.is_valid_edge(*e));
            s.vertices.len() + s.edges.len() != before
        });
    }
}

/// Selection model seen through a pair of bimaps.
///
/// Objects without a counterpart on the model side read as unselected and
/// ignore writes; model objects without a counterpart on this side are left
/// out of [`SelectionModel::selected_vertices`] and
/// [`SelectionModel::selected_edges`].
pub struct SelectionModelAdapter<V, E, M: ?Sized, VB, EB> {
    model: Arc<M>,
    vertex_map: VB,
    edge_map: EB,
    listeners: Arc<ForwardedListeners<dyn SelectionListener>>,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E, M, VB, EB> SelectionModelAdapter<V, E, M, VB, EB>
where
    V: GraphObject,
    E: GraphObject,
    M: SelectionModel<V, E> + ?Sized,
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

impl<V, E, WV, WE, M, VB, EB> SelectionModel<WV, WE> for SelectionModelAdapter<V, E, M, VB, EB>
where
    V: GraphObject,
    E: GraphObject,
    WV: GraphObject,
    WE: GraphObject,
    M: SelectionModel<V, E> + ?Sized,
    VB: RefBimap<V, WV>,
    EB: RefBimap<E, WE>,
{
    fn is_vertex_selected(&self, vertex: WV) -> bool {
        self.vertex_map
            .get_left(vertex)
            .is_some_and(|v| self.model.is_vertex_selected(v))
    }

    fn is_edge_selected(&self, edge: WE) -> bool {
        self.edge_map
            .get_left(edge)
            .is_some_and(|e| self.model.is_edge_selected(e))
    }

    fn set_vertex_selected(&self, vertex: WV, selected: bool) -> bool {
        self.vertex_map
            .get_left(vertex)
            .is_some_and(|v| self.model.set_vertex_selected(v, selected))
    }

    fn set_edge_selected(&self, edge: WE, selected: bool) -> bool {
        self.edge_map
            .get_left(edge)
            .is_some_and(|e| self.model.set_edge_selected(e, selected))
    }

    fn set_vertices_selected(&self, vertices: &[WV], selected: bool) -> bool {
        let lefts: Vec<V> = vertices
            .iter()
            .filter_map(|v| self.vertex_map.get_left(*v))
            .collect();
        self.model.set_vertices_selected(&lefts, selected)
    }

    fn set_edges_selected(&self, edges: &[WE], selected: bool) -> bool {
        let lefts: Vec<E> = edges
            .iter()
            .filter_map(|e| self.edge_map.get_left(*e))
            .collect();
        self.model.set_edges_selected(&lefts, selected)
    }

    fn selected_vertices(&self) -> Vec<WV> {
        self.model
            .selected_vertices()
            .into_iter()
            .filter_map(|v| self.vertex_map.get_right(v))
            .collect()
    }

    fn selected_edges(&self) -> Vec<WE> {
        self.model
            .selected_edges()
            .into_iter()
            .filter_map(|e| self.edge_map.get_right(e))
            .collect()
    }

    fn clear_selection(&self) -> bool {
        self.model.clear_selection()
    }

    fn is_empty(&self) -> bool {
        self.model.is_empty()
    }

    fn pause_listeners(&self) {
        self.model.pause_listeners();
    }

    fn resume_listeners(&self) {
        self.model.resume_listeners();
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn SelectionListener>> {
        self.listeners.clone()
    }
}

/// Selection of core objects seen on the branch graph.
///
/// A branch vertex is selected when its vertex is. A branch edge is selected
/// only when every edge and every interior vertex of its chain is, and
/// selecting it writes all of them.
pub struct BranchGraphSelectionAdapter<V, E, S, M: ?Sized> {
    source: Arc<S>,
    model: Arc<M>,
    listeners: Arc<ForwardedListeners<dyn SelectionListener>>,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E, S, M> BranchGraphSelectionAdapter<V, E, S, M>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
    M: SelectionModel<V, E> + ?Sized,
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

    /// Chain of `be`: interior vertices and edges. Both empty if stale.
    fn chain(&self, be: BranchEdgeId) -> (Vec<V>, Vec<E>) {
        self.source.with_branch(|b| {
            (
                b.vertex_branch_iter(be).copied().collect(),
                b.edge_branch_iter(be).copied().collect(),
            )
        })
    }

    fn set_chains_selected(&self, edges: &[BranchEdgeId], selected: bool) -> bool {
        let mut vertices = Vec::new();
        let mut chain_edges = Vec::new();
        self.source.with_branch(|b| {
            for be in edges {
                vertices.extend(b.vertex_branch_iter(BranchItem::Edge(*be)).copied());
                chain_edges.extend(b.edge_branch_iter(BranchItem::Edge(*be)).copied());
            }
        });
        if chain_edges.is_empty() {
            return false;
        }
        self.model.pause_listeners();
        let changed = self.model.set_edges_selected(&chain_edges, selected)
            | self.model.set_vertices_selected(&vertices, selected);
        self.model.resume_listeners();
        changed
    }
}

impl<V, E, S, M> SelectionModel<BranchVertexId, BranchEdgeId> for BranchGraphSelectionAdapter<V, E, S, M>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
    M: SelectionModel<V, E> + ?Sized,
{
    fn is_vertex_selected(&self, bv: BranchVertexId) -> bool {
        self.source
            .with_branch(|b| b.linked_vertex(bv))
            .is_some_and(|v| self.model.is_vertex_selected(v))
    }

    fn is_edge_selected(&self, be: BranchEdgeId) -> bool {
        let (vertices, edges) = self.chain(be);
        !edges.is_empty()
            && edges.iter().all(|e| self.model.is_edge_selected(*e))
            && vertices.iter().all(|v| self.model.is_vertex_selected(*v))
    }

    fn set_vertex_selected(&self, bv: BranchVertexId, selected: bool) -> bool {
        self.source
            .with_branch(|b| b.linked_vertex(bv))
            .is_some_and(|v| self.model.set_vertex_selected(v, selected))
    }

    fn set_edge_selected(&self, be: BranchEdgeId, selected: bool) -> bool {
        self.set_chains_selected(&[be], selected)
    }

    fn set_vertices_selected(&self, vertices: &[BranchVertexId], selected: bool) -> bool {
        let linked: Vec<V> = self
            .source
            .with_branch(|b| vertices.iter().filter_map(|bv| b.linked_vertex(*bv)).collect());
        self.model.set_vertices_selected(&linked, selected)
    }

    fn set_edges_selected(&self, edges: &[BranchEdgeId], selected: bool) -> bool {
        self.set_chains_selected(edges, selected)
    }

    fn selected_vertices(&self) -> Vec<BranchVertexId> {
        let selected = self.model.selected_vertices();
        self.source
            .with_branch(|b| selected.iter().filter_map(|v| b.branch_vertex(*v)).collect())
    }

    fn selected_edges(&self) -> Vec<BranchEdgeId> {
        let selected = self.model.selected_edges();
        let mut seen = FxHashSet::default();
        let candidates: Vec<BranchEdgeId> = self.source.with_branch(|b| {
            selected
                .iter()
                .filter_map(|e| b.branch_edge_of_edge(*e))
                .filter(|be| seen.insert(*be))
                .collect()
        });
        candidates
            .into_iter()
            .filter(|be| self.is_edge_selected(*be))
            .collect()
    }

    fn clear_selection(&self) -> bool {
        self.model.clear_selection()
    }

    fn is_empty(&self) -> bool {
        // Selected interior vertices alone do not show up on the branch graph.
        self.model.is_empty()
            || (self.selected_edges().is_empty() && self.selected_vertices().is_empty())
    }

    fn pause_listeners(&self) {
        self.model.pause_listeners();
    }

    fn resume_listeners(&self) {
        self.model.resume_listeners();
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn SelectionListener>> {
        self.listeners.clone()
    }
}
