use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bimap::RefBimap;
use crate::branch::BranchSource;
use crate::primitives::listeners::{ForwardedListeners, ListenerRegistry, Listeners, NotifyGate};
use crate::storage::{Graph, GraphListener};
use crate::types::{BranchVertexId, GraphObject, VertexId};

/// Observer of focus changes.
pub trait FocusListener: Send + Sync {
    /// The focused vertex changed.
    fn focus_changed(&self);
}

/// At most one focused vertex.
pub trait FocusModel<V>: Send + Sync {
    /// Focuses `vertex`, or clears the focus for `None`.
    fn focus_vertex(&self, vertex: Option<V>);

    /// The focused vertex.
    fn focused_vertex(&self) -> Option<V>;

    /// Registry of focus listeners.
    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn FocusListener>>;
}

/// Focus over core vertices; drops the focus when the vertex is removed.
#[derive(Default)]
pub struct DefaultFocusModel {
    focused: Mutex<Option<VertexId>>,
    listeners: Arc<Listeners<dyn FocusListener>>,
    gate: NotifyGate,
}

impl DefaultFocusModel {
    /// Creates a model with nothing focused.
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds back change notifications. Pauses nest.
    pub fn pause_listeners(&self) {
        self.gate.hold();
    }

    /// Releases one pause; the outermost resume notifies once if the focus
    /// moved in between.
    pub fn resume_listeners(&self) {
        if self.gate.release() {
            self.listeners.for_each(|l| l.focus_changed());
        }
    }

    /// Moves the focus to `next` if `applies` accepts the current focus.
    fn refocus(&self, next: Option<VertexId>, applies: impl FnOnce(Option<VertexId>) -> bool) {
        let changed = {
            let mut focused = self.focused.lock();
            if !applies(*focused) || *focused == next {
                false
            } else {
                *focused = next;
                true
            }
        };
        if changed && self.gate.changed() {
            self.listeners.for_each(|l| l.focus_changed());
        }
    }
}

impl FocusModel<VertexId> for DefaultFocusModel {
    fn focus_vertex(&self, vertex: Option<VertexId>) {
        self.refocus(vertex, |_| true);
    }

    fn focused_vertex(&self) -> Option<VertexId> {
        *self.focused.lock()
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn FocusListener>> {
        self.listeners.clone()
    }
}

impl GraphListener for DefaultFocusModel {
    fn vertex_removed(&self, _graph: &Graph, vertex: VertexId) {
        self.refocus(None, |current| current == Some(vertex));
    }

    fn graph_rebuilt(&self, graph: &Graph) {
        if let Some(vertex) = self.focused_vertex() {
            if !graph.is_valid_vertex(vertex) {
                self.refocus(None, |current| current == Some(vertex));
            }
        }
    }
}

/// Focus model seen through a vertex bimap.
pub struct FocusModelAdapter<V, M: ?Sized, VB> {
    model: Arc<M>,
    vertex_map: VB,
    listeners: Arc<ForwardedListeners<dyn FocusListener>>,
    _marker: PhantomData<fn() -> V>,
}

impl<V, M, VB> FocusModelAdapter<V, M, VB>
where
    V: GraphObject,
    M: FocusModel<V> + ?Sized,
{
    /// Wraps `model`.
    pub fn new(model: Arc<M>, vertex_map: VB) -> Self {
        let listeners = Arc::new(ForwardedListeners::new(model.listeners()));
        Self {
            model,
            vertex_map,
            listeners,
            _marker: PhantomData,
        }
    }

    /// Deregisters every listener added through this adapter.
    pub fn remove_all_listeners(&self) {
        self.listeners.remove_all();
    }
}

impl<V, WV, M, VB> FocusModel<WV> for FocusModelAdapter<V, M, VB>
where
    V: GraphObject,
    WV: GraphObject,
    M: FocusModel<V> + ?Sized,
    VB: RefBimap<V, WV>,
{
    fn focus_vertex(&self, vertex: Option<WV>) {
        self.model
            .focus_vertex(vertex.and_then(|v| self.vertex_map.get_left(v)));
    }

    fn focused_vertex(&self) -> Option<WV> {
        self.vertex_map.get_right(self.model.focused_vertex()?)
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn FocusListener>> {
        self.listeners.clone()
    }
}

/// Focus of core vertices seen on the branch graph.
///
/// A focused interior vertex has no branch vertex and reads as no focus.
pub struct BranchGraphFocusAdapter<V, E, S, M: ?Sized> {
    source: Arc<S>,
    model: Arc<M>,
    listeners: Arc<ForwardedListeners<dyn FocusListener>>,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E, S, M> BranchGraphFocusAdapter<V, E, S, M>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
    M: FocusModel<V> + ?Sized,
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

impl<V, E, S, M> FocusModel<BranchVertexId> for BranchGraphFocusAdapter<V, E, S, M>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
    M: FocusModel<V> + ?Sized,
{
    fn focus_vertex(&self, bv: Option<BranchVertexId>) {
        let vertex = bv.and_then(|bv| self.source.with_branch(|b| b.linked_vertex(bv)));
        self.model.focus_vertex(vertex);
    }

    fn focused_vertex(&self) -> Option<BranchVertexId> {
        let vertex = self.model.focused_vertex()?;
        self.source.with_branch(|b| b.branch_vertex(vertex))
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn FocusListener>> {
        self.listeners.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::RwLock;

    use crate::bimap::IdentityBimap;
    use crate::model::{ModelGraph, ModelOptions};
    use crate::types::{LineageError, Result};

    #[derive(Default)]
    struct Changes(AtomicUsize);

    impl FocusListener for Changes {
        fn focus_changed(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn removal_drops_only_the_focused_vertex() -> Result<()> {
        let mut graph = Graph::new();
        let focus = Arc::new(DefaultFocusModel::new());
        graph.listeners().add(focus.clone());
        let changes = Arc::new(Changes::default());
        focus.listeners().add(changes.clone());

        let a = graph.add_vertex();
        let b = graph.add_vertex();
        focus.focus_vertex(Some(a));
        graph.remove_vertex(b)?;
        assert_eq!(focus.focused_vertex(), Some(a));
        graph.remove_vertex(a)?;
        assert_eq!(focus.focused_vertex(), None);
        assert_eq!(changes.0.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn adapters_translate_both_ways() -> Result<()> {
        let mut graph = ModelGraph::new(&ModelOptions::default());
        let a = graph.add_vertex()?;
        let b = graph.add_vertex()?;
        let c = graph.add_vertex()?;
        graph.add_edge(a, b)?;
        graph.add_edge(b, c)?;
        let root = graph
            .branch()
            .branch_vertex(a)
            .ok_or(LineageError::NotFound("root"))?;
        let shared = Arc::new(RwLock::new(graph));
        let focus = Arc::new(DefaultFocusModel::new());

        let branch = BranchGraphFocusAdapter::new(shared, focus.clone());
        branch.focus_vertex(Some(root));
        assert_eq!(focus.focused_vertex(), Some(a));
        assert_eq!(branch.focused_vertex(), Some(root));
        focus.focus_vertex(Some(b));
        assert_eq!(branch.focused_vertex(), None);

        let same = FocusModelAdapter::new(focus.clone(), IdentityBimap::<VertexId>::new());
        same.focus_vertex(Some(c));
        assert_eq!(focus.focused_vertex(), Some(c));
        Ok(())
    }
}
