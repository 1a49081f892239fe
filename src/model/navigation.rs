use std::marker::PhantomData;
use std::sync::Arc;

use crate::bimap::RefBimap;
use crate::branch::{BranchSource, VertexLink};
use crate::primitives::listeners::{ListenerRegistry, Listeners, TranslatingListeners};
use crate::types::{BranchEdgeId, BranchVertexId, GraphObject};

/// Receiver of navigation requests.
pub trait NavigationListener<V, E>: Send + Sync {
    /// Navigate to `vertex`.
    fn navigate_to_vertex(&self, vertex: V);

    /// Navigate to `edge`.
    fn navigate_to_edge(&self, edge: E);
}

/// Broadcasts navigation requests to every registered listener.
pub trait NavigationHandler<V, E>: Send + Sync {
    /// Asks every listener to navigate to `vertex`.
    fn notify_navigate_to_vertex(&self, vertex: V);

    /// Asks every listener to navigate to `edge`.
    fn notify_navigate_to_edge(&self, edge: E);

    /// Registry of navigation listeners.
    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn NavigationListener<V, E>>>;
}

/// Stateless navigation broadcaster.
pub struct DefaultNavigationHandler<V, E> {
    listeners: Arc<Listeners<dyn NavigationListener<V, E>>>,
}

impl<V: GraphObject, E: GraphObject> Default for DefaultNavigationHandler<V, E> {
    fn default() -> Self {
        Self {
            listeners: Arc::new(Listeners::new()),
        }
    }
}

impl<V: GraphObject, E: GraphObject> DefaultNavigationHandler<V, E> {
    /// Creates a handler with no listeners.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V: GraphObject, E: GraphObject> NavigationHandler<V, E> for DefaultNavigationHandler<V, E> {
    fn notify_navigate_to_vertex(&self, vertex: V) {
        self.listeners.for_each(|l| l.navigate_to_vertex(vertex));
    }

    fn notify_navigate_to_edge(&self, edge: E) {
        self.listeners.for_each(|l| l.navigate_to_edge(edge));
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn NavigationListener<V, E>>> {
        self.listeners.clone()
    }
}

/// Delivers model-side requests to a listener expecting wrapped objects.
struct MappedNavigation<WV, WE, VB, EB> {
    outer: Arc<dyn NavigationListener<WV, WE>>,
    vertex_map: Arc<VB>,
    edge_map: Arc<EB>,
}

impl<V, E, WV, WE, VB, EB> NavigationListener<V, E> for MappedNavigation<WV, WE, VB, EB>
where
    V: GraphObject,
    E: GraphObject,
    WV: GraphObject,
    WE: GraphObject,
    VB: RefBimap<V, WV>,
    EB: RefBimap<E, WE>,
{
    fn navigate_to_vertex(&self, vertex: V) {
        if let Some(wv) = self.vertex_map.get_right(vertex) {
            self.outer.navigate_to_vertex(wv);
        }
    }

    fn navigate_to_edge(&self, edge: E) {
        if let Some(we) = self.edge_map.get_right(edge) {
            self.outer.navigate_to_edge(we);
        }
    }
}

/// Navigation handler seen through a pair of bimaps.
///
/// Requests with no model-side counterpart are dropped in both directions.
pub struct NavigationHandlerAdapter<V, E, WV, WE, H: ?Sized, VB, EB> {
    handler: Arc<H>,
    vertex_map: Arc<VB>,
    edge_map: Arc<EB>,
    listeners: Arc<TranslatingListeners<dyn NavigationListener<WV, WE>, dyn NavigationListener<V, E>>>,
}

impl<V, E, WV, WE, H, VB, EB> NavigationHandlerAdapter<V, E, WV, WE, H, VB, EB>
where
    V: GraphObject,
    E: GraphObject,
    WV: GraphObject,
    WE: GraphObject,
    H: NavigationHandler<V, E> + ?Sized,
    VB: RefBimap<V, WV> + 'static,
    EB: RefBimap<E, WE> + 'static,
{
    /// Wraps `handler`.
    pub fn new(handler: Arc<H>, vertex_map: VB, edge_map: EB) -> Self {
        let vertex_map = Arc::new(vertex_map);
        let edge_map = Arc::new(edge_map);
        let (vm, em) = (vertex_map.clone(), edge_map.clone());
        let listeners = Arc::new(TranslatingListeners::new(
            handler.listeners(),
            move |outer: Arc<dyn NavigationListener<WV, WE>>| {
                Arc::new(MappedNavigation {
                    outer,
                    vertex_map: vm.clone(),
                    edge_map: em.clone(),
                }) as Arc<dyn NavigationListener<V, E>>
            },
        ));
        Self {
            handler,
            vertex_map,
            edge_map,
            listeners,
        }
    }
    /// Deregisters every listener added through this adapter.
    pub fn remove_all_listeners(&self) {
        self.listeners.remove_all();
    }
}

impl<V, E, WV, WE, H, VB, EB> NavigationHandler<WV, WE>
    for NavigationHandlerAdapter<V, E, WV, WE, H, VB, EB>
where
    V: GraphObject,
    E: GraphObject,
    WV: GraphObject,
    WE: GraphObject,
    H: NavigationHandler<V, E> + ?Sized,
    VB: RefBimap<V, WV> + 'static,
    EB: RefBimap<E, WE> + 'static,
{
    fn notify_navigate_to_vertex(&self, vertex: WV) {
        if let Some(v) = self.vertex_map.get_left(vertex) {
            self.handler.notify_navigate_to_vertex(v);
        }
    }

    fn notify_navigate_to_edge(&self, edge: WE) {
        if let Some(e) = self.edge_map.get_left(edge) {
            self.handler.notify_navigate_to_edge(e);
        }
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn NavigationListener<WV, WE>>> {
        self.listeners.clone()
    }
}

/// Delivers core requests to a listener on the branch graph.
struct BranchNavigation<V, E, S> {
    outer: Arc<dyn NavigationListener<BranchVertexId, BranchEdgeId>>,
    source: Arc<S>,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E, S> NavigationListener<V, E> for BranchNavigation<V, E, S>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
{
    fn navigate_to_vertex(&self, vertex: V) {
        match self.source.with_branch(|b| b.vertex_link(vertex)) {
            Some(VertexLink::Vertex(bv)) => self.outer.navigate_to_vertex(bv),
            Some(VertexLink::Interior(be)) => self.outer.navigate_to_edge(be),
            None => {}
        }
    }

    fn navigate_to_edge(&self, edge: E) {
        if let Some(be) = self.source.with_branch(|b| b.branch_edge_of_edge(edge)) {
            self.outer.navigate_to_edge(be);
        }
    }
}

/// Navigation of core objects seen on the branch graph.
///
/// Outgoing requests go to the linked core objects. An incoming request for
/// a vertex inside a chain arrives as a request for the chain's branch edge.
pub struct BranchGraphNavigationAdapter<V, E, S, H: ?Sized> {
    source: Arc<S>,
    handler: Arc<H>,
    listeners: Arc<
        TranslatingListeners<
            dyn NavigationListener<BranchVertexId, BranchEdgeId>,
            dyn NavigationListener<V, E>,
        >,
    >,
}

impl<V, E, S, H> BranchGraphNavigationAdapter<V, E, S, H>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E> + 'static,
    H: NavigationHandler<V, E> + ?Sized,
{
    /// Wraps `handler`, reading the condensation from `source`.
    pub fn new(source: Arc<S>, handler: Arc<H>) -> Self {
        let lent = source.clone();
        let listeners = Arc::new(TranslatingListeners::new(
            handler.listeners(),
            move |outer: Arc<dyn NavigationListener<BranchVertexId, BranchEdgeId>>| {
                Arc::new(BranchNavigation {
                    outer,
                    source: lent.clone(),
                    _marker: PhantomData,
                }) as Arc<dyn NavigationListener<V, E>>
            },
        ));
        Self {
            source,
            handler,
            listeners,
        }
    }
    /// Deregisters every listener added through this adapter.
    pub fn remove_all_listeners(&self) {
        self.listeners.remove_all();
    }
}

impl<V, E, S, H> NavigationHandler<BranchVertexId, BranchEdgeId>
    for BranchGraphNavigationAdapter<V, E, S, H>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E> + 'static,
    H: NavigationHandler<V, E> + ?Sized,
{
    fn notify_navigate_to_vertex(&self, bv: BranchVertexId) {
        if let Some(vertex) = self.source.with_branch(|b| b.linked_vertex(bv)) {
            self.handler.notify_navigate_to_vertex(vertex);
        }
    }

    fn notify_navigate_to_edge(&self, be: BranchEdgeId) {
        if let Some(edge) = self.source.with_branch(|b| b.linked_edge(be)) {
            self.handler.notify_navigate_to_edge(edge);
        }
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn NavigationListener<BranchVertexId, BranchEdgeId>>> {
        self.listeners.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::{Mutex, RwLock};

    use crate::bimap::IdentityBimap;
    use crate::model::{ModelGraph, ModelOptions};
    use crate::types::{EdgeId, LineageError, Result, VertexId};

    #[derive(Debug, PartialEq, Eq)]
    enum Request<V, E> {
        Vertex(V),
        Edge(E),
    }

    struct Recorder<V, E>(Mutex<Vec<Request<V, E>>>);

    impl<V, E> Default for Recorder<V, E> {
        fn default() -> Self {
            Self(Mutex::new(Vec::new()))
        }
    }

    impl<V: GraphObject, E: GraphObject> NavigationListener<V, E> for Recorder<V, E> {
        fn navigate_to_vertex(&self, vertex: V) {
            self.0.lock().push(Request::Vertex(vertex));
        }

        fn navigate_to_edge(&self, edge: E) {
            self.0.lock().push(Request::Edge(edge));
        }
    }

    #[test]
    fn translated_listeners_can_be_removed() -> Result<()> {
        let mut graph = ModelGraph::new(&ModelOptions::default());
        let v = graph.add_vertex()?;
        let handler = Arc::new(DefaultNavigationHandler::<VertexId, EdgeId>::new());
        let adapter = NavigationHandlerAdapter::new(
            handler.clone(),
            IdentityBimap::<VertexId>::new(),
            IdentityBimap::<EdgeId>::new(),
        );
        let recorder = Arc::new(Recorder::<VertexId, EdgeId>::default());
        let listener: Arc<dyn NavigationListener<VertexId, EdgeId>> = recorder.clone();

        assert!(adapter.listeners().add(listener.clone()));
        adapter.notify_navigate_to_vertex(v);
        assert_eq!(*recorder.0.lock(), vec![Request::Vertex(v)]);

        assert!(adapter.listeners().remove(&listener));
        handler.notify_navigate_to_vertex(v);
        assert_eq!(recorder.0.lock().len(), 1);
        Ok(())
    }

    #[test]
    fn adapter_teardown_spares_foreign_listeners() -> Result<()> {
        let mut graph = ModelGraph::new(&ModelOptions::default());
        let a = graph.add_vertex()?;
        let b = graph.add_vertex()?;
        graph.add_edge(a, b)?;
        let shared = Arc::new(RwLock::new(graph));
        let handler = Arc::new(DefaultNavigationHandler::<VertexId, EdgeId>::new());
        let foreign = Arc::new(Recorder::<VertexId, EdgeId>::default());
        handler.listeners().add(foreign.clone());

        let mapped: NavigationHandlerAdapter<VertexId, EdgeId, VertexId, EdgeId, _, _, _> =
            NavigationHandlerAdapter::new(
                handler.clone(),
                IdentityBimap::<VertexId>::new(),
                IdentityBimap::<EdgeId>::new(),
            );
        let branch = BranchGraphNavigationAdapter::new(shared, handler.clone());
        let on_mapped = Arc::new(Recorder::<VertexId, EdgeId>::default());
        let on_branch = Arc::new(Recorder::<BranchVertexId, BranchEdgeId>::default());
        mapped.listeners().add(on_mapped.clone());
        branch.listeners().add(on_branch.clone());

        mapped.remove_all_listeners();
        branch.remove_all_listeners();
        handler.notify_navigate_to_vertex(a);
        assert_eq!(*foreign.0.lock(), vec![Request::Vertex(a)]);
        assert!(on_mapped.0.lock().is_empty());
        assert!(on_branch.0.lock().is_empty());
        Ok(())
    }

    #[test]
    fn mid_chain_vertex_arrives_as_its_branch_edge() -> Result<()> {
        let mut graph = ModelGraph::new(&ModelOptions::default());
        let a = graph.add_vertex()?;
        let b = graph.add_vertex()?;
        let c = graph.add_vertex()?;
        let first = graph.add_edge(a, b)?;
        graph.add_edge(b, c)?;
        let branch = graph.branch();
        let be = branch
            .branch_edge_of_vertex(b)
            .ok_or(LineageError::NotFound("chain"))?;
        let root = branch
            .branch_vertex(a)
            .ok_or(LineageError::NotFound("root"))?;
        let shared = Arc::new(RwLock::new(graph));

        let handler = Arc::new(DefaultNavigationHandler::<VertexId, EdgeId>::new());
        let adapter = BranchGraphNavigationAdapter::new(shared, handler.clone());
        let recorder = Arc::new(Recorder::<BranchVertexId, BranchEdgeId>::default());
        adapter.listeners().add(recorder.clone());

        handler.notify_navigate_to_vertex(b);
        handler.notify_navigate_to_vertex(a);
        handler.notify_navigate_to_edge(first);
        assert_eq!(
            *recorder.0.lock(),
            vec![Request::Edge(be), Request::Vertex(root), Request::Edge(be)]
        );

        let core = Arc::new(Recorder::<VertexId, EdgeId>::default());
        handler.listeners().add(core.clone());
        adapter.notify_navigate_to_edge(be);
        assert_eq!(*core.0.lock(), vec![Request::Edge(first)]);
        Ok(())
    }
}
