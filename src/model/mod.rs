//! Application-facing models and their cross-representation adapters.
//!
//! [`ModelGraph`] couples the core [`Graph`] with its [`BranchGraph`] and
//! keeps the condensation in step with every mutation. [`Model`] shares it
//! behind a reader/writer lock together with the feature store and the
//! default selection, highlight, focus, navigation and tag models, and builds
//! branch adapters over it on request.
//!
//! Adapters read the branch graph with recursive read acquisition, so they
//! must not be called from a thread that holds the write guard. The default
//! models hold their own notifications while a [`ModelWriteGuard`] is alive
//! and deliver them after the lock is released, which lets their listeners
//! read branch views freely.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::bimap::{BranchEdgeBimap, BranchVertexBimap};
use crate::branch::{BranchGraph, BranchSource};
use crate::storage::features::{FeatureModel, UndoStepId, UndoStepIds};
use crate::storage::{Graph, GraphListener, ReadOnlyGraph};
use crate::types::{EdgeId, LineageError, Result, VertexId};

mod focus;
mod highlight;
mod navigation;
mod options;
mod selection;
mod tag;

pub use focus::{BranchGraphFocusAdapter, DefaultFocusModel, FocusListener, FocusModel, FocusModelAdapter};
pub use highlight::{
    BranchGraphHighlightAdapter, DefaultHighlightModel, HighlightListener, HighlightModel,
    HighlightModelAdapter,
};
pub use navigation::{
    BranchGraphNavigationAdapter, DefaultNavigationHandler, NavigationHandler,
    NavigationHandlerAdapter, NavigationListener,
};
pub use options::{BranchRepair, ModelOptions};
pub use selection::{
    BranchGraphSelectionAdapter, DefaultSelectionModel, SelectionListener, SelectionModel,
    SelectionModelAdapter,
};
pub use tag::{
    BranchGraphTagSetAdapter, DefaultObjTags, DefaultTagSetModel, ObjTags, Tag, TagId, TagSet, TagSetListener,
    TagSetModel, TagSetStructure,
};

/// Shared, lockable model graph.
pub type SharedGraph = RwLock<ModelGraph>;

/// Core mutation to replay on the branch graph.
enum Change {
    VertexAdded(VertexId),
    VertexRemoved(VertexId),
    EdgeAdded(EdgeId),
    EdgeRemoved {
        edge: EdgeId,
        source: VertexId,
        target: VertexId,
    },
}

/// Core graph with an always-current branch condensation.
pub struct ModelGraph {
    graph: Graph,
    branch: BranchGraph<VertexId, EdgeId>,
    repair: BranchRepair,
    verify: bool,
}

impl Default for ModelGraph {
    fn default() -> Self {
        Self::new(&ModelOptions::default())
    }
}

impl ModelGraph {
    /// Creates an empty model graph.
    pub fn new(options: &ModelOptions) -> Self {
        let graph = Graph::with_capacity(options.vertex_capacity, options.edge_capacity);
        let branch = BranchGraph::build(&graph);
        Self {
            graph,
            branch,
            repair: options.branch_repair,
            verify: options.verify_branch_graph,
        }
    }

    /// The core graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The branch condensation of [`ModelGraph::graph`].
    pub fn branch(&self) -> &BranchGraph<VertexId, EdgeId> {
        &self.branch
    }

    /// Adds an isolated vertex.
    pub fn add_vertex(&mut self) -> Result<VertexId> {
        let vertex = self.graph.add_vertex();
        self.sync(Change::VertexAdded(vertex))?;
        Ok(vertex)
    }

    /// Adds an edge from `source` to `target`.
    pub fn add_edge(&mut self, source: VertexId, target: VertexId) -> Result<EdgeId> {
        let edge = self.graph.add_edge(source, target)?;
        self.sync(Change::EdgeAdded(edge))?;
        Ok(edge)
    }

    /// Removes `edge`.
    pub fn remove_edge(&mut self, edge: EdgeId) -> Result<()> {
        let (Some(source), Some(target)) = (self.graph.source(edge), self.graph.target(edge)) else {
            return Err(LineageError::StaleHandle("remove_edge on stale edge"));
        };
        self.graph.remove_edge(edge)?;
        self.sync(Change::EdgeRemoved {
            edge,
            source,
            target,
        })
    }

    /// Removes `vertex` and its incident edges, edges first.
    pub fn remove_vertex(&mut self, vertex: VertexId) -> Result<()> {
        self.graph
            .ensure_vertex(vertex, "remove_vertex on stale vertex")?;
        while let Some(edge) = self.graph.first_incident_edge(vertex) {
            self.remove_edge(edge)?;
        }
        self.graph.remove_vertex(vertex)?;
        self.sync(Change::VertexRemoved(vertex))
    }

    /// Recomputes the branch graph from scratch.
    pub fn rebuild_branch_graph(&mut self) {
        self.branch.rebuild(&self.graph);
    }

    /// Checks the branch graph against the core graph.
    pub fn verify_branch_graph(&self) -> Result<()> {
        self.branch.verify(&self.graph)
    }

    /// Holds back core graph events until [`ModelGraph::resume_listeners`].
    ///
    /// The branch graph keeps being repaired while events are held back.
    pub fn pause_listeners(&mut self) {
        self.graph.pause_listeners();
    }

    /// Resumes core graph events.
    pub fn resume_listeners(&mut self) {
        self.graph.resume_listeners();
    }

    fn sync(&mut self, change: Change) -> Result<()> {
        let graph = &self.graph;
        match (self.repair, change) {
            (BranchRepair::Rebuild, _) => self.branch.rebuild(graph),
            (BranchRepair::Incremental, Change::VertexAdded(v)) => self.branch.vertex_added(graph, v),
            (BranchRepair::Incremental, Change::VertexRemoved(v)) => {
                self.branch.vertex_removed(graph, v)
            }
            (BranchRepair::Incremental, Change::EdgeAdded(e)) => self.branch.edge_added(graph, e),
            (
                BranchRepair::Incremental,
                Change::EdgeRemoved {
                    edge,
                    source,
                    target,
                },
            ) => self.branch.edge_removed(graph, edge, source, target),
        }
        if self.verify {
            self.branch.verify(graph)?;
        }
        Ok(())
    }
}

impl ReadOnlyGraph for ModelGraph {
    type Vertex = VertexId;
    type Edge = EdgeId;
    type Vertices<'a> = <Graph as ReadOnlyGraph>::Vertices<'a>;
    type Edges<'a> = <Graph as ReadOnlyGraph>::Edges<'a>;

    fn contains_vertex(&self, vertex: VertexId) -> bool {
        self.graph.is_valid_vertex(vertex)
    }

    fn contains_edge(&self, edge: EdgeId) -> bool {
        self.graph.is_valid_edge(edge)
    }

    fn source(&self, edge: EdgeId) -> Option<VertexId> {
        self.graph.source(edge)
    }

    fn target(&self, edge: EdgeId) -> Option<VertexId> {
        self.graph.target(edge)
    }

    fn incoming_edges(&self, vertex: VertexId) -> &[EdgeId] {
        self.graph.incoming_edges(vertex)
    }

    fn outgoing_edges(&self, vertex: VertexId) -> &[EdgeId] {
        self.graph.outgoing_edges(vertex)
    }

    fn vertices(&self) -> Self::Vertices<'_> {
        ReadOnlyGraph::vertices(&self.graph)
    }

    fn edges(&self) -> Self::Edges<'_> {
        ReadOnlyGraph::edges(&self.graph)
    }

    fn vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }

    fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl BranchSource<VertexId, EdgeId> for SharedGraph {
    fn with_branch<R>(&self, f: impl FnOnce(&BranchGraph<VertexId, EdgeId>) -> R) -> R {
        f(self.read_recursive().branch())
    }
}

/// Branch-view selection over the model's default selection.
pub type BranchSelection =
    BranchGraphSelectionAdapter<VertexId, EdgeId, SharedGraph, DefaultSelectionModel>;
/// Branch-view highlight over the model's default highlight.
pub type BranchHighlight =
    BranchGraphHighlightAdapter<VertexId, EdgeId, SharedGraph, DefaultHighlightModel>;
/// Branch-view focus over the model's default focus.
pub type BranchFocus = BranchGraphFocusAdapter<VertexId, EdgeId, SharedGraph, DefaultFocusModel>;
/// Branch-view navigation over the model's default handler.
pub type BranchNavigation = BranchGraphNavigationAdapter<
    VertexId,
    EdgeId,
    SharedGraph,
    DefaultNavigationHandler<VertexId, EdgeId>,
>;
/// Branch-view tags over the model's default tag model.
pub type BranchTags = BranchGraphTagSetAdapter<VertexId, EdgeId, SharedGraph, DefaultTagSetModel>;

/// Write access to a [`Model`]'s graph.
///
/// Fields drop in order: the lock is released before held notifications are
/// delivered.
pub struct ModelWriteGuard<'a> {
    graph: RwLockWriteGuard<'a, ModelGraph>,
    _held: HeldNotifications<'a>,
}

impl Deref for ModelWriteGuard<'_> {
    type Target = ModelGraph;

    fn deref(&self) -> &ModelGraph {
        &self.graph
    }
}

impl DerefMut for ModelWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut ModelGraph {
        &mut self.graph
    }
}

/// Pauses the default models for as long as it lives.
struct HeldNotifications<'a> {
    model: &'a Model,
}

impl<'a> HeldNotifications<'a> {
    fn new(model: &'a Model) -> Self {
        model.selection.pause_listeners();
        model.highlight.pause_listeners();
        model.focus.pause_listeners();
        model.tags.pause_listeners();
        Self { model }
    }
}

impl Drop for HeldNotifications<'_> {
    fn drop(&mut self) {
        self.model.selection.resume_listeners();
        self.model.highlight.resume_listeners();
        self.model.focus.resume_listeners();
        self.model.tags.resume_listeners();
    }
}

/// Lineage model: the shared graph plus everything attached to it.
pub struct Model {
    options: ModelOptions,
    graph: Arc<SharedGraph>,
    features: FeatureModel,
    undo_steps: UndoStepIds,
    selection: Arc<DefaultSelectionModel>,
    highlight: Arc<DefaultHighlightModel>,
    focus: Arc<DefaultFocusModel>,
    navigation: Arc<DefaultNavigationHandler<VertexId, EdgeId>>,
    tags: Arc<DefaultTagSetModel>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(ModelOptions::default())
    }
}

impl Model {
    /// Creates an empty model and wires the default models to its graph.
    pub fn new(options: ModelOptions) -> Self {
        let model_graph = ModelGraph::new(&options);
        let registry = model_graph.graph().listener_registry();
        let features = FeatureModel::new(registry.clone());

        let selection = Arc::new(DefaultSelectionModel::new());
        let highlight = Arc::new(DefaultHighlightModel::new());
        let focus = Arc::new(DefaultFocusModel::new());
        let tags = Arc::new(DefaultTagSetModel::new());
        registry.add(selection.clone() as Arc<dyn GraphListener>);
        registry.add(highlight.clone() as Arc<dyn GraphListener>);
        registry.add(focus.clone() as Arc<dyn GraphListener>);
        registry.add(tags.clone() as Arc<dyn GraphListener>);

        debug!(
            vertex_capacity = options.vertex_capacity,
            edge_capacity = options.edge_capacity,
            branch_repair = ?options.branch_repair,
            verify = options.verify_branch_graph,
            "model.open"
        );
        Self {
            options,
            graph: Arc::new(RwLock::new(model_graph)),
            features,
            undo_steps: UndoStepIds::default(),
            selection,
            highlight,
            focus,
            navigation: Arc::new(DefaultNavigationHandler::new()),
            tags,
        }
    }

    /// Options this model was created with.
    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// The shared graph, for collaborators that outlive a borrow of `self`.
    pub fn graph(&self) -> &Arc<SharedGraph> {
        &self.graph
    }

    /// Read access; may be taken again on a thread that already reads.
    pub fn read(&self) -> RwLockReadGuard<'_, ModelGraph> {
        self.graph.read_recursive()
    }

    /// Exclusive access for mutations.
    ///
    /// Selection, highlight, focus and tag notifications raised while the
    /// guard is alive are delivered once it drops, after the lock is free.
    pub fn write(&self) -> ModelWriteGuard<'_> {
        let graph = self.graph.write();
        ModelWriteGuard {
            graph,
            _held: HeldNotifications::new(self),
        }
    }

    /// Feature store attached to the graph.
    pub fn features(&self) -> &FeatureModel {
        &self.features
    }

    /// Hands out a fresh undo step id.
    pub fn next_undo_step(&self) -> UndoStepId {
        self.undo_steps.next_id()
    }

    /// Default selection over core objects.
    pub fn selection(&self) -> &Arc<DefaultSelectionModel> {
        &self.selection
    }

    /// Default highlight over core objects.
    pub fn highlight(&self) -> &Arc<DefaultHighlightModel> {
        &self.highlight
    }

    /// Default focus over core vertices.
    pub fn focus(&self) -> &Arc<DefaultFocusModel> {
        &self.focus
    }

    /// Default navigation handler over core objects.
    pub fn navigation(&self) -> &Arc<DefaultNavigationHandler<VertexId, EdgeId>> {
        &self.navigation
    }

    /// Default tag model over core objects.
    pub fn tags(&self) -> &Arc<DefaultTagSetModel> {
        &self.tags
    }

    /// Core vertex to branch vertex translation.
    pub fn branch_vertex_bimap(&self) -> BranchVertexBimap<SharedGraph, VertexId, EdgeId> {
        BranchVertexBimap::new(self.graph.clone())
    }

    /// Core edge to branch edge translation.
    pub fn branch_edge_bimap(&self) -> BranchEdgeBimap<SharedGraph, VertexId, EdgeId> {
        BranchEdgeBimap::new(self.graph.clone())
    }

    /// Selection as seen on the branch graph.
    pub fn branch_selection(&self) -> BranchSelection {
        BranchGraphSelectionAdapter::new(self.graph.clone(), self.selection.clone())
    }

    /// Highlight as seen on the branch graph.
    pub fn branch_highlight(&self) -> BranchHighlight {
        BranchGraphHighlightAdapter::new(self.graph.clone(), self.highlight.clone())
    }

    /// Focus as seen on the branch graph.
    pub fn branch_focus(&self) -> BranchFocus {
        BranchGraphFocusAdapter::new(self.graph.clone(), self.focus.clone())
    }

    /// Navigation as seen on the branch graph.
    pub fn branch_navigation(&self) -> BranchNavigation {
        BranchGraphNavigationAdapter::new(self.graph.clone(), self.navigation.clone())
    }

    /// Tags as seen on the branch graph.
    pub fn branch_tags(&self) -> BranchTags {
        BranchGraphTagSetAdapter::new(self.graph.clone(), self.tags.clone())
    }
}
