#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lineage::bimap::{ComposedBimap, IdentityBimap, RefBimap};
use lineage::model::{
    DefaultSelectionModel, FocusModel, HighlightModel, NavigationHandler, NavigationListener,
    ObjTags, SelectionListener, SelectionModel, SelectionModelAdapter, TagSetModel, TagSetStructure,
};
use lineage::primitives::listeners::{ForwardedListeners, ListenerRegistry};
use lineage::{BranchEdgeId, BranchVertexId, EdgeId, LineageError, Model, Result, VertexId};

fn chain(model: &Model, n: usize) -> Result<(Vec<VertexId>, Vec<EdgeId>)> {
    let mut graph = model.write();
    let vertices = (0..n)
        .map(|_| graph.add_vertex())
        .collect::<Result<Vec<_>>>()?;
    let edges = vertices
        .windows(2)
        .map(|pair| graph.add_edge(pair[0], pair[1]))
        .collect::<Result<Vec<_>>>()?;
    Ok((vertices, edges))
}

fn branch_edge(model: &Model, e: EdgeId) -> Result<BranchEdgeId> {
    model
        .read()
        .branch()
        .branch_edge_of_edge(e)
        .ok_or(LineageError::NotFound("branch edge"))
}

#[derive(Default)]
struct Changes(AtomicUsize);

impl Changes {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl SelectionListener for Changes {
    fn selection_changed(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn chain_selection_is_all_or_nothing() -> Result<()> {
    let model = Model::default();
    let (vs, es) = chain(&model, 6)?;
    let be = branch_edge(&model, es[0])?;
    let selection = model.branch_selection();

    // Selecting constituents one by one flips the branch edge only at the end.
    let mut flips = 0;
    let mut was = selection.is_edge_selected(be);
    for e in &es {
        model.selection().set_edge_selected(*e, true);
        let now = selection.is_edge_selected(be);
        flips += usize::from(now != was);
        was = now;
    }
    for v in &vs[1..5] {
        model.selection().set_vertex_selected(*v, true);
        let now = selection.is_edge_selected(be);
        flips += usize::from(now != was);
        was = now;
    }
    assert_eq!(flips, 1);
    assert!(was);

    selection.toggle_edge(be);
    assert!(model.selection().selected_edges().is_empty());
    assert!(!model.selection().is_vertex_selected(vs[3]));
    Ok(())
}

#[test]
fn multi_element_edits_notify_once() -> Result<()> {
    let model = Model::default();
    let (_, es) = chain(&model, 5)?;
    let be = branch_edge(&model, es[0])?;
    let selection = model.branch_selection();
    let changes = Arc::new(Changes::default());
    selection.listeners().add(changes.clone());

    assert!(selection.set_edges_selected(&[be], true));
    assert_eq!(changes.count(), 1);
    assert!(!selection.set_edges_selected(&[be], true));
    assert_eq!(changes.count(), 1);
    Ok(())
}

#[test]
fn forwarded_listeners_leave_other_views_alone() -> Result<()> {
    let model = Model::default();
    let (vs, _) = chain(&model, 2)?;
    let registry = model.selection().listeners();

    let other = Arc::new(Changes::default());
    registry.add(other.clone());

    let view_a = model.branch_selection();
    let view_b: SelectionModelAdapter<VertexId, EdgeId, DefaultSelectionModel, _, _> =
        SelectionModelAdapter::new(
            model.selection().clone(),
            IdentityBimap::<VertexId>::new(),
            IdentityBimap::<EdgeId>::new(),
        );
    let a = Arc::new(Changes::default());
    let b = Arc::new(Changes::default());
    view_a.listeners().add(a.clone());
    SelectionModel::<VertexId, EdgeId>::listeners(&view_b).add(b.clone());

    view_a.remove_all_listeners();
    model.selection().set_vertex_selected(vs[0], true);
    assert_eq!((a.count(), b.count(), other.count()), (0, 1, 1));

    let facade = ForwardedListeners::new(registry.clone());
    let c: Arc<dyn SelectionListener> = Arc::new(Changes::default());
    assert!(facade.add(c.clone()));
    assert!(!facade.add(c.clone()));
    facade.remove_all();
    assert!(!registry.remove(&c));
    assert!(registry.remove(&(other as Arc<dyn SelectionListener>)));
    Ok(())
}

#[test]
fn branch_tags_follow_the_whole_chain() -> Result<()> {
    let model = Model::default();
    let (vs, es) = chain(&model, 4)?;
    let be = branch_edge(&model, es[1])?;
    let mut tss = TagSetStructure::new();
    let fate = tss.create_tag_set("fate");
    let dies = tss.create_tag(fate, "dies", 0xFF_00_00_00)?;
    model.tags().set_tag_set_structure(tss);
    let tags = model.branch_tags();

    tags.edge_tags().set(be, dies)?;
    assert_eq!(tags.edge_tags().get(be, fate), Some(dies));
    assert_eq!(model.tags().vertex_tags().get(vs[2], fate), Some(dies));
    assert_eq!(model.tags().vertex_tags().get(vs[0], fate), None);

    model.tags().edge_tags().remove(es[2], fate);
    assert_eq!(tags.edge_tags().get(be, fate), None);
    assert!(matches!(
        tags.vertex_tags().tagged_with(dies),
        Err(LineageError::Unsupported(_))
    ));
    Ok(())
}

#[derive(Default)]
struct Seen(parking_lot::Mutex<Vec<String>>);

impl NavigationListener<BranchVertexId, BranchEdgeId> for Seen {
    fn navigate_to_vertex(&self, vertex: BranchVertexId) {
        self.0.lock().push(format!("{vertex:?}"));
    }

    fn navigate_to_edge(&self, edge: BranchEdgeId) {
        self.0.lock().push(format!("{edge:?}"));
    }
}

#[test]
fn branch_views_translate_focus_highlight_and_navigation() -> Result<()> {
    let model = Model::default();
    let (vs, es) = chain(&model, 3)?;
    let be = branch_edge(&model, es[0])?;
    let leaf = model
        .read()
        .branch()
        .branch_vertex(vs[2])
        .ok_or(LineageError::NotFound("leaf"))?;

    model.branch_focus().focus_vertex(Some(leaf));
    assert_eq!(model.focus().focused_vertex(), Some(vs[2]));

    model.highlight().highlight_vertex(Some(vs[1]));
    assert_eq!(model.branch_highlight().highlighted_edge(), Some(be));

    let navigation = model.branch_navigation();
    let seen = Arc::new(Seen::default());
    navigation.listeners().add(seen.clone());
    model.navigation().notify_navigate_to_vertex(vs[1]);
    model.navigation().notify_navigate_to_vertex(vs[2]);
    assert_eq!(*seen.0.lock(), vec![format!("{be:?}"), format!("{leaf:?}")]);
    Ok(())
}

#[test]
fn bimaps_compose_through_the_branch_graph() -> Result<()> {
    let model = Model::default();
    let (vs, _) = chain(&model, 3)?;
    let composed: ComposedBimap<IdentityBimap<VertexId>, _, VertexId> =
        ComposedBimap::new(IdentityBimap::new(), model.branch_vertex_bimap());
    let root = composed
        .get_right(vs[0])
        .ok_or(LineageError::NotFound("root"))?;
    assert_eq!(composed.get_left(root), Some(vs[0]));
    assert_eq!(composed.get_right(vs[1]), None);
    Ok(())
}
