//! Tag sets and per-object tag assignments.
//!
//! A [`TagSetStructure`] declares named tag sets, each holding tags. An
//! object carries at most one tag from each set. Replacing the structure
//! strips every assignment of a tag that no longer exists.

use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::branch::{BranchItem, BranchSource};
use crate::primitives::listeners::{ForwardedListeners, ListenerRegistry, Listeners, NotifyGate};
use crate::storage::{Graph, GraphListener};
use crate::types::{BranchEdgeId, BranchVertexId, EdgeId, GraphObject, LineageError, Result, VertexId};

/// Identifier of a tag or a tag set.
///
/// Tags and tag sets draw from the same counter, so an id never denotes both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub u32);

/// One tag of a tag set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    id: TagId,
    label: String,
    color: u32,
}

impl Tag {
    /// Identifier.
    pub fn id(&self) -> TagId {
        self.id
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Display colour as `0xAARRGGBB`.
    pub fn color(&self) -> u32 {
        self.color
    }

    /// Changes the label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Changes the colour.
    pub fn set_color(&mut self, color: u32) {
        self.color = color;
    }
}

/// Named group of mutually exclusive tags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    id: TagId,
    name: String,
    tags: Vec<Tag>,
}

impl TagSet {
    /// Identifier.
    pub fn id(&self) -> TagId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the set.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Tags in creation order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Tag with id `tag`, if it belongs to this set.
    pub fn tag(&self, tag: TagId) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == tag)
    }

    /// Mutable access to a tag of this set.
    pub fn tag_mut(&mut self, tag: TagId) -> Option<&mut Tag> {
        self.tags.iter_mut().find(|t| t.id == tag)
    }
}

/// Declared tag sets.
///
/// Deserializing never hands out an id already in use, even when the stored
/// counter is missing or behind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredStructure")]
pub struct TagSetStructure {
    tag_sets: Vec<TagSet>,
    next_id: u32,
}

#[derive(Deserialize)]
struct StoredStructure {
    tag_sets: Vec<TagSet>,
    #[serde(default)]
    next_id: u32,
}

impl From<StoredStructure> for TagSetStructure {
    fn from(stored: StoredStructure) -> Self {
        let used = stored
            .tag_sets
            .iter()
            .flat_map(|set| std::iter::once(set.id).chain(set.tags.iter().map(|t| t.id)))
            .map(|id| id.0 + 1)
            .max()
            .unwrap_or(0);
        Self {
            tag_sets: stored.tag_sets,
            next_id: stored.next_id.max(used),
        }
    }
}

impl TagSetStructure {
    /// Creates a structure without tag sets.
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> TagId {
        let id = TagId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends an empty tag set named `name`.
    pub fn create_tag_set(&mut self, name: impl Into<String>) -> TagId {
        let id = self.fresh_id();
        self.tag_sets.push(TagSet {
            id,
            name: name.into(),
            tags: Vec::new(),
        });
        id
    }

    /// Appends a tag to the tag set `set`.
    pub fn create_tag(&mut self, set: TagId, label: impl Into<String>, color: u32) -> Result<TagId> {
        if self.tag_set(set).is_none() {
            return Err(LineageError::NotFound("tag set"));
        }
        let id = self.fresh_id();
        if let Some(tag_set) = self.tag_set_mut(set) {
            tag_set.tags.push(Tag {
                id,
                label: label.into(),
                color,
            });
        }
        Ok(id)
    }

    /// Tag sets in creation order.
    pub fn tag_sets(&self) -> &[TagSet] {
        &self.tag_sets
    }

    /// Tag set with id `set`.
    pub fn tag_set(&self, set: TagId) -> Option<&TagSet> {
        self.tag_sets.iter().find(|s| s.id == set)
    }

    /// Mutable access to the tag set with id `set`.
    pub fn tag_set_mut(&mut self, set: TagId) -> Option<&mut TagSet> {
        self.tag_sets.iter_mut().find(|s| s.id == set)
    }

    /// Removes a whole tag set.
    pub fn remove_tag_set(&mut self, set: TagId) -> Option<TagSet> {
        let pos = self.tag_sets.iter().position(|s| s.id == set)?;
        Some(self.tag_sets.remove(pos))
    }

    /// Removes a tag from whichever set holds it.
    pub fn remove_tag(&mut self, tag: TagId) -> Option<Tag> {
        self.tag_sets.iter_mut().find_map(|s| {
            let pos = s.tags.iter().position(|t| t.id == tag)?;
            Some(s.tags.remove(pos))
        })
    }

    /// Set containing `tag`.
    pub fn set_of(&self, tag: TagId) -> Option<TagId> {
        self.tag_sets
            .iter()
            .find(|s| s.tag(tag).is_some())
            .map(|s| s.id)
    }

    /// Ids of every tag in every set.
    pub fn tag_ids(&self) -> FxHashSet<TagId> {
        self.tag_sets
            .iter()
            .flat_map(|s| s.tags.iter().map(|t| t.id))
            .collect()
    }
}

/// Observer of tag set structure changes.
pub trait TagSetListener: Send + Sync {
    /// The tag set structure was replaced.
    fn tag_set_structure_changed(&self);
}

/// Tag assignments for one kind of object.
pub trait ObjTags<O>: Send + Sync {
    /// Tag `obj` carries from tag set `set`.
    fn get(&self, obj: O, set: TagId) -> Option<TagId>;

    /// Tags `obj` with `tag`, replacing its previous tag from the same set.
    fn set(&self, obj: O, tag: TagId) -> Result<()>;

    /// Removes whatever tag from `set` `obj` carries.
    fn remove(&self, obj: O, set: TagId) -> bool;

    /// Objects carrying `tag`, in no particular order.
    fn tagged_with(&self, tag: TagId) -> Result<Vec<O>>;
}

/// Tag set structure plus vertex and edge tags.
pub trait TagSetModel<V, E>: Send + Sync {
    /// Copy of the current structure.
    fn tag_set_structure(&self) -> TagSetStructure;

    /// Replaces the structure, stripping assignments of removed tags.
    fn set_tag_set_structure(&self, structure: TagSetStructure);

    /// Vertex tag assignments.
    fn vertex_tags(&self) -> &dyn ObjTags<V>;

    /// Edge tag assignments.
    fn edge_tags(&self) -> &dyn ObjTags<E>;

    /// Registry of structure listeners.
    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn TagSetListener>>;
}

struct Assignments<O> {
    /// Object -> (set -> tag).
    by_object: FxHashMap<O, FxHashMap<TagId, TagId>>,
    /// Tag -> objects.
    by_tag: FxHashMap<TagId, FxHashSet<O>>,
}

impl<O> Default for Assignments<O> {
    fn default() -> Self {
        Self {
            by_object: FxHashMap::default(),
            by_tag: FxHashMap::default(),
        }
    }
}

impl<O: GraphObject> Assignments<O> {
    fn unlink(&mut self, obj: O, tag: TagId) {
        if let Some(objs) = self.by_tag.get_mut(&tag) {
            objs.remove(&obj);
            if objs.is_empty() {
                self.by_tag.remove(&tag);
            }
        }
    }

    fn forget(&mut self, obj: O) {
        if let Some(tags) = self.by_object.remove(&obj) {
            for tag in tags.into_values() {
                self.unlink(obj, tag);
            }
        }
    }

    fn strip(&mut self, tag: TagId) {
        let Some(objs) = self.by_tag.remove(&tag) else {
            return;
        };
        for obj in objs {
            if let Some(tags) = self.by_object.get_mut(&obj) {
                tags.retain(|_, t| *t != tag);
                if tags.is_empty() {
                    self.by_object.remove(&obj);
                }
            }
        }
    }
}

/// Tag assignments of core objects, checked against a shared structure.
pub struct DefaultObjTags<O> {
    structure: Arc<RwLock<TagSetStructure>>,
    assignments: RwLock<Assignments<O>>,
}

impl<O: GraphObject> DefaultObjTags<O> {
    fn new(structure: Arc<RwLock<TagSetStructure>>) -> Self {
        Self {
            structure,
            assignments: RwLock::new(Assignments::default()),
        }
    }

    /// Number of tagged objects.
    pub fn len(&self) -> usize {
        self.assignments.read().by_object.len()
    }

    /// Whether no object is tagged.
    pub fn is_empty(&self) -> bool {
        self.assignments.read().by_object.is_empty()
    }

    fn forget(&self, obj: O) {
        self.assignments.write().forget(obj);
    }

    fn retain(&self, keep: impl Fn(O) -> bool) {
        let mut assignments = self.assignments.write();
        let stale: Vec<O> = assignments
            .by_object
            .keys()
            .copied()
            .filter(|o| !keep(*o))
            .collect();
        for obj in stale {
            assignments.forget(obj);
        }
    }

    fn strip(&self, tags: &FxHashSet<TagId>) {
        let mut assignments = self.assignments.write();
        for tag in tags {
            assignments.strip(*tag);
        }
    }

    fn clear(&self) {
        *self.assignments.write() = Assignments::default();
    }
}

impl<O: GraphObject> ObjTags<O> for DefaultObjTags<O> {
    fn get(&self, obj: O, set: TagId) -> Option<TagId> {
        self.assignments.read().by_object.get(&obj)?.get(&set).copied()
    }

    fn set(&self, obj: O, tag: TagId) -> Result<()> {
        let set = self
            .structure
            .read()
            .set_of(tag)
            .ok_or(LineageError::NotFound("tag"))?;
        let mut assignments = self.assignments.write();
        let previous = assignments.by_object.entry(obj).or_default().insert(set, tag);
        if let Some(previous) = previous.filter(|p| *p != tag) {
            assignments.unlink(obj, previous);
        }
        assignments.by_tag.entry(tag).or_default().insert(obj);
        Ok(())
    }

    fn remove(&self, obj: O, set: TagId) -> bool {
        let mut assignments = self.assignments.write();
        let Some(tags) = assignments.by_object.get_mut(&obj) else {
            return false;
        };
        let Some(tag) = tags.remove(&set) else {
            return false;
        };
        if tags.is_empty() {
            assignments.by_object.remove(&obj);
        }
        assignments.unlink(obj, tag);
        true
    }

    fn tagged_with(&self, tag: TagId) -> Result<Vec<O>> {
        Ok(self
            .assignments
            .read()
            .by_tag
            .get(&tag)
            .map(|objs| objs.iter().copied().collect())
            .unwrap_or_default())
    }
}

/// Tag model over core vertices and edges.
///
/// Registered as a graph listener, it forgets the tags of removed objects.
pub struct DefaultTagSetModel {
    structure: Arc<RwLock<TagSetStructure>>,
    vertex_tags: DefaultObjTags<VertexId>,
    edge_tags: DefaultObjTags<EdgeId>,
    listeners: Arc<Listeners<dyn TagSetListener>>,
    gate: NotifyGate,
}

impl Default for DefaultTagSetModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultTagSetModel {
    /// Creates a model with an empty structure.
    pub fn new() -> Self {
        let structure = Arc::new(RwLock::new(TagSetStructure::new()));
        Self {
            vertex_tags: DefaultObjTags::new(structure.clone()),
            edge_tags: DefaultObjTags::new(structure.clone()),
            structure,
            listeners: Arc::new(Listeners::new()),
            gate: NotifyGate::new(),
        }
    }

    /// Concrete vertex tag assignments.
    pub fn vertex_assignments(&self) -> &DefaultObjTags<VertexId> {
        &self.vertex_tags
    }

    /// Concrete edge tag assignments.
    pub fn edge_assignments(&self) -> &DefaultObjTags<EdgeId> {
        &self.edge_tags
    }

    /// Holds back structure notifications. Pauses nest.
    pub fn pause_listeners(&self) {
        self.gate.hold();
    }

    /// Releases one pause; the outermost resume notifies once if the
    /// structure changed in between.
    pub fn resume_listeners(&self) {
        if self.gate.release() {
            self.listeners.for_each(|l| l.tag_set_structure_changed());
        }
    }

    /// Removes every tag assignment, keeping the structure.
    pub fn clear(&self) {
        self.vertex_tags.clear();
        self.edge_tags.clear();
    }
}

impl TagSetModel<VertexId, EdgeId> for DefaultTagSetModel {
    fn tag_set_structure(&self) -> TagSetStructure {
        self.structure.read().clone()
    }

    fn set_tag_set_structure(&self, structure: TagSetStructure) {
        let mut removed = self.structure.read().tag_ids();
        let kept = structure.tag_ids();
        removed.retain(|t| !kept.contains(t));

        self.vertex_tags.strip(&removed);
        self.edge_tags.strip(&removed);
        let tag_sets = structure.tag_sets().len();
        *self.structure.write() = structure;
        info!(tag_sets, removed_tags = removed.len(), "tag.structure.changed");

        if self.gate.changed() {
            self.listeners.for_each(|l| l.tag_set_structure_changed());
        }
    }

    fn vertex_tags(&self) -> &dyn ObjTags<VertexId> {
        &self.vertex_tags
    }

    fn edge_tags(&self) -> &dyn ObjTags<EdgeId> {
        &self.edge_tags
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn TagSetListener>> {
        self.listeners.clone()
    }
}

impl GraphListener for DefaultTagSetModel {
    fn vertex_removed(&self, _graph: &Graph, vertex: VertexId) {
        self.vertex_tags.forget(vertex);
    }

    fn edge_removed(&self, _graph: &Graph, edge: EdgeId, _source: VertexId, _target: VertexId) {
        self.edge_tags.forget(edge);
    }

    fn graph_rebuilt(&self, graph: &Graph) {
        self.vertex_tags.retain(|v| graph.is_valid_vertex(v));
        self.edge_tags.retain(|e| graph.is_valid_edge(e));
    }
}

/// The single tag every object in `objs` carries from `set`, if they agree.
fn common_tag<O: Copy + Eq + Hash>(
    tags: &dyn ObjTags<O>,
    objs: impl IntoIterator<Item = O>,
    set: TagId,
) -> Option<TagId> {
    let mut common = None;
    for obj in objs {
        let tag = tags.get(obj, set)?;
        match common {
            None => common = Some(tag),
            Some(c) if c != tag => return None,
            Some(_) => {}
        }
    }
    common
}

/// Branch vertex tags: those of the linked vertex.
struct BranchVertexTags<V, E, S, M: ?Sized> {
    source: Arc<S>,
    model: Arc<M>,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E, S, M> ObjTags<BranchVertexId> for BranchVertexTags<V, E, S, M>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
    M: TagSetModel<V, E> + ?Sized,
{
    fn get(&self, bv: BranchVertexId, set: TagId) -> Option<TagId> {
        let vertex = self.source.with_branch(|b| b.linked_vertex(bv))?;
        self.model.vertex_tags().get(vertex, set)
    }

    fn set(&self, bv: BranchVertexId, tag: TagId) -> Result<()> {
        let vertex = self
            .source
            .with_branch(|b| b.linked_vertex(bv))
            .ok_or(LineageError::StaleHandle("tag on stale branch vertex"))?;
        self.model.vertex_tags().set(vertex, tag)
    }

    fn remove(&self, bv: BranchVertexId, set: TagId) -> bool {
        self.source
            .with_branch(|b| b.linked_vertex(bv))
            .is_some_and(|v| self.model.vertex_tags().remove(v, set))
    }

    fn tagged_with(&self, _tag: TagId) -> Result<Vec<BranchVertexId>> {
        Err(LineageError::Unsupported("tagged_with on branch vertices"))
    }
}

/// Branch edge tags: a tag only when the whole chain agrees on it.
struct BranchEdgeTags<V, E, S, M: ?Sized> {
    source: Arc<S>,
    model: Arc<M>,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E, S, M: ?Sized> BranchEdgeTags<V, E, S, M>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
{
    fn chain(&self, be: BranchEdgeId) -> (Vec<V>, Vec<E>) {
        let item = BranchItem::Edge(be);
        self.source.with_branch(|b| {
            (
                b.vertex_branch_iter(item).copied().collect(),
                b.edge_branch_iter(item).copied().collect(),
            )
        })
    }
}

impl<V, E, S, M> ObjTags<BranchEdgeId> for BranchEdgeTags<V, E, S, M>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
    M: TagSetModel<V, E> + ?Sized,
{
    fn get(&self, be: BranchEdgeId, set: TagId) -> Option<TagId> {
        let (vertices, edges) = self.chain(be);
        let on_edges = common_tag(self.model.edge_tags(), edges, set)?;
        if vertices.is_empty() {
            return Some(on_edges);
        }
        let on_vertices = common_tag(self.model.vertex_tags(), vertices, set)?;
        (on_edges == on_vertices).then_some(on_edges)
    }

    fn set(&self, be: BranchEdgeId, tag: TagId) -> Result<()> {
        let (vertices, edges) = self.chain(be);
        if edges.is_empty() {
            return Err(LineageError::StaleHandle("tag on stale branch edge"));
        }
        for edge in edges {
            self.model.edge_tags().set(edge, tag)?;
        }
        for vertex in vertices {
            self.model.vertex_tags().set(vertex, tag)?;
        }
        Ok(())
    }

    fn remove(&self, be: BranchEdgeId, set: TagId) -> bool {
        let (vertices, edges) = self.chain(be);
        let mut changed = false;
        for edge in edges {
            changed |= self.model.edge_tags().remove(edge, set);
        }
        for vertex in vertices {
            changed |= self.model.vertex_tags().remove(vertex, set);
        }
        changed
    }

    fn tagged_with(&self, _tag: TagId) -> Result<Vec<BranchEdgeId>> {
        Err(LineageError::Unsupported("tagged_with on branch edges"))
    }
}

/// Tags of core objects seen on the branch graph.
///
/// A branch vertex carries the tags of its vertex. A branch edge carries a
/// tag only if every edge and interior vertex of its chain carries that very
/// tag; writing a tag writes it to all of them.
pub struct BranchGraphTagSetAdapter<V, E, S, M: ?Sized> {
    model: Arc<M>,
    vertex_tags: BranchVertexTags<V, E, S, M>,
    edge_tags: BranchEdgeTags<V, E, S, M>,
    listeners: Arc<ForwardedListeners<dyn TagSetListener>>,
}

impl<V, E, S, M> BranchGraphTagSetAdapter<V, E, S, M>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
    M: TagSetModel<V, E> + ?Sized,
{
    /// Wraps `model`, reading the condensation from `source`.
    pub fn new(source: Arc<S>, model: Arc<M>) -> Self {
        Self {
            vertex_tags: BranchVertexTags {
                source: source.clone(),
                model: model.clone(),
                _marker: PhantomData,
            },
            edge_tags: BranchEdgeTags {
                source,
                model: model.clone(),
                _marker: PhantomData,
            },
            listeners: Arc::new(ForwardedListeners::new(model.listeners())),
            model,
        }
    }

    /// Deregisters every listener added through this adapter.
    pub fn remove_all_listeners(&self) {
        self.listeners.remove_all();
    }
}

impl<V, E, S, M> TagSetModel<BranchVertexId, BranchEdgeId> for BranchGraphTagSetAdapter<V, E, S, M>
where
    V: GraphObject,
    E: GraphObject,
    S: BranchSource<V, E>,
    M: TagSetModel<V, E> + ?Sized,
{
    fn tag_set_structure(&self) -> TagSetStructure {
        self.model.tag_set_structure()
    }

    fn set_tag_set_structure(&self, structure: TagSetStructure) {
        self.model.set_tag_set_structure(structure);
    }

    fn vertex_tags(&self) -> &dyn ObjTags<BranchVertexId> {
        &self.vertex_tags
    }

    fn edge_tags(&self) -> &dyn ObjTags<BranchEdgeId> {
        &self.edge_tags
    }

    fn listeners(&self) -> Arc<dyn ListenerRegistry<dyn TagSetListener>> {
        self.listeners.clone()
    }
}
