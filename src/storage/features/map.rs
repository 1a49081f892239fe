use std::fmt::Debug;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::primitives::listeners::Listeners;
use crate::storage::graph::{CoreObject, Graph, GraphListener};
use crate::types::{EdgeId, VertexId};

use super::undo::{FeatureUndo, UndoStepId};
use super::FeatureKind;

/// Observer of feature value changes.
pub trait FeatureChangeListener<K>: Send + Sync {
    /// Called before the value of `obj` is set or removed.
    fn before_feature_change(&self, obj: K);
}

/// Map from core objects to arbitrary values. Absent means unset.
pub struct ObjFeatureMap<K, T> {
    key: String,
    values: RwLock<FxHashMap<K, T>>,
    undo: Mutex<FxHashMap<UndoStepId, T>>,
    listeners: Listeners<dyn FeatureChangeListener<K>>,
}

impl<K: CoreObject, T: Clone + Send + Sync + 'static> ObjFeatureMap<K, T> {
    /// Creates an empty map for the feature `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: RwLock::new(FxHashMap::default()),
            undo: Mutex::new(FxHashMap::default()),
            listeners: Listeners::new(),
        }
    }

    /// Key of the feature this map materializes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value of `obj`, if set.
    pub fn get(&self, obj: K) -> Option<T> {
        self.values.read().get(&obj).cloned()
    }

    /// Sets the value of `obj`, returning the previous one.
    pub fn set(&self, obj: K, value: T) -> Option<T> {
        self.before_change(obj);
        self.values.write().insert(obj, value)
    }

    /// Unsets `obj`, returning the removed value.
    pub fn remove(&self, obj: K) -> Option<T> {
        self.before_change(obj);
        self.values.write().remove(&obj)
    }

    /// Whether `obj` has a value.
    pub fn is_set(&self, obj: K) -> bool {
        self.values.read().contains_key(&obj)
    }

    /// Number of objects with a value.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether no object has a value.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Objects with a value, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.values.read().keys().copied().collect()
    }

    /// Change listeners of this map.
    pub fn listeners(&self) -> &Listeners<dyn FeatureChangeListener<K>> {
        &self.listeners
    }

    /// Number of undo snapshots currently held.
    pub fn undo_len(&self) -> usize {
        self.undo.lock().len()
    }

    fn before_change(&self, obj: K) {
        self.listeners.for_each(|l| l.before_feature_change(obj));
    }

    fn drop_object(&self, obj: K) {
        if self.values.write().remove(&obj).is_some() {
            trace!(feature = %self.key, obj = ?obj, "feature.map.cleanup");
        }
    }
}

impl<K: CoreObject, T: Clone + Send + Sync + 'static> FeatureUndo<K> for ObjFeatureMap<K, T> {
    fn store(&self, step: UndoStepId, obj: K) {
        let values = self.values.read();
        if let Some(value) = values.get(&obj) {
            self.undo.lock().insert(step, value.clone());
        }
    }

    fn retrieve(&self, step: UndoStepId, obj: K) {
        let mut values = self.values.write();
        match self.undo.lock().remove(&step) {
            Some(value) => values.insert(obj, value),
            None => values.remove(&obj),
        };
    }

    fn swap(&self, step: UndoStepId, obj: K) {
        let mut values = self.values.write();
        let mut undo = self.undo.lock();
        let current = values.remove(&obj);
        if let Some(previous) = undo.remove(&step) {
            values.insert(obj, previous);
        }
        if let Some(current) = current {
            undo.insert(step, current);
        }
    }

    fn clear(&self, step: UndoStepId) {
        self.undo.lock().remove(&step);
    }
}

impl<K: CoreObject, T: Clone + Send + Sync + 'static> GraphListener for ObjFeatureMap<K, T> {
    fn vertex_removed(&self, _graph: &Graph, vertex: VertexId) {
        if let Some(obj) = K::from_removed_vertex(vertex) {
            self.drop_object(obj);
        }
    }

    fn edge_removed(&self, _graph: &Graph, edge: EdgeId, _source: VertexId, _target: VertexId) {
        if let Some(obj) = K::from_removed_edge(edge) {
            self.drop_object(obj);
        }
    }

    fn graph_rebuilt(&self, graph: &Graph) {
        self.values.write().retain(|obj, _| obj.is_live(graph));
    }
}

/// Value type of a primitive feature map.
pub trait Primitive: Copy + PartialEq + Debug + Send + Sync + 'static {
    /// Sentinel configured by `kind`, if `kind` describes this primitive.
    fn no_entry_of(kind: &FeatureKind) -> Option<Self>;
}

impl Primitive for i32 {
    fn no_entry_of(kind: &FeatureKind) -> Option<Self> {
        match kind {
            FeatureKind::Int { no_entry } => Some(*no_entry),
            _ => None,
        }
    }
}

impl Primitive for f64 {
    fn no_entry_of(kind: &FeatureKind) -> Option<Self> {
        match kind {
            FeatureKind::Double { no_entry } => Some(*no_entry),
            _ => None,
        }
    }
}

/// Map from core objects to primitive values with a no-entry sentinel.
///
/// Presence is tracked by membership, so storing a value equal to the
/// sentinel still counts as set.
pub struct PrimitiveFeatureMap<K, P> {
    inner: ObjFeatureMap<K, P>,
    no_entry: P,
}

/// Integer-valued feature map.
pub type IntFeatureMap<K> = PrimitiveFeatureMap<K, i32>;

/// Double-valued feature map.
pub type DoubleFeatureMap<K> = PrimitiveFeatureMap<K, f64>;

impl<K: CoreObject, P: Primitive> PrimitiveFeatureMap<K, P> {
    /// Creates an empty map whose unset objects read as `no_entry`.
    pub fn new(key: impl Into<String>, no_entry: P) -> Self {
        Self {
            inner: ObjFeatureMap::new(key),
            no_entry,
        }
    }

    /// Key of the feature this map materializes.
    pub fn key(&self) -> &str {
        self.inner.key()
    }

    /// Sentinel returned for unset objects.
    pub fn no_entry(&self) -> P {
        self.no_entry
    }

    /// Value of `obj`, if set.
    pub fn get(&self, obj: K) -> Option<P> {
        self.inner.get(obj)
    }

    /// Value of `obj`, or the sentinel when unset.
    pub fn get_or_no_entry(&self, obj: K) -> P {
        self.inner.get(obj).unwrap_or(self.no_entry)
    }

    /// Sets the value of `obj`, returning the previous one.
    pub fn set(&self, obj: K, value: P) -> Option<P> {
        self.inner.set(obj, value)
    }

    /// Unsets `obj`, returning the removed value.
    pub fn remove(&self, obj: K) -> Option<P> {
        self.inner.remove(obj)
    }

    /// Whether `obj` has a value.
    pub fn is_set(&self, obj: K) -> bool {
        self.inner.is_set(obj)
    }

    /// Number of objects with a value.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no object has a value.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Objects with a value, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.keys()
    }

    /// Change listeners of this map.
    pub fn listeners(&self) -> &Listeners<dyn FeatureChangeListener<K>> {
        self.inner.listeners()
    }

    /// Number of undo snapshots currently held.
    pub fn undo_len(&self) -> usize {
        self.inner.undo_len()
    }
}

impl<K: CoreObject, P: Primitive> FeatureUndo<K> for PrimitiveFeatureMap<K, P> {
    fn store(&self, step: UndoStepId, obj: K) {
        self.inner.store(step, obj)
    }

    fn retrieve(&self, step: UndoStepId, obj: K) {
        self.inner.retrieve(step, obj)
    }

    fn swap(&self, step: UndoStepId, obj: K) {
        self.inner.swap(step, obj)
    }

    fn clear(&self, step: UndoStepId) {
        self.inner.clear(step)
    }
}

impl<K: CoreObject, P: Primitive> GraphListener for PrimitiveFeatureMap<K, P> {
    fn vertex_removed(&self, graph: &Graph, vertex: VertexId) {
        self.inner.vertex_removed(graph, vertex)
    }

    fn edge_removed(&self, graph: &Graph, edge: EdgeId, source: VertexId, target: VertexId) {
        self.inner.edge_removed(graph, edge, source, target)
    }

    fn graph_rebuilt(&self, graph: &Graph) {
        self.inner.graph_rebuilt(graph)
    }
}
