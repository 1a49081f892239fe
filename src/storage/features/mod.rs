//! Feature store.
//!
//! Features are declared up front by key and materialized lazily: the first
//! request for a feature's map creates it, registers it as a graph listener
//! so values of removed objects are dropped, and announces it to the
//! [`CreateFeatureMapListener`]s. Every map carries its own undo snapshots.

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::primitives::listeners::{ListenerRegistry, Listeners};
use crate::storage::graph::{CoreObject, GraphListener, ObjectKind};
use crate::types::{LineageError, Result};

mod map;
mod undo;

pub use map::{
    DoubleFeatureMap, FeatureChangeListener, IntFeatureMap, ObjFeatureMap, Primitive,
    PrimitiveFeatureMap,
};
pub use undo::{ErasedUndo, FeatureUndo, UndoKey, UndoStepId, UndoStepIds};

/// Object kind a feature is attached to.
pub type FeatureTarget = ObjectKind;

/// Value layout of a feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Arbitrary values; absent means unset.
    Object,
    /// `i32` values reading as `no_entry` when unset.
    Int {
        /// Sentinel for unset objects.
        no_entry: i32,
    },
    /// `f64` values reading as `no_entry` when unset.
    Double {
        /// Sentinel for unset objects.
        no_entry: f64,
    },
}

/// Declaration of one feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Unique key.
    pub key: String,
    /// Human-readable description.
    #[serde(default)]
    pub info: String,
    /// Objects the feature is attached to.
    pub target: FeatureTarget,
    /// Value layout.
    pub kind: FeatureKind,
}

impl FeatureSpec {
    /// Object-valued feature.
    pub fn object(key: impl Into<String>, target: FeatureTarget) -> Self {
        Self {
            key: key.into(),
            info: String::new(),
            target,
            kind: FeatureKind::Object,
        }
    }

    /// Integer feature with the given sentinel.
    pub fn int(key: impl Into<String>, target: FeatureTarget, no_entry: i32) -> Self {
        Self {
            kind: FeatureKind::Int { no_entry },
            ..Self::object(key, target)
        }
    }

    /// Double feature with the given sentinel.
    pub fn double(key: impl Into<String>, target: FeatureTarget, no_entry: f64) -> Self {
        Self {
            kind: FeatureKind::Double { no_entry },
            ..Self::object(key, target)
        }
    }

    /// Sets the description.
    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }
}

/// Observer of feature map materialization.
pub trait CreateFeatureMapListener: Send + Sync {
    /// A map for `key` was created. Fires once per materialization.
    fn feature_map_created(&self, key: &str, target: FeatureTarget);
}

/// Map types the feature model can materialize.
pub trait MaterializeFeature: GraphListener + FeatureUndo<Self::Key> + Any + Sized {
    /// Object handle type keying the map.
    type Key: UndoKey;

    /// Whether a map of this type can hold values of `kind`.
    fn accepts(kind: &FeatureKind) -> bool;

    /// Creates an empty map for `spec`.
    fn materialize(spec: &FeatureSpec) -> Result<Self>;
}

impl<K: UndoKey, T: Clone + Send + Sync + 'static> MaterializeFeature for ObjFeatureMap<K, T> {
    type Key = K;

    fn accepts(kind: &FeatureKind) -> bool {
        matches!(kind, FeatureKind::Object)
    }

    fn materialize(spec: &FeatureSpec) -> Result<Self> {
        Ok(ObjFeatureMap::new(spec.key.clone()))
    }
}

impl<K: UndoKey, P: Primitive> MaterializeFeature for PrimitiveFeatureMap<K, P> {
    type Key = K;

    fn accepts(kind: &FeatureKind) -> bool {
        P::no_entry_of(kind).is_some()
    }

    fn materialize(spec: &FeatureSpec) -> Result<Self> {
        let no_entry =
            P::no_entry_of(&spec.kind).ok_or(LineageError::Invalid("feature value kind mismatch"))?;
        Ok(PrimitiveFeatureMap::new(spec.key.clone(), no_entry))
    }
}

struct Materialized {
    map: Arc<dyn Any + Send + Sync>,
    listener: Arc<dyn GraphListener>,
    undo: ErasedUndo,
}

struct FeatureEntry {
    spec: FeatureSpec,
    materialized: Option<Materialized>,
}

#[derive(Default)]
struct Registry {
    order: Vec<String>,
    entries: FxHashMap<String, FeatureEntry>,
}

/// Registry of declared features and their lazily created maps.
pub struct FeatureModel {
    graph_listeners: Arc<dyn ListenerRegistry<dyn GraphListener>>,
    registry: RwLock<Registry>,
    create_listeners: Listeners<dyn CreateFeatureMapListener>,
}

impl FeatureModel {
    /// Creates an empty model whose maps register on `graph_listeners`.
    pub fn new(graph_listeners: Arc<dyn ListenerRegistry<dyn GraphListener>>) -> Self {
        Self {
            graph_listeners,
            registry: RwLock::new(Registry::default()),
            create_listeners: Listeners::new(),
        }
    }

    /// Declares a feature. A key can be declared only once.
    pub fn declare(&self, spec: FeatureSpec) -> Result<()> {
        let mut registry = self.registry.write();
        if registry.entries.contains_key(&spec.key) {
            warn!(key = %spec.key, "feature.declare.duplicate");
            return Err(LineageError::DuplicateFeature(spec.key));
        }
        debug!(key = %spec.key, target = ?spec.target, kind = ?spec.kind, "feature.declare");
        registry.order.push(spec.key.clone());
        registry.entries.insert(
            spec.key.clone(),
            FeatureEntry {
                spec,
                materialized: None,
            },
        );
        Ok(())
    }

    /// Declaration of `key`.
    pub fn spec(&self, key: &str) -> Option<FeatureSpec> {
        self.registry.read().entries.get(key).map(|e| e.spec.clone())
    }

    /// Declared keys in declaration order.
    pub fn keys(&self) -> Vec<String> {
        self.registry.read().order.clone()
    }

    /// Whether the map for `key` exists yet.
    pub fn is_materialized(&self, key: &str) -> bool {
        self.registry
            .read()
            .entries
            .get(key)
            .is_some_and(|e| e.materialized.is_some())
    }

    /// Listeners told about newly created maps.
    pub fn create_listeners(&self) -> &Listeners<dyn CreateFeatureMapListener> {
        &self.create_listeners
    }

    /// Map of feature `key`, created on first access.
    ///
    /// Fails with [`LineageError::UnknownFeature`] for an undeclared key and
    /// with [`LineageError::Invalid`] when `M` does not match the declared
    /// target or value kind.
    pub fn feature_map<M>(&self, key: &str) -> Result<Arc<M>>
    where
        M: MaterializeFeature + Send + Sync,
    {
        {
            let registry = self.registry.read();
            let entry = registry
                .entries
                .get(key)
                .ok_or_else(|| LineageError::UnknownFeature(key.to_string()))?;
            if let Some(materialized) = &entry.materialized {
                return downcast::<M>(materialized);
            }
            check_layout::<M>(&entry.spec)?;
        }

        let (map, target) = {
            let mut registry = self.registry.write();
            let entry = registry
                .entries
                .get_mut(key)
                .ok_or_else(|| LineageError::UnknownFeature(key.to_string()))?;
            if let Some(materialized) = &entry.materialized {
                return downcast::<M>(materialized);
            }
            let map = Arc::new(M::materialize(&entry.spec)?);
            let listener: Arc<dyn GraphListener> = map.clone();
            let undo: Arc<dyn FeatureUndo<M::Key>> = map.clone();
            self.graph_listeners.add(listener.clone());
            entry.materialized = Some(Materialized {
                map: map.clone(),
                listener,
                undo: M::Key::erase(undo),
            });
            (map, entry.spec.target)
        };

        debug!(key, target = ?target, "feature.map.created");
        self.create_listeners
            .for_each(|l| l.feature_map_created(key, target));
        Ok(map)
    }

    /// Forgets feature `key` and drops its map.
    pub fn remove(&self, key: &str) -> Result<FeatureSpec> {
        let entry = {
            let mut registry = self.registry.write();
            let entry = registry
                .entries
                .remove(key)
                .ok_or_else(|| LineageError::UnknownFeature(key.to_string()))?;
            registry.order.retain(|k| k != key);
            entry
        };
        if let Some(materialized) = entry.materialized {
            self.graph_listeners.remove(&materialized.listener);
        }
        debug!(key, "feature.remove");
        Ok(entry.spec)
    }

    /// Undo handles of every materialized map keyed by `K`.
    pub fn undo_maps<K: UndoKey>(&self) -> Vec<Arc<dyn FeatureUndo<K>>> {
        let registry = self.registry.read();
        registry
            .order
            .iter()
            .filter_map(|key| registry.entries.get(key)?.materialized.as_ref())
            .filter_map(|m| K::recover(&m.undo))
            .collect()
    }

    /// Snapshots every feature value of `obj` under `step`.
    pub fn store_all<K: UndoKey>(&self, step: UndoStepId, obj: K) {
        for undo in self.undo_maps::<K>() {
            undo.store(step, obj);
        }
    }

    /// Restores every feature value of `obj` from `step`.
    pub fn retrieve_all<K: UndoKey>(&self, step: UndoStepId, obj: K) {
        for undo in self.undo_maps::<K>() {
            undo.retrieve(step, obj);
        }
    }

    /// Swaps every feature value of `obj` with its snapshot under `step`.
    pub fn swap_all<K: UndoKey>(&self, step: UndoStepId, obj: K) {
        for undo in self.undo_maps::<K>() {
            undo.swap(step, obj);
        }
    }

    /// Drops the snapshots under `step` in every map.
    pub fn clear_all(&self, step: UndoStepId) {
        let undos: Vec<ErasedUndo> = {
            let registry = self.registry.read();
            registry
                .entries
                .values()
                .filter_map(|e| e.materialized.as_ref().map(|m| m.undo.clone()))
                .collect()
        };
        for undo in undos {
            undo.clear(step);
        }
    }
}

fn check_layout<M: MaterializeFeature>(spec: &FeatureSpec) -> Result<()> {
    if spec.target != <M::Key as CoreObject>::KIND {
        return Err(LineageError::Invalid("feature target mismatch"));
    }
    if !M::accepts(&spec.kind) {
        return Err(LineageError::Invalid("feature value kind mismatch"));
    }
    Ok(())
}

fn downcast<M: MaterializeFeature + Send + Sync>(materialized: &Materialized) -> Result<Arc<M>> {
    Arc::clone(&materialized.map)
        .downcast::<M>()
        .map_err(|_| LineageError::Invalid("feature map type mismatch"))
}
