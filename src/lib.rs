//! Lineage graph model core.
//!
//! A mutable directed graph of pooled vertex and edge handles, a feature
//! store with per-step undo snapshots, an incrementally maintained branch
//! graph that condenses linear chains, and selection, highlight, focus,
//! navigation and tag models that can be viewed through either
//! representation.

#![warn(missing_docs)]

pub mod bimap;
pub mod branch;
pub mod logging;
pub mod model;
pub mod primitives;
pub mod storage;
pub mod types;

pub use branch::{BranchGraph, BranchGraphListener, BranchItem, BranchSource, BranchStats, VertexLink};
pub use model::{BranchRepair, Model, ModelGraph, ModelOptions, ModelWriteGuard};
pub use storage::features::{FeatureModel, FeatureSpec, FeatureTarget};
pub use storage::{Graph, GraphListener, ReadOnlyGraph};
pub use types::{BranchEdgeId, BranchVertexId, EdgeId, GraphObject, LineageError, Result, VertexId};
