//! Core graph storage and the feature store layered on top of it.
//!
//! The graph owns object identities; feature maps attach values to those
//! identities and follow their lifetime through graph listeners.

/// Per-object feature maps with undo snapshots.
///
/// Maps are declared by key, created lazily and cleaned up when the objects
/// they describe are removed from the graph.
pub mod features;

mod graph;

/// Core graph.
pub use graph::{CoreObject, Graph, GraphListener, ObjectKind, ReadOnlyGraph};
