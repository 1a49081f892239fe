//! Low-level primitives shared by the graph, feature and model layers.
//!
//! Includes the generation-checked slot pools that give every graph object a
//! stable identity, and the listener registries used for change notification.

/// Listener registries.
///
/// Identity-based registration, forwarding facades and type-translating
/// registries.
pub mod listeners;

/// Slot pools and reusable object references.
///
/// Every vertex and edge (core or branch) lives in a [`pool::Pool`].
pub mod pool;
