//! Shared identifiers, error type and handle bounds.

mod error;

use std::fmt::Debug;
use std::hash::Hash;

pub use error::{LineageError, Result};

pub use crate::primitives::pool::{BranchEdgeId, BranchVertexId, EdgeId, VertexId};

/// Bounds shared by every handle type that models and adapters accept.
///
/// Handles are small `Copy` values compared by identity; the blanket
/// implementation covers the pooled ids as well as any wrapper type a view
/// chooses to expose through a bimap.
pub trait GraphObject: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> GraphObject for T where T: Copy + Eq + Hash + Debug + Send + Sync + 'static {}
