use serde::{Deserialize, Serialize};

use crate::types::Result;

/// How the branch graph follows mutations of the core graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchRepair {
    /// Dissolve and rebuild only the chains a mutation touched.
    #[default]
    Incremental,
    /// Recompute the whole condensation after every mutation.
    Rebuild,
}

/// Configuration options supplied when creating a [`super::Model`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    /// Vertices to preallocate room for.
    pub vertex_capacity: usize,
    /// Edges to preallocate room for.
    pub edge_capacity: usize,
    /// Branch graph maintenance strategy.
    pub branch_repair: BranchRepair,
    /// Whether to check the branch graph against the core graph after every
    /// mutation. Failures are returned as [`crate::LineageError::Corruption`].
    pub verify_branch_graph: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            vertex_capacity: 1024,
            edge_capacity: 1024,
            branch_repair: BranchRepair::Incremental,
            verify_branch_graph: false,
        }
    }
}

impl ModelOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from a TOML document; missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Sets the number of vertices to preallocate room for.
    pub fn vertex_capacity(mut self, vertices: usize) -> Self {
        self.vertex_capacity = vertices;
        self
    }

    /// Sets the number of edges to preallocate room for.
    pub fn edge_capacity(mut self, edges: usize) -> Self {
        self.edge_capacity = edges;
        self
    }

    /// Selects the branch graph maintenance strategy.
    pub fn branch_repair(mut self, repair: BranchRepair) -> Self {
        self.branch_repair = repair;
        self
    }

    /// Enables or disables branch graph verification after each mutation.
    pub fn verify_branch_graph(mut self, enabled: bool) -> Self {
        self.verify_branch_graph = enabled;
        self
    }
}
