use tracing::trace;

use crate::types::{LineageError, Result, VertexId};

use super::{Graph, VertexRecord};

impl Graph {
    /// Adds an isolated vertex.
    pub fn add_vertex(&mut self) -> VertexId {
        let vertex = self.vertices.insert(VertexRecord::default());
        trace!(vertex = %vertex, "graph.vertex.add");
        self.notify(|l, g| l.vertex_added(g, vertex));
        vertex
    }

    /// Removes `vertex` together with its incident edges.
    ///
    /// Each incident edge is removed (and reported) on its own before the
    /// vertex itself goes away.
    pub fn remove_vertex(&mut self, vertex: VertexId) -> Result<()> {
        self.ensure_vertex(vertex, "remove_vertex on stale vertex")?;
        while let Some(edge) = self.first_incident_edge(vertex) {
            self.remove_edge(edge)?;
        }
        self.vertices.remove(vertex);
        trace!(vertex = %vertex, "graph.vertex.remove");
        self.notify(|l, g| l.vertex_removed(g, vertex));
        Ok(())
    }

    pub(crate) fn ensure_vertex(&self, vertex: VertexId, what: &'static str) -> Result<()> {
        if self.vertices.is_valid(vertex) {
            Ok(())
        } else {
            Err(LineageError::StaleHandle(what))
        }
    }

    /// Outgoing edges first, then incoming, so a self-loop is found once.
    pub(crate) fn first_incident_edge(&self, vertex: VertexId) -> Option<crate::types::EdgeId> {
        let record = self.vertices.get(vertex)?;
        record
            .outgoing
            .first()
            .or_else(|| record.incoming.first())
            .copied()
    }
}
