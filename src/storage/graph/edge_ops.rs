use tracing::trace;

use crate::types::{EdgeId, LineageError, Result, VertexId};

use super::{EdgeRecord, Graph};

impl Graph {
    /// Adds an edge from `source` to `target`.
    ///
    /// Self-loops and parallel edges are accepted.
    pub fn add_edge(&mut self, source: VertexId, target: VertexId) -> Result<EdgeId> {
        self.ensure_vertex(source, "edge source vertex missing")?;
        self.ensure_vertex(target, "edge target vertex missing")?;
        let edge = self.edges.insert(EdgeRecord { source, target });
        if let Some(record) = self.vertices.get_mut(source) {
            record.outgoing.push(edge);
        }
        if let Some(record) = self.vertices.get_mut(target) {
            record.incoming.push(edge);
        }
        trace!(edge = %edge, source = %source, target = %target, "graph.edge.add");
        self.notify(|l, g| l.edge_added(g, edge));
        Ok(edge)
    }

    /// Removes `edge`.
    pub fn remove_edge(&mut self, edge: EdgeId) -> Result<()> {
        let EdgeRecord { source, target } = self
            .edges
            .remove(edge)
            .ok_or(LineageError::StaleHandle("remove_edge on stale edge"))?;
        if let Some(record) = self.vertices.get_mut(source) {
            record.outgoing.retain(|e| *e != edge);
        }
        if let Some(record) = self.vertices.get_mut(target) {
            record.incoming.retain(|e| *e != edge);
        }
        trace!(edge = %edge, source = %source, target = %target, "graph.edge.remove");
        self.notify(|l, g| l.edge_removed(g, edge, source, target));
        Ok(())
    }
}
