use tracing::warn;

use crate::storage::ReadOnlyGraph;
use crate::types::{GraphObject, LineageError, Result};

use super::{BranchGraph, VertexLink};

impl<V: GraphObject, E: GraphObject> BranchGraph<V, E> {
    /// Checks that this condensation is exactly the one `graph` implies.
    ///
    /// Verifies that every live vertex and edge is linked to exactly one live
    /// branch object, that every chain is connected, maximal and bounded by
    /// branch points, and that branch adjacency mirrors chain endpoints.
    pub fn verify<G>(&self, graph: &G) -> Result<()>
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        let result = self.check(graph);
        if let Err(err) = &result {
            warn!(error = %err, "branch.verify.failed");
        }
        result
    }

    fn check<G>(&self, graph: &G) -> Result<()>
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        for vertex in graph.vertices() {
            match self.vertex_links.get(&vertex) {
                None => return corrupt(format!("vertex {vertex:?} is not linked")),
                Some(VertexLink::Vertex(bv)) => {
                    if self.linked_vertex(*bv) != Some(vertex) {
                        return corrupt(format!("vertex {vertex:?} linked to foreign {bv}"));
                    }
                    if !self.is_branch_point(graph, vertex) {
                        return corrupt(format!("branch vertex {bv} is not a branch point"));
                    }
                }
                Some(VertexLink::Interior(be)) => {
                    let Some(record) = self.edges.get(*be) else {
                        return corrupt(format!("vertex {vertex:?} linked to stale {be}"));
                    };
                    if !record.vertices.contains(&vertex) {
                        return corrupt(format!("vertex {vertex:?} missing from {be}"));
                    }
                    if self.is_branch_point(graph, vertex) {
                        return corrupt(format!("branch point {vertex:?} inside {be}"));
                    }
                }
            }
        }
        for edge in graph.edges() {
            let Some(be) = self.edge_links.get(&edge) else {
                return corrupt(format!("edge {edge:?} is not linked"));
            };
            match self.edges.get(*be) {
                Some(record) if record.edges.contains(&edge) => {}
                _ => return corrupt(format!("edge {edge:?} linked to wrong chain {be}")),
            }
        }
        if self.vertex_links.len() != graph.vertex_count() {
            return corrupt(format!(
                "{} vertex links for {} vertices",
                self.vertex_links.len(),
                graph.vertex_count()
            ));
        }
        if self.edge_links.len() != graph.edge_count() {
            return corrupt(format!(
                "{} edge links for {} edges",
                self.edge_links.len(),
                graph.edge_count()
            ));
        }

        for (be, record) in self.edges.iter() {
            let (Some(start), Some(end)) = (
                self.linked_vertex(record.source),
                self.linked_vertex(record.target),
            ) else {
                return corrupt(format!("{be} has a stale endpoint"));
            };
            if record.edges.len() != record.vertices.len() + 1 {
                return corrupt(format!("{be} has mismatched chain lengths"));
            }
            let mut at = start;
            for (i, edge) in record.edges.iter().enumerate() {
                if graph.source(*edge) != Some(at) {
                    return corrupt(format!("{be} is disconnected at edge {i}"));
                }
                let Some(next) = graph.target(*edge) else {
                    return corrupt(format!("{be} holds a stale edge"));
                };
                at = next;
                if let Some(interior) = record.vertices.get(i) {
                    if *interior != at {
                        return corrupt(format!("{be} interior {i} out of order"));
                    }
                }
            }
            if at != end {
                return corrupt(format!("{be} does not end at its target"));
            }
            if !self.outgoing_edges(record.source).contains(&be)
                || !self.incoming_edges(record.target).contains(&be)
            {
                return corrupt(format!("{be} missing from endpoint adjacency"));
            }
        }
        for (bv, record) in self.vertices.iter() {
            let dangling = record
                .outgoing
                .iter()
                .any(|be| self.branch_source(*be) != Some(bv))
                || record
                    .incoming
                    .iter()
                    .any(|be| self.branch_target(*be) != Some(bv));
            if dangling {
                return corrupt(format!("{bv} lists a chain it does not bound"));
            }
        }
        for anchor in &self.anchors {
            let Some(VertexLink::Vertex(bv)) = self.vertex_links.get(anchor).copied() else {
                return corrupt(format!("anchor {anchor:?} is not a branch vertex"));
            };
            let closes_cycle = match self.outgoing_edges(bv) {
                [only] => self.branch_target(*only) == Some(bv),
                _ => false,
            };
            if !closes_cycle {
                return corrupt(format!("anchor {anchor:?} does not close a (1,1) cycle"));
            }
        }
        Ok(())
    }
}

fn corrupt(message: String) -> Result<()> {
    Err(LineageError::Corruption(message))
}
