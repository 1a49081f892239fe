use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::storage::ReadOnlyGraph;
use crate::types::{BranchEdgeId, BranchVertexId, GraphObject};

use super::{BranchEdgeRecord, BranchGraph, BranchVertexRecord, VertexLink};

/// Underlying objects unlinked by a repair, to be re-condensed.
struct Seeds<V, E> {
    vertices: Vec<V>,
    edges: Vec<E>,
}

impl<V, E> Default for Seeds<V, E> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl<V: GraphObject, E: GraphObject> BranchGraph<V, E> {
    /// Recomputes the whole condensation of `graph`.
    pub fn rebuild<G>(&mut self, graph: &G)
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        self.vertices.clear();
        self.edges.clear();
        self.vertex_links.clear();
        self.edge_links.clear();
        self.anchors.clear();

        for vertex in graph.vertices() {
            if self.is_branch_point(graph, vertex) {
                self.ensure_branch_vertex(vertex);
            }
        }
        for edge in graph.edges() {
            if !self.edge_links.contains_key(&edge) {
                self.build_chain_through(graph, edge);
            }
        }

        self.stats.rebuilds += 1;
        debug!(
            branch_vertices = self.vertices.len(),
            branch_edges = self.edges.len(),
            anchors = self.anchors.len(),
            "branch.rebuild"
        );
        self.notify_changed();
    }

    /// Repairs the condensation after `vertex` was added to `graph`.
    pub fn vertex_added<G>(&mut self, graph: &G, vertex: V)
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        let mut seeds = Seeds::default();
        self.touch(graph, vertex, &mut seeds);
        self.repair(graph, seeds, "vertex_added");
    }

    /// Repairs the condensation after `vertex` was removed from `graph`.
    ///
    /// The vertex's edges are expected to have been removed (and reported)
    /// beforehand.
    pub fn vertex_removed<G>(&mut self, graph: &G, vertex: V)
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        let mut seeds = Seeds::default();
        match self.vertex_links.get(&vertex).copied() {
            Some(VertexLink::Vertex(bv)) => self.dissolve_vertex(bv, &mut seeds),
            Some(VertexLink::Interior(be)) => self.dissolve_edge(be, &mut seeds),
            None => {}
        }
        self.vertex_links.remove(&vertex);
        self.anchors.remove(&vertex);
        self.repair(graph, seeds, "vertex_removed");
    }

    /// Repairs the condensation after `edge` was added to `graph`.
    pub fn edge_added<G>(&mut self, graph: &G, edge: E)
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        let mut seeds = Seeds::default();
        seeds.edges.push(edge);
        if let Some(source) = graph.source(edge) {
            self.touch(graph, source, &mut seeds);
        }
        if let Some(target) = graph.target(edge) {
            self.touch(graph, target, &mut seeds);
        }
        self.repair(graph, seeds, "edge_added");
    }

    /// Repairs the condensation after `edge`, which ran from `source` to
    /// `target`, was removed from `graph`.
    pub fn edge_removed<G>(&mut self, graph: &G, edge: E, source: V, target: V)
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        let mut seeds = Seeds::default();
        if let Some(be) = self.edge_links.get(&edge).copied() {
            self.dissolve_edge(be, &mut seeds);
        }
        self.touch(graph, source, &mut seeds);
        self.touch(graph, target, &mut seeds);
        self.repair(graph, seeds, "edge_removed");
    }

    pub(super) fn is_branch_point<G>(&self, graph: &G, vertex: V) -> bool
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        graph.in_degree(vertex) != 1
            || graph.out_degree(vertex) != 1
            || self.anchors.contains(&vertex)
    }

    /// Dissolves whatever `vertex` is linked to if its degrees changed the
    /// structure around it.
    fn touch<G>(&mut self, graph: &G, vertex: V, seeds: &mut Seeds<V, E>)
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        match self.vertex_links.get(&vertex).copied() {
            Some(VertexLink::Interior(be)) => self.dissolve_edge(be, seeds),
            Some(VertexLink::Vertex(bv)) => {
                let stale = self.anchors.contains(&vertex)
                    || !graph.contains_vertex(vertex)
                    || !self.is_branch_point(graph, vertex);
                if stale {
                    self.dissolve_vertex(bv, seeds);
                }
            }
            None => seeds.vertices.push(vertex),
        }
    }

    fn dissolve_vertex(&mut self, bv: BranchVertexId, seeds: &mut Seeds<V, E>) {
        let Some(record) = self.vertices.remove(bv) else {
            return;
        };
        self.stats.vertices_dissolved += 1;
        self.vertex_links.remove(&record.vertex);
        self.anchors.remove(&record.vertex);
        seeds.vertices.push(record.vertex);
        for be in record.incoming.iter().chain(record.outgoing.iter()) {
            self.dissolve_edge(*be, seeds);
        }
    }

    fn dissolve_edge(&mut self, be: BranchEdgeId, seeds: &mut Seeds<V, E>) {
        let Some(record) = self.edges.remove(be) else {
            return;
        };
        self.stats.chains_dissolved += 1;
        for vertex in &record.vertices {
            self.vertex_links.remove(vertex);
        }
        for edge in &record.edges {
            self.edge_links.remove(edge);
        }
        seeds.vertices.extend_from_slice(&record.vertices);
        seeds.edges.extend_from_slice(&record.edges);

        let mut anchored: SmallVec<[BranchVertexId; 2]> = SmallVec::new();
        if let Some(source) = self.vertices.get_mut(record.source) {
            source.outgoing.retain(|e| *e != be);
            if self.anchors.contains(&source.vertex) {
                anchored.push(record.source);
            }
        }
        if let Some(target) = self.vertices.get_mut(record.target) {
            target.incoming.retain(|e| *e != be);
            if self.anchors.contains(&target.vertex) {
                anchored.push(record.target);
            }
        }
        // An anchor only exists for the cycle this chain closed.
        for bv in anchored {
            self.dissolve_vertex(bv, seeds);
        }
    }

    fn repair<G>(&mut self, graph: &G, seeds: Seeds<V, E>, cause: &'static str)
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        let built_before = self.stats.chains_built;
        for &vertex in &seeds.vertices {
            if graph.contains_vertex(vertex)
                && !self.vertex_links.contains_key(&vertex)
                && self.is_branch_point(graph, vertex)
            {
                self.ensure_branch_vertex(vertex);
            }
        }
        for &vertex in &seeds.vertices {
            if !graph.contains_vertex(vertex) {
                continue;
            }
            match self.vertex_links.get(&vertex).copied() {
                Some(VertexLink::Vertex(_)) => {
                    let incident = graph
                        .outgoing_edges(vertex)
                        .iter()
                        .chain(graph.incoming_edges(vertex));
                    for &edge in incident {
                        if !self.edge_links.contains_key(&edge) {
                            self.build_chain_through(graph, edge);
                        }
                    }
                }
                Some(VertexLink::Interior(_)) => {}
                None => {
                    if let Some(&edge) = graph.outgoing_edges(vertex).first() {
                        if !self.edge_links.contains_key(&edge) {
                            self.build_chain_through(graph, edge);
                        }
                    }
                }
            }
        }
        for &edge in &seeds.edges {
            if graph.contains_edge(edge) && !self.edge_links.contains_key(&edge) {
                self.build_chain_through(graph, edge);
            }
        }

        self.stats.repairs += 1;
        trace!(
            cause,
            seed_vertices = seeds.vertices.len(),
            seed_edges = seeds.edges.len(),
            chains_built = self.stats.chains_built - built_before,
            "branch.repair"
        );
        self.notify_changed();
    }

    fn ensure_branch_vertex(&mut self, vertex: V) -> BranchVertexId {
        if let Some(VertexLink::Vertex(bv)) = self.vertex_links.get(&vertex) {
            return *bv;
        }
        let bv = self.vertices.insert(BranchVertexRecord {
            vertex,
            incoming: SmallVec::new(),
            outgoing: SmallVec::new(),
        });
        self.vertex_links.insert(vertex, VertexLink::Vertex(bv));
        bv
    }

    /// Condenses the maximal chain containing the unlinked `edge`.
    ///
    /// Walks backwards to the chain's starting branch point; coming back to
    /// `edge` means the chain is a pure (1,1) cycle, which is anchored at
    /// the vertex reached last.
    fn build_chain_through<G>(&mut self, graph: &G, edge: E)
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        let mut first = edge;
        loop {
            let Some(source) = graph.source(first) else {
                return;
            };
            if self.is_branch_point(graph, source) {
                break;
            }
            let Some(&previous) = graph.incoming_edges(source).first() else {
                break;
            };
            if previous == edge {
                trace!(anchor = ?source, "branch.anchor");
                self.anchors.insert(source);
                break;
            }
            first = previous;
        }
        self.build_chain_from(graph, first);
    }

    /// Builds the branch edge starting with `first`, whose source is a
    /// branch point.
    fn build_chain_from<G>(&mut self, graph: &G, first: E)
    where
        G: ReadOnlyGraph<Vertex = V, Edge = E>,
    {
        let (Some(start), Some(mut current)) = (graph.source(first), graph.target(first)) else {
            return;
        };
        let source = self.ensure_branch_vertex(start);
        let mut vertices = Vec::new();
        let mut edges = vec![first];
        while !self.is_branch_point(graph, current) {
            let Some(&next) = graph.outgoing_edges(current).first() else {
                break;
            };
            let Some(next_target) = graph.target(next) else {
                break;
            };
            vertices.push(current);
            edges.push(next);
            current = next_target;
        }
        let target = self.ensure_branch_vertex(current);

        let be = self.edges.insert(BranchEdgeRecord {
            source,
            target,
            vertices,
            edges,
        });
        if let Some(record) = self.edges.get(be) {
            for vertex in &record.vertices {
                self.vertex_links.insert(*vertex, VertexLink::Interior(be));
            }
            for edge in &record.edges {
                self.edge_links.insert(*edge, be);
            }
        }
        if let Some(record) = self.vertices.get_mut(source) {
            record.outgoing.push(be);
        }
        if let Some(record) = self.vertices.get_mut(target) {
            record.incoming.push(be);
        }
        self.stats.chains_built += 1;
    }
}
