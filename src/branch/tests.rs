#![cfg(test)]

use super::*;
use crate::storage::Graph;
use crate::types::{EdgeId, Result, VertexId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Core graph plus a condenser driven by hand after every mutation.
struct Fixture {
    graph: Graph,
    branch: BranchGraph<VertexId, EdgeId>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            graph: Graph::new(),
            branch: BranchGraph::new(),
        }
    }

    fn vertex(&mut self) -> VertexId {
        let v = self.graph.add_vertex();
        self.branch.vertex_added(&self.graph, v);
        v
    }

    fn vertices(&mut self, n: usize) -> Vec<VertexId> {
        (0..n).map(|_| self.vertex()).collect()
    }

    fn edge(&mut self, source: VertexId, target: VertexId) -> Result<EdgeId> {
        let e = self.graph.add_edge(source, target)?;
        self.branch.edge_added(&self.graph, e);
        Ok(e)
    }

    fn remove_edge(&mut self, e: EdgeId) -> Result<()> {
        let source = self.graph.source(e);
        let target = self.graph.target(e);
        self.graph.remove_edge(e)?;
        if let (Some(source), Some(target)) = (source, target) {
            self.branch.edge_removed(&self.graph, e, source, target);
        }
        Ok(())
    }

    fn remove_vertex(&mut self, v: VertexId) -> Result<()> {
        while let Some(e) = self.graph.first_incident_edge(v) {
            self.remove_edge(e)?;
        }
        self.graph.remove_vertex(v)?;
        self.branch.vertex_removed(&self.graph, v);
        Ok(())
    }

    /// Verifies the incremental result and compares it with a fresh build.
    fn check(&self) -> Result<()> {
        self.branch.verify(&self.graph)?;
        let fresh = BranchGraph::build(&self.graph);
        fresh.verify(&self.graph)?;
        assert_eq!(self.branch.branch_vertex_count(), fresh.branch_vertex_count());
        assert_eq!(self.branch.branch_edge_count(), fresh.branch_edge_count());
        Ok(())
    }

    fn chain(&mut self, n: usize) -> Result<(Vec<VertexId>, Vec<EdgeId>)> {
        let vs = self.vertices(n);
        let mut es = Vec::new();
        for pair in vs.windows(2) {
            es.push(self.edge(pair[0], pair[1])?);
        }
        Ok((vs, es))
    }
}

#[test]
fn isolated_vertex_is_a_branch_vertex() -> Result<()> {
    let mut f = Fixture::new();
    let v = f.vertex();
    let bv = f.branch.branch_vertex(v).expect("branch vertex");
    assert_eq!(f.branch.linked_vertex(bv), Some(v));
    assert_eq!(f.branch.vertex_branch_iter(bv).copied().collect::<Vec<_>>(), vec![v]);
    assert_eq!(f.branch.edge_branch_iter(bv).count(), 0);
    f.check()
}

#[test]
fn chain_condenses_to_one_branch_edge() -> Result<()> {
    let mut f = Fixture::new();
    let (vs, es) = f.chain(4)?;
    let [a, b, c, d] = [vs[0], vs[1], vs[2], vs[3]];

    let be = f.branch.branch_edge_of_vertex(b).expect("b is interior");
    assert_eq!(f.branch.branch_edge_of_vertex(c), Some(be));
    assert_eq!(f.branch.branch_vertex(b), None);
    assert_eq!(f.branch.branch_edge_of_vertex(a), None);
    for e in &es {
        assert_eq!(f.branch.branch_edge_of_edge(*e), Some(be));
    }

    assert_eq!(f.branch.linked_edge(be), Some(es[0]));
    assert_eq!(f.branch.first_linked_vertex(be), Some(a));
    assert_eq!(f.branch.last_linked_vertex(be), Some(d));
    assert_eq!(
        f.branch.vertex_branch_iter(be).copied().collect::<Vec<_>>(),
        vec![b, c]
    );
    assert_eq!(f.branch.edge_branch_iter(be).copied().collect::<Vec<_>>(), es);

    let source = f.branch.branch_source(be).expect("source");
    let target = f.branch.branch_target(be).expect("target");
    assert_eq!(f.branch.branch_vertex(a), Some(source));
    assert_eq!(f.branch.branch_vertex(d), Some(target));
    assert_eq!(f.branch.outgoing_edges(source), &[be]);
    assert_eq!(f.branch.incoming_edges(target), &[be]);
    assert_eq!((f.branch.branch_vertex_count(), f.branch.branch_edge_count()), (2, 1));
    f.check()
}

#[test]
fn round_trips_hold_for_every_branch_object() -> Result<()> {
    let mut f = Fixture::new();
    let (vs, _) = f.chain(5)?;
    let side = f.vertex();
    f.edge(vs[2], side)?;
    let tail = f.vertex();
    f.edge(side, tail)?;

    for v in f.graph.vertices() {
        if let Some(bv) = f.branch.branch_vertex(v) {
            assert_eq!(f.branch.linked_vertex(bv), Some(v));
        }
    }
    for be in ReadOnlyGraph::edges(&f.branch) {
        let e = f.branch.linked_edge(be).expect("non-empty chain");
        assert_eq!(f.branch.branch_edge_of_edge(e), Some(be));
    }
    f.check()
}

#[test]
fn extra_outgoing_edge_splits_the_chain() -> Result<()> {
    let mut f = Fixture::new();
    let (vs, es) = f.chain(4)?;
    let [a, b, c, d] = [vs[0], vs[1], vs[2], vs[3]];
    let before = f.branch.branch_edge_of_vertex(b).expect("interior");

    let x = f.vertex();
    f.edge(c, x)?;

    assert!(!f.branch.contains_edge(before));
    let c_bv = f.branch.branch_vertex(c).expect("c became a branch point");
    let upper = f.branch.branch_edge_of_edge(es[0]).expect("a..c");
    let lower = f.branch.branch_edge_of_edge(es[2]).expect("c..d");
    assert_ne!(upper, lower);
    assert_eq!(f.branch.first_linked_vertex(upper), Some(a));
    assert_eq!(f.branch.last_linked_vertex(upper), Some(c));
    assert_eq!(f.branch.first_linked_vertex(lower), Some(c));
    assert_eq!(f.branch.last_linked_vertex(lower), Some(d));
    assert_eq!(f.branch.branch_edge_of_vertex(b), Some(upper));
    assert_eq!(f.branch.out_degree(c_bv), 2);
    f.check()
}

#[test]
fn removing_the_extra_branch_merges_the_chains() -> Result<()> {
    let mut f = Fixture::new();
    let (vs, es) = f.chain(5)?;
    let [a, b, c, d, e] = [vs[0], vs[1], vs[2], vs[3], vs[4]];
    let x = f.vertex();
    f.edge(c, x)?;
    assert!(f.branch.branch_vertex(c).is_some());
    assert_eq!(f.branch.branch_edge_count(), 3);

    f.remove_vertex(x)?;
    let merged = f.branch.branch_edge_of_vertex(c).expect("c is interior again");
    assert_eq!(f.branch.branch_edge_count(), 1);
    assert_eq!(
        f.branch.vertex_branch_iter(merged).copied().collect::<Vec<_>>(),
        vec![b, c, d]
    );
    assert_eq!(
        f.branch.edge_branch_iter(merged).copied().collect::<Vec<_>>(),
        es
    );
    assert_eq!(f.branch.first_linked_vertex(merged), Some(a));
    assert_eq!(f.branch.last_linked_vertex(merged), Some(e));
    f.check()
}

#[test]
fn division_creates_three_branch_edges() -> Result<()> {
    let mut f = Fixture::new();
    let vs = f.vertices(6);
    f.edge(vs[0], vs[1])?;
    f.edge(vs[1], vs[2])?;
    f.edge(vs[2], vs[3])?;
    f.edge(vs[3], vs[4])?;
    f.edge(vs[2], vs[5])?;

    assert!(f.branch.branch_vertex(vs[2]).is_some());
    assert_eq!(f.branch.branch_vertex_count(), 4);
    assert_eq!(f.branch.branch_edge_count(), 3);
    f.check()
}

#[test]
fn pure_cycle_is_anchored_once() -> Result<()> {
    let mut f = Fixture::new();
    let (vs, _) = f.chain(3)?;
    f.edge(vs[2], vs[0])?;

    assert_eq!(f.branch.branch_vertex_count(), 1);
    assert_eq!(f.branch.branch_edge_count(), 1);
    let anchor = vs
        .iter()
        .copied()
        .find(|v| f.branch.is_anchor(*v))
        .expect("one anchored vertex");
    let bv = f.branch.branch_vertex(anchor).expect("anchor has a branch vertex");
    let be = f.branch.outgoing_edges(bv)[0];
    assert_eq!(f.branch.branch_target(be), Some(bv));
    assert_eq!(f.branch.vertex_branch_iter(be).count(), 2);
    assert_eq!(f.branch.edge_branch_iter(be).count(), 3);
    f.check()
}

#[test]
fn self_loop_on_isolated_vertex() -> Result<()> {
    let mut f = Fixture::new();
    let v = f.vertex();
    let e = f.edge(v, v)?;
    assert!(f.branch.is_anchor(v));
    let be = f.branch.branch_edge_of_edge(e).expect("loop chain");
    assert_eq!(f.branch.first_linked_vertex(be), Some(v));
    assert_eq!(f.branch.last_linked_vertex(be), Some(v));
    assert_eq!(f.branch.vertex_branch_iter(be).count(), 0);
    f.check()?;

    f.remove_edge(e)?;
    assert!(!f.branch.is_anchor(v));
    assert!(f.branch.branch_vertex(v).is_some());
    f.check()
}

#[test]
fn breaking_into_a_cycle_drops_the_anchor() -> Result<()> {
    let mut f = Fixture::new();
    let (vs, _) = f.chain(4)?;
    let closing = f.edge(vs[3], vs[0])?;
    f.check()?;

    let x = f.vertex();
    let spur = f.edge(vs[1], x)?;
    assert!(vs.iter().all(|v| !f.branch.is_anchor(*v)));
    assert!(f.branch.branch_vertex(vs[1]).is_some());
    f.check()?;

    f.remove_edge(spur)?;
    assert_eq!(vs.iter().filter(|v| f.branch.is_anchor(**v)).count(), 1);
    f.check()?;

    f.remove_edge(closing)?;
    assert!(vs.iter().all(|v| !f.branch.is_anchor(*v)));
    f.check()
}

#[test]
fn removing_a_mid_chain_vertex_splits_into_two_trees() -> Result<()> {
    let mut f = Fixture::new();
    let (vs, _) = f.chain(5)?;
    f.remove_vertex(vs[2])?;
    assert!(f.branch.branch_vertex(vs[1]).is_some());
    assert!(f.branch.branch_vertex(vs[3]).is_some());
    assert_eq!(f.branch.branch_edge_count(), 2);
    f.check()
}

#[test]
fn listeners_hear_every_repair() -> Result<()> {
    #[derive(Default)]
    struct Count(AtomicUsize);
    impl BranchGraphListener for Count {
        fn branch_graph_changed(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let mut f = Fixture::new();
    let count = Arc::new(Count::default());
    crate::primitives::listeners::ListenerRegistry::add(f.branch.listeners(), count.clone());
    let a = f.vertex();
    let b = f.vertex();
    f.edge(a, b)?;
    assert_eq!(count.0.load(Ordering::SeqCst), 3);

    f.branch.rebuild(&f.graph);
    assert_eq!(count.0.load(Ordering::SeqCst), 4);
    assert_eq!(f.branch.stats().rebuilds, 1);
    assert_eq!(f.branch.stats().repairs, 3);
    Ok(())
}

#[test]
fn stale_branch_items_answer_nothing() -> Result<()> {
    let mut f = Fixture::new();
    let (vs, es) = f.chain(3)?;
    let be = f.branch.branch_edge_of_edge(es[0]).expect("chain");
    f.remove_vertex(vs[1])?;

    assert!(!f.branch.contains_edge(be));
    assert_eq!(f.branch.linked_edge(be), None);
    assert_eq!(f.branch.first_linked_vertex(be), None);
    assert_eq!(f.branch.vertex_branch_iter(be).count(), 0);
    assert_eq!(f.branch.edge_branch_iter(be).count(), 0);
    assert_eq!(f.branch.branch_edge_of_edge(es[0]), None);
    f.check()
}
