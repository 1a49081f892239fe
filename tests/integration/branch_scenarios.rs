#![allow(missing_docs)]

use lineage::{
    BranchItem, BranchRepair, EdgeId, LineageError, Model, ModelOptions, ReadOnlyGraph, Result,
    VertexId,
};

fn model(repair: BranchRepair) -> Model {
    Model::new(
        ModelOptions::default()
            .branch_repair(repair)
            .verify_branch_graph(true),
    )
}

fn chain(model: &Model, n: usize) -> Result<(Vec<VertexId>, Vec<EdgeId>)> {
    let mut graph = model.write();
    let vertices = (0..n)
        .map(|_| graph.add_vertex())
        .collect::<Result<Vec<_>>>()?;
    let edges = vertices
        .windows(2)
        .map(|pair| graph.add_edge(pair[0], pair[1]))
        .collect::<Result<Vec<_>>>()?;
    Ok((vertices, edges))
}

fn interior(model: &Model, v: VertexId) -> Result<lineage::BranchEdgeId> {
    model
        .read()
        .branch()
        .branch_edge_of_vertex(v)
        .ok_or(LineageError::NotFound("interior vertex"))
}

#[test]
fn linear_chain_condenses_to_one_branch_edge() -> Result<()> {
    for repair in [BranchRepair::Incremental, BranchRepair::Rebuild] {
        let model = model(repair);
        let (vs, es) = chain(&model, 4)?;
        let graph = model.read();
        let branch = graph.branch();

        assert_eq!(branch.branch_vertex_count(), 2);
        assert_eq!(branch.branch_edge_count(), 1);
        let be = branch
            .branch_edge_of_edge(es[0])
            .ok_or(LineageError::NotFound("chain"))?;
        assert_eq!(branch.vertex_branch_iter(be).copied().collect::<Vec<_>>(), vs[1..3]);
        assert_eq!(branch.edge_branch_iter(be).copied().collect::<Vec<_>>(), es);
        assert_eq!(branch.first_linked_vertex(be), Some(vs[0]));
        assert_eq!(branch.last_linked_vertex(be), Some(vs[3]));
        for e in &es {
            assert_eq!(branch.branch_edge_of_edge(*e), Some(be));
        }
        let root = branch
            .branch_vertex(vs[0])
            .ok_or(LineageError::NotFound("root"))?;
        assert_eq!(branch.linked_vertex(root), Some(vs[0]));
        assert_eq!(branch.out_degree(root), 1);
    }
    Ok(())
}

#[test]
fn extra_edge_splits_the_chain() -> Result<()> {
    for repair in [BranchRepair::Incremental, BranchRepair::Rebuild] {
        let model = model(repair);
        let (vs, _) = chain(&model, 5)?;
        let leaf = {
            let mut graph = model.write();
            let leaf = graph.add_vertex()?;
            graph.add_edge(vs[2], leaf)?;
            leaf
        };
        let graph = model.read();
        let branch = graph.branch();

        let split = branch
            .branch_vertex(vs[2])
            .ok_or(LineageError::NotFound("split point"))?;
        assert_eq!(branch.out_degree(split), 2);
        assert_eq!(branch.in_degree(split), 1);
        assert!(branch.branch_vertex(leaf).is_some());
        assert_eq!(branch.branch_vertex_count(), 4);
        assert_eq!(branch.branch_edge_count(), 3);
        assert_ne!(
            branch.branch_edge_of_vertex(vs[1]),
            branch.branch_edge_of_vertex(vs[3])
        );
    }
    Ok(())
}

#[test]
fn removing_the_extra_edge_merges_the_chains() -> Result<()> {
    let model = model(BranchRepair::Incremental);
    let (vs, _) = chain(&model, 5)?;
    let (leaf, extra) = {
        let mut graph = model.write();
        let leaf = graph.add_vertex()?;
        let extra = graph.add_edge(vs[2], leaf)?;
        (leaf, extra)
    };
    assert!(model.read().branch().branch_vertex(vs[2]).is_some());

    model.write().remove_edge(extra)?;
    model.write().remove_vertex(leaf)?;

    let merged = interior(&model, vs[2])?;
    assert_eq!(interior(&model, vs[1])?, merged);
    assert_eq!(interior(&model, vs[3])?, merged);
    let graph = model.read();
    let branch = graph.branch();
    assert_eq!(
        branch
            .vertex_branch_iter(BranchItem::Edge(merged))
            .copied()
            .collect::<Vec<_>>(),
        vs[1..4]
    );
    assert_eq!(branch.branch_edge_count(), 1);
    assert_eq!(branch.branch_vertex_count(), 2);
    Ok(())
}

#[test]
fn removing_a_leaf_vertex_also_merges() -> Result<()> {
    let model = model(BranchRepair::Incremental);
    let (vs, _) = chain(&model, 5)?;
    let leaf = {
        let mut graph = model.write();
        let leaf = graph.add_vertex()?;
        graph.add_edge(vs[2], leaf)?;
        leaf
    };
    model.write().remove_vertex(leaf)?;
    assert_eq!(interior(&model, vs[1])?, interior(&model, vs[3])?);
    assert_eq!(model.read().branch().branch_edge_count(), 1);
    Ok(())
}

#[test]
fn pure_cycle_is_anchored_and_released() -> Result<()> {
    let model = model(BranchRepair::Incremental);
    let (vs, _) = chain(&model, 3)?;
    let closing = model.write().add_edge(vs[2], vs[0])?;
    {
        let graph = model.read();
        let branch = graph.branch();
        assert_eq!(branch.branch_vertex_count(), 1);
        assert_eq!(branch.branch_edge_count(), 1);
        assert_eq!(vs.iter().filter(|v| branch.is_anchor(**v)).count(), 1);
    }

    model.write().remove_edge(closing)?;
    let graph = model.read();
    let branch = graph.branch();
    assert!(vs.iter().all(|v| !branch.is_anchor(*v)));
    assert_eq!(branch.branch_vertex_count(), 2);
    assert_eq!(branch.branch_edge_count(), 1);
    Ok(())
}

#[test]
fn listeners_hear_every_repair() -> Result<()> {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use lineage::primitives::listeners::ListenerRegistry;

    #[derive(Default)]
    struct Count(AtomicUsize);
    impl lineage::BranchGraphListener for Count {
        fn branch_graph_changed(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let model = model(BranchRepair::Incremental);
    let count = Arc::new(Count::default());
    model.read().branch().listeners().add(count.clone());
    chain(&model, 3)?;
    assert_eq!(count.0.load(Ordering::SeqCst), 5);
    Ok(())
}
