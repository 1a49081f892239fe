#![forbid(unsafe_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lineage::{BranchRepair, Model, ModelOptions, VertexId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const VERTEX_COUNT: usize = 8_192;
const FORK_PERCENT: u32 = 5;

fn micro_branch(c: &mut Criterion) {
    let mut group = c.benchmark_group("micro/branch");
    group.sample_size(40);
    group.throughput(Throughput::Elements(1));

    for repair in [BranchRepair::Incremental, BranchRepair::Rebuild] {
        let mut harness = LineageHarness::new(VERTEX_COUNT, repair);
        group.bench_with_input(
            BenchmarkId::new("split_and_merge", format!("{repair:?}")),
            &repair,
            |b, _| {
                b.iter(|| black_box(harness.split_and_merge()));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("grow_leaf", format!("{repair:?}")),
            &repair,
            |b, _| {
                b.iter(|| black_box(harness.grow_and_prune()));
            },
        );
    }

    group.bench_function("lookup_chain", |b| {
        let mut harness = LineageHarness::new(VERTEX_COUNT, BranchRepair::Incremental);
        b.iter(|| black_box(harness.chain_length()));
    });
    group.finish();
}

/// A lineage tree: mostly long chains with occasional forks.
struct LineageHarness {
    model: Model,
    vertices: Vec<VertexId>,
    rng: ChaCha8Rng,
}

impl LineageHarness {
    fn new(vertex_count: usize, repair: BranchRepair) -> Self {
        let model = Model::new(
            ModelOptions::default()
                .vertex_capacity(vertex_count)
                .edge_capacity(vertex_count)
                .branch_repair(repair),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(0xDEADBEEF);
        let mut vertices = Vec::with_capacity(vertex_count);
        {
            let mut graph = model.write();
            let mut tip = graph.add_vertex().expect("root");
            vertices.push(tip);
            for _ in 1..vertex_count {
                let parent = if rng.gen_ratio(FORK_PERCENT, 100) {
                    vertices[rng.gen_range(0..vertices.len())]
                } else {
                    tip
                };
                let child = graph.add_vertex().expect("vertex");
                graph.add_edge(parent, child).expect("edge");
                vertices.push(child);
                tip = child;
            }
        }
        Self {
            model,
            vertices,
            rng,
        }
    }

    fn pick(&mut self) -> VertexId {
        self.vertices[self.rng.gen_range(0..self.vertices.len())]
    }

    /// Adds a side edge from a random vertex and takes it away again.
    fn split_and_merge(&mut self) -> usize {
        let (from, to) = (self.pick(), self.pick());
        let mut graph = self.model.write();
        let edge = graph.add_edge(from, to).expect("edge");
        let count = graph.branch().branch_edge_count();
        graph.remove_edge(edge).expect("remove");
        count
    }

    /// Hangs a fresh leaf off a random vertex and removes it.
    fn grow_and_prune(&mut self) -> usize {
        let parent = self.pick();
        let mut graph = self.model.write();
        let leaf = graph.add_vertex().expect("leaf");
        graph.add_edge(parent, leaf).expect("edge");
        let count = graph.branch().branch_vertex_count();
        graph.remove_vertex(leaf).expect("remove");
        count
    }

    fn chain_length(&mut self) -> usize {
        let vertex = self.pick();
        let graph = self.model.read();
        let branch = graph.branch();
        branch
            .branch_edge_of_vertex(vertex)
            .map_or(0, |be| branch.vertex_branch_iter(be).len())
    }
}

criterion_group!(benches, micro_branch);
criterion_main!(benches);
