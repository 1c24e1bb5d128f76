//! Benchmarks for trees, finite-difference rollback and Monte Carlo.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ql_math::Array;
use ql_methods::finite_differences::{
    CompositeStepCondition, Fdm1dMesher, FdmBackwardSolver, FdmBoundaryConditionSet, FdmLinearOpComposite,
    FdmMesherComposite, FdmSchemeDesc, SecondDerivativeOp, TripleBandLinearOp, Uniform1dMesher,
};
use ql_methods::{backward_induction, simulate, BinomialTree, LogNormalDynamics, McConfig, RecombiningTree, TreeKind};

fn bench_binomial_trees(c: &mut Criterion) {
    let dynamics = LogNormalDynamics::new(100.0, 0.05, 0.0, 0.2).unwrap();
    let mut group = c.benchmark_group("binomial_american_put");
    for kind in [TreeKind::CoxRossRubinstein, TreeKind::LeisenReimer] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{kind:?}")), &kind, |b, &kind| {
            b.iter(|| {
                let tree = BinomialTree::new(kind, &dynamics, 1.0, 501, 100.0).unwrap();
                let discount = (-0.05 * tree.dt()).exp();
                black_box(
                    backward_induction(&tree, discount, |s| (100.0 - s).max(0.0), |_| true)
                        .unwrap()
                        .value(),
                )
            })
        });
    }
    group.finish();
}

#[derive(Debug)]
struct Diffusion(TripleBandLinearOp);

impl FdmLinearOpComposite for Diffusion {
    fn size(&self) -> usize {
        1
    }
    fn set_time(&mut self, _t1: f64, _t2: f64) -> ql_core::Result<()> {
        Ok(())
    }
    fn apply(&self, r: &Array) -> Array {
        self.0.apply(r)
    }
    fn apply_mixed(&self, r: &Array) -> Array {
        Array::zeros(r.len())
    }
    fn apply_direction(&self, _direction: usize, r: &Array) -> Array {
        self.0.apply(r)
    }
    fn solve_splitting(&self, _direction: usize, r: &Array, a: f64) -> Array {
        self.0.solve_splitting(r, a, 1.0)
    }
}

fn bench_fd_rollback(c: &mut Criterion) {
    let mesher: Arc<dyn Fdm1dMesher> = Arc::new(Uniform1dMesher::new(-3.0, 3.0, 400).unwrap());
    let mesh = FdmMesherComposite::new(vec![mesher]).unwrap();
    let initial = mesh.locations(0).map(|x| x.max(0.0));
    c.bench_function("fd_douglas_400x200", |b| {
        b.iter(|| {
            let op = Diffusion(SecondDerivativeOp::new(0, &mesh).scale(0.02));
            let mut solver = FdmBackwardSolver::new(
                Box::new(op),
                FdmBoundaryConditionSet::new(),
                CompositeStepCondition::new(),
                FdmSchemeDesc::douglas(),
            );
            let mut values = initial.clone();
            solver.rollback(&mut values, 1.0, 0.0, 200, 0).unwrap();
            black_box(values[200])
        })
    });
}

fn bench_simulation(c: &mut Criterion) {
    let config = McConfig::default().with_samples(100_000).with_antithetic(true);
    c.bench_function("mc_terminal_call_100k", |b| {
        b.iter(|| {
            let outcome = simulate(&config, 1, |z| Ok((100.0 * (0.2 * z[0] - 0.02).exp() - 100.0).max(0.0))).unwrap();
            black_box(outcome.value)
        })
    });
}

criterion_group!(benches, bench_binomial_trees, bench_fd_rollback, bench_simulation);
criterion_main!(benches);
