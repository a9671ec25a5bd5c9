//! Criterion benchmarks for model construction and the fork/discard cycle.
//!
//! Models are filled with random variables so the numbers reflect registry
//! and backend bookkeeping, not any particular problem.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use u_hybrid::model::{SolveContext, Strategy};
use u_hybrid::{IntVar, Method, Model, ModelConfig};

// ===========================================================================
// Random models
// ===========================================================================

fn random_model(method: Method, vars: usize, seed: u64) -> Model {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut model = Model::new(ModelConfig::default().with_method(method)).unwrap();
    for i in 0..vars {
        if rng.random_bool(0.5) {
            let var = model.add_bool_var(format!("b{i}")).unwrap();
            if rng.random_bool(0.3) {
                model.negate(var).unwrap();
            }
        } else {
            let lb = rng.random_range(-10..10);
            let ub = lb + rng.random_range(0..20);
            let var = model.add_int_var(lb, ub, format!("x{i}")).unwrap();
            if rng.random_bool(0.2) {
                let value = rng.random_range(lb..=ub);
                model.indicator(var, value).unwrap();
            }
        }
    }
    model
}

/// Forks and discards `rounds` working copies, `depth` deep each.
struct Churn {
    rounds: usize,
    depth: usize,
}

impl Strategy for Churn {
    fn solve(&mut self, ctx: &mut SolveContext<'_>, _: IntVar, _: f64) {
        for _ in 0..self.rounds {
            for _ in 0..self.depth {
                ctx.fork().unwrap();
            }
            while ctx.discard().unwrap() {}
        }
    }
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(20);

    for vars in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(vars), &vars, |b, &vars| {
            b.iter(|| {
                let model = random_model(Method::BranchAndCheck, black_box(vars), 42);
                black_box(model.data().boolean_count())
            })
        });
    }
    group.finish();
}

fn bench_fork_discard(c: &mut Criterion) {
    let mut group = c.benchmark_group("fork_discard");
    group.sample_size(10);

    for (vars, depth) in [(50usize, 1usize), (50, 8), (500, 1), (500, 8)] {
        group.bench_with_input(
            BenchmarkId::new(format!("v{vars}_d{depth}"), vars),
            &(vars, depth),
            |b, &(vars, depth)| {
                let mut model = random_model(Method::BranchAndCheck, vars, 7);
                model.set_strategy(Method::BranchAndCheck, Churn { rounds: 10, depth });
                b.iter(|| {
                    model.minimize(IntVar::ZERO, 3600.0);
                    black_box(model.run_time())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_fork_discard);
criterion_main!(benches);
