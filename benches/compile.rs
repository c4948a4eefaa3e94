use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use state_enforcer::codegen::{
    compile, render_dot, FunctionName, ModelBuilder, Options, StateName, StructuredModel, Target,
};

/// Ring of `states` states where every state offers `fanout` functions.
fn ring(states: usize, fanout: usize) -> StructuredModel {
    let mut builder = ModelBuilder::new();
    for s in 0..states {
        for f in 0..fanout {
            let from = StateName::new(format!("S{s}")).unwrap();
            let to = StateName::new(format!("S{}", (s + f + 1) % states)).unwrap();
            let fnc = FunctionName::new(format!("F{f}")).unwrap();
            builder.transition(from, fnc, to).unwrap();
        }
    }
    builder.build()
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for states in [4usize, 32, 255] {
        let model = ring(states, 8);
        for (label, target) in [("java", Target::JavaCard), ("rust", Target::Rust)] {
            let options = Options {
                target,
                ..Options::default()
            };
            group.bench_with_input(BenchmarkId::new(label, states), &model, |b, model| {
                b.iter(|| compile(model, &options).unwrap());
            });
        }
        group.bench_with_input(BenchmarkId::new("dot", states), &model, |b, model| {
            b.iter(|| render_dot(model, "ring.yml"));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
