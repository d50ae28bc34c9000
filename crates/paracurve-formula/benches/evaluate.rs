//! Benchmarks for formula compilation and evaluation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use paracurve_formula::{compile, evaluate, Bindings, FormulaCache};

const FORMULA: &str = "(a+b*cos(c*t))*cos(t)";

fn bindings(t: f64) -> Bindings {
    Bindings::from([("a", 37.0), ("b", 1.0), ("c", 2.0), ("t", t)])
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile", |b| b.iter(|| compile(black_box(FORMULA))));
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let vars = bindings(0.5);

    group.bench_function("uncached", |b| {
        b.iter(|| evaluate(black_box(FORMULA), &vars))
    });

    let stream = compile(FORMULA).expect("benchmark formula compiles");
    group.bench_function("precompiled", |b| b.iter(|| stream.evaluate(black_box(&vars))));

    let mut cache = FormulaCache::new();
    group.bench_function("cached", |b| {
        b.iter(|| cache.evaluate(black_box(FORMULA), &vars))
    });

    group.finish();
}

criterion_group!(benches, bench_compile, bench_evaluate);
criterion_main!(benches);
