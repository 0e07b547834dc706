use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use millgen_core::dynamics::second_order;
use millgen_core::gain::curve;
use millgen_core::{CurveModel, GainTerm};

fn term(model: CurveModel, order: f64) -> GainTerm {
    GainTerm {
        variable: "MV_PressLoad".into(),
        weight: 50.0,
        asymptote: Some(700.0),
        order,
        slope: 4.0,
        model,
        direction: 1.0,
        shape: 0.5,
    }
}

// Sweep across the input range, including values outside it
fn sweep(n: usize) -> Vec<f64> {
    (0..n).map(|i| 300.0 + 900.0 * i as f64 / n as f64).collect()
}

fn bench_curves(c: &mut Criterion) {
    let xs = sweep(4096);
    for (label, t) in [
        ("polynomial", term(CurveModel::Polynomial, 2.0)),
        ("exponential", term(CurveModel::Exponential, 1.5)),
        ("sigmoid", term(CurveModel::Sigmoid, 1.0)),
    ] {
        c.bench_function(&format!("curve_{label}_4096"), |b| {
            b.iter(|| {
                let mut acc = 0.0;
                for &x in &xs {
                    acc += curve(black_box(&t), x, 400.0, 1000.0);
                }
                black_box(acc)
            });
        });
    }
}

fn bench_filter(c: &mut Criterion) {
    c.bench_function("second_order_4096_steps", |b| {
        b.iter_batched(
            || (0.0_f64, 0.0_f64),
            |(mut s1, mut s2)| {
                for i in 0..4096 {
                    let input = if i < 2048 { 1.0 } else { 0.0 };
                    let out = second_order(black_box(input), s1, s2, 0.1, 0.2);
                    s2 = s1;
                    s1 = out;
                }
                black_box(s1)
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_curves, bench_filter);
criterion_main!(benches);
