use aucs_logsum::{accessibility_weight, SliceGtc};
use aucs_params::NestParamSet;
use aucs_types::Mode;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;

fn nests() -> NestParamSet {
    NestParamSet { non_motorized: 0.5, transit: 0.7, car: 0.5 }
}

fn sample_slices(n: usize) -> Vec<SliceGtc> {
    (0..n)
        .map(|i| {
            let mut gtc_by_mode = HashMap::new();
            gtc_by_mode.insert(Mode::Walk, 15.0 + (i % 10) as f64);
            gtc_by_mode.insert(Mode::Bike, 10.0 + (i % 8) as f64);
            gtc_by_mode.insert(Mode::Transit, 20.0 + (i % 12) as f64);
            gtc_by_mode.insert(Mode::Car, 8.0 + (i % 6) as f64);
            SliceGtc { weight: 1.0 / n as f64, gtc_by_mode }
        })
        .collect()
}

fn bench_accessibility_weight(c: &mut Criterion) {
    let nests = nests();
    let slices = sample_slices(4);

    c.bench_function("accessibility_weight_1m_cells", |b| {
        b.iter(|| {
            for _ in 0..1_000_000 {
                black_box(accessibility_weight(&slices, &nests));
            }
        })
    });
}

criterion_group!(benches, bench_accessibility_weight);
criterion_main!(benches);
