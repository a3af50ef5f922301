use aucs_aggregate::{aggregate_category, AmenityContribution};
use aucs_params::{CategoryParams, Satiation};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn category_params() -> CategoryParams {
    CategoryParams {
        rho: 0.6,
        satiation: Satiation::Fixed { kappa: 0.05 },
        diversity_weight: 0.15,
        diversity_min_mult: 0.9,
        diversity_max_mult: 1.1,
        s_min: 40.0,
        novelty_weight: 0.0,
        z_cap: 3.0,
        carry_multiplier: 1.0,
    }
}

fn sample_items(n: usize) -> Vec<AmenityContribution> {
    let subtypes = ["cafe", "grocer", "pharmacy", "bakery"];
    (0..n)
        .map(|i| AmenityContribution {
            subtype: subtypes[i % subtypes.len()].to_string(),
            quality: 40.0 + (i % 60) as f64,
            weight: 0.1 + (i % 10) as f64 / 10.0,
        })
        .collect()
}

fn bench_aggregate_category(c: &mut Criterion) {
    let params = category_params();
    let items = sample_items(20);

    c.bench_function("aggregate_category_1m_cells", |b| {
        b.iter(|| {
            for _ in 0..1_000_000 {
                black_box(aggregate_category(&items, &params));
            }
        })
    });
}

criterion_group!(benches, bench_aggregate_category);
criterion_main!(benches);
