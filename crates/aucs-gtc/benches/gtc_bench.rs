use aucs_gtc::gtc_batch;
use aucs_params::{GtcCoefficients, ModeParams};
use aucs_skim::SkimEntry;
use criterion::{criterion_group, criterion_main, Criterion};

fn mode_params() -> ModeParams {
    ModeParams {
        decay_half_life_min: 15.0,
        beta0: 1.0,
        vot_multiplier: 1.0,
        carry_penalty_min: 2.0,
        ivt_cap_min: 60.0,
    }
}

fn coeffs() -> GtcCoefficients {
    GtcCoefficients {
        alpha_access: 1.2,
        alpha_egress: 1.2,
        alpha_wait: 1.5,
        gamma_transfer: 5.0,
        rho_reliability: 1.0,
    }
}

fn sample_entries(n: usize) -> Vec<SkimEntry> {
    (0..n)
        .map(|i| {
            if i % 37 == 0 {
                SkimEntry::UNREACHABLE
            } else {
                SkimEntry {
                    in_vehicle_min: 10.0 + (i % 40) as f64,
                    access_min: 3.0,
                    egress_min: 2.0,
                    wait_min: 4.0,
                    transfers: (i % 3) as u32,
                    fare: 2.5,
                    reliability_buffer_min: 1.0,
                    reachable: true,
                }
            }
        })
        .collect()
}

fn bench_gtc_batch(c: &mut Criterion) {
    let entries = sample_entries(1_000_000);
    let mode_params = mode_params();
    let coeffs = coeffs();

    c.bench_function("gtc_batch_1m_cells", |b| {
        b.iter(|| gtc_batch(entries.iter().map(|e| (e, 1.0)), &mode_params, &coeffs, 0.2))
    });
}

criterion_group!(benches, bench_gtc_batch);
criterion_main!(benches);
