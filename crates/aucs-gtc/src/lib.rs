//! GTC kernel (component C4): composes in-vehicle time, wait, transfers,
//! reliability buffer, fare-to-time, carry penalty, and mode constant into
//! a single generalized cost per (origin, amenity, mode, time-slice).
//!
//! Stateless and pure (§5 "Kernels ... are pure, run to completion per
//! partition, and never yield"): every function here takes its inputs by
//! value/reference and returns a value, with no shared mutable state.

use aucs_params::{GtcCoefficients, ModeParams};
use aucs_skim::SkimEntry;
use aucs_types::Minutes;

#[inline]
fn clamp_nonneg(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Compute `GTC` for a single (origin, amenity, mode, time-slice) cell
/// (§4.4). Unreachable entries propagate as `+infinity`; every additive
/// component is clamped to zero before summation so a negative skim value
/// (a routing-collaborator bug) never reduces cost (§4.4 numeric rules).
pub fn gtc(
    entry: &SkimEntry,
    mode_params: &ModeParams,
    coeffs: &GtcCoefficients,
    carry_multiplier: f64,
    value_of_time_per_min: f64,
) -> Minutes {
    if !entry.reachable {
        return f64::INFINITY;
    }

    let ivt = clamp_nonneg(entry.in_vehicle_min).min(mode_params.ivt_cap_min);
    let access = clamp_nonneg(entry.access_min);
    let egress = clamp_nonneg(entry.egress_min);
    let wait = clamp_nonneg(entry.wait_min);
    let transfers = entry.transfers as f64;
    let reliability_buffer = clamp_nonneg(entry.reliability_buffer_min);
    let fare_to_time = if value_of_time_per_min > 0.0 {
        clamp_nonneg(entry.fare) / value_of_time_per_min
    } else {
        0.0
    };
    let carry_penalty = mode_params.carry_penalty_min.max(0.0) * carry_multiplier.max(0.0);

    let total = ivt
        + coeffs.alpha_access * access
        + coeffs.alpha_egress * egress
        + coeffs.alpha_wait * wait
        + coeffs.gamma_transfer * transfers
        + coeffs.rho_reliability * reliability_buffer
        + fare_to_time
        + carry_penalty
        + mode_params.beta0;

    // §8 invariant 1 requires GTC >= 0 for reachable entries regardless of
    // how a parameter author signs beta0.
    total.max(0.0)
}

/// Outcome of running [`gtc`] over a batch of rows sharing one mode,
/// carrying the unreachable count the driver folds into the stage's
/// [`aucs_contracts::manifest::QaReport`].
#[derive(Debug, Clone)]
pub struct GtcBatch {
    pub values: Vec<Minutes>,
    pub unreachable_count: u64,
}

/// Vectorized form of [`gtc`] over `(entry, carry_multiplier)` pairs for a
/// single mode and time-slice (§4.4: "stateless and vectorized over
/// (i, a, τ) per mode").
pub fn gtc_batch<'a>(
    entries: impl Iterator<Item = (&'a SkimEntry, f64)>,
    mode_params: &ModeParams,
    coeffs: &GtcCoefficients,
    value_of_time_per_min: f64,
) -> GtcBatch {
    let mut values = Vec::new();
    let mut unreachable_count = 0u64;
    for (entry, carry_multiplier) in entries {
        if !entry.reachable {
            unreachable_count += 1;
        }
        values.push(gtc(entry, mode_params, coeffs, carry_multiplier, value_of_time_per_min));
    }
    GtcBatch {
        values,
        unreachable_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
            alpha_access: 1.0,
            alpha_egress: 1.0,
            alpha_wait: 1.5,
            gamma_transfer: 5.0,
            rho_reliability: 0.5,
        }
    }

    fn reachable_entry() -> SkimEntry {
        SkimEntry {
            in_vehicle_min: 10.0,
            access_min: 2.0,
            egress_min: 1.0,
            wait_min: 3.0,
            transfers: 1,
            fare: 2.5,
            reliability_buffer_min: 1.0,
            reachable: true,
        }
    }

    #[test]
    fn unreachable_is_infinite() {
        let g = gtc(&SkimEntry::UNREACHABLE, &mode_params(), &coeffs(), 1.0, 0.25);
        assert!(g.is_infinite());
    }

    #[test]
    fn reachable_entry_is_finite_and_nonnegative() {
        let g = gtc(&reachable_entry(), &mode_params(), &coeffs(), 1.0, 0.25);
        assert!(g.is_finite());
        assert!(g >= 0.0);
    }

    #[test]
    fn monotonic_in_wait_time() {
        let mp = mode_params();
        let c = coeffs();
        let mut low = reachable_entry();
        let mut high = reachable_entry();
        high.wait_min = low.wait_min + 5.0;
        let g_low = gtc(&low, &mp, &c, 1.0, 0.25);
        let g_high = gtc(&high, &mp, &c, 1.0, 0.25);
        assert!(g_high >= g_low);
        low.wait_min = -10.0; // clamped to 0, should match a zero-wait baseline
        let g_clamped = gtc(&low, &mp, &c, 1.0, 0.25);
        let mut zero_wait = reachable_entry();
        zero_wait.wait_min = 0.0;
        let g_zero = gtc(&zero_wait, &mp, &c, 1.0, 0.25);
        assert!((g_clamped - g_zero).abs() < 1e-9);
    }

    #[test]
    fn ivt_cap_bounds_pathological_routes() {
        let mp = mode_params();
        let c = coeffs();
        let mut entry = reachable_entry();
        entry.in_vehicle_min = 10_000.0;
        let capped = gtc(&entry, &mp, &c, 1.0, 0.25);
        entry.in_vehicle_min = mp.ivt_cap_min;
        let at_cap = gtc(&entry, &mp, &c, 1.0, 0.25);
        assert!((capped - at_cap).abs() < 1e-9);
    }

    #[test]
    fn batch_counts_unreachable_rows() {
        let mp = mode_params();
        let c = coeffs();
        let entries = vec![reachable_entry(), SkimEntry::UNREACHABLE, reachable_entry()];
        let pairs: Vec<(&SkimEntry, f64)> = entries.iter().map(|e| (e, 1.0)).collect();
        let batch = gtc_batch(pairs.into_iter(), &mp, &c, 0.25);
        assert_eq!(batch.unreachable_count, 1);
        assert_eq!(batch.values.len(), 3);
        assert!(batch.values[1].is_infinite());
    }
}
