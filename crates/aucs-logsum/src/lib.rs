//! Logsum kernel (component C5): nested-logit accessibility weight
//! `w_{i,a}`, fixed two-level topology (non-motorized, transit, car),
//! time-slice weighted (§4.5).

use aucs_params::NestParamSet;
use aucs_types::{Mode, Minutes, NestId};
use std::collections::HashMap;

/// Numerically stable log-sum-exp: `max + ln(sum(exp(x - max)))`. Returns
/// `-infinity` when every input is `-infinity` (§4.5 "when all modes are
/// unreachable, w_{i,a} = 0 by definition" falls out of this naturally:
/// `exp(-infinity) == 0.0`).
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = xs.iter().map(|&x| (x - max).exp()).sum();
    max + sum.ln()
}

/// `U_m = -GTC_m / θ_n` for every mode present in `gtc_by_mode`, grouped by
/// nest, then `I_n = θ_n * log Σ_{m∈n} exp(U_m / θ_n)` per §4.5. Modes
/// absent from `gtc_by_mode` are treated as unreachable (GTC = +infinity).
pub fn nest_inclusive_values(gtc_by_mode: &HashMap<Mode, Minutes>, nests: &NestParamSet) -> HashMap<NestId, f64> {
    let mut by_nest: HashMap<NestId, Vec<f64>> = HashMap::new();
    for nest in NestId::ALL {
        by_nest.insert(nest, Vec::new());
    }
    for mode in Mode::ALL {
        let gtc = gtc_by_mode.get(&mode).copied().unwrap_or(f64::INFINITY);
        let nest = NestId::of_mode(mode);
        let theta = nests.get(nest);
        let u_m = -gtc / theta;
        by_nest.get_mut(&nest).unwrap().push(u_m / theta);
    }

    let mut out = HashMap::new();
    for nest in NestId::ALL {
        let theta = nests.get(nest);
        let args = &by_nest[&nest];
        out.insert(nest, theta * log_sum_exp(args));
    }
    out
}

/// The outer nest choice: `W_{i,a,tau} = log Σ_n exp(I_n)`.
pub fn outer_logsum(inclusive_values: &HashMap<NestId, f64>) -> f64 {
    let args: Vec<f64> = NestId::ALL.iter().map(|n| inclusive_values[n]).collect();
    log_sum_exp(&args)
}

/// One time-slice's `GTC` per mode, paired with that slice's weight
/// `w_tau`.
pub struct SliceGtc {
    pub weight: f64,
    pub gtc_by_mode: HashMap<Mode, Minutes>,
}

/// `w_{i,a} = Σ_τ w_τ · exp(W_{i,a,τ})` (§4.5), clamped to `[0, 1]` to
/// guarantee the logsum-bounds invariant (§8 invariant 2) holds even under
/// pathological parameter combinations where the raw weighted sum would
/// slightly overshoot 1 (e.g. more than one mode simultaneously at
/// near-zero cost).
pub fn accessibility_weight(slices: &[SliceGtc], nests: &NestParamSet) -> f64 {
    let mut total = 0.0;
    for slice in slices {
        let inclusive = nest_inclusive_values(&slice.gtc_by_mode, nests);
        let w = outer_logsum(&inclusive);
        total += slice.weight * w.exp();
    }
    total.clamp(0.0, 1.0)
}
