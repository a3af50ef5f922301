//! Normalization and composition (component C9): per-subscore percentile
//! or anchor normalization (§4.9), then the final weighted `AUCS_i`
//! composition with the NaN -> unscored-sentinel rule.

use aucs_params::{NormalizationMode, SubscoreWeights};
use aucs_types::{MetroId, SubscoreKind, UnscoredReason};
use std::collections::HashMap;

/// Linear-interpolated percentile (numpy's default `'linear'` method) of
/// an already-sorted, finite-only slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (sorted.len() as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Percentile normalization (§4.9): clip raw to `[P_lo, P_hi]` (computed
/// over the finite values in `raw_values`), linear-map to `[0, 100]`.
/// Values outside the percentile band clamp to the band's edge before
/// mapping, matching "values outside clamp". Non-finite inputs stay NaN.
pub fn normalize_percentile(raw_values: &[f64], p_lo: f64, p_hi: f64) -> Vec<f64> {
    let mut sorted: Vec<f64> = raw_values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let lo_val = percentile(&sorted, p_lo);
    let hi_val = percentile(&sorted, p_hi);

    raw_values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return f64::NAN;
            }
            if (hi_val - lo_val).abs() < 1e-12 {
                return 50.0;
            }
            let clipped = v.clamp(lo_val, hi_val);
            ((clipped - lo_val) / (hi_val - lo_val) * 100.0).clamp(0.0, 100.0)
        })
        .collect()
}

/// Anchor normalization (§4.9): fixed two-point `(raw_lo, raw_hi) -> (0,
/// 100)` mapping, independent of this run's distribution, so scores are
/// comparable across runs and metros.
pub fn normalize_anchor(raw_values: &[f64], raw_lo: f64, raw_hi: f64) -> Vec<f64> {
    let (lo, hi) = (raw_lo.min(raw_hi), raw_lo.max(raw_hi));
    raw_values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return f64::NAN;
            }
            if (hi - lo).abs() < 1e-12 {
                return 50.0;
            }
            let clipped = v.clamp(lo, hi);
            ((clipped - lo) / (hi - lo) * 100.0).clamp(0.0, 100.0)
        })
        .collect()
}

/// Dispatch to [`normalize_percentile`] or [`normalize_anchor`] per the
/// configured mode.
pub fn normalize(raw_values: &[f64], mode: &NormalizationMode) -> Vec<f64> {
    match *mode {
        NormalizationMode::Percentile { p_lo, p_hi } => normalize_percentile(raw_values, p_lo, p_hi),
        NormalizationMode::Anchor { raw_lo, raw_hi } => normalize_anchor(raw_values, raw_lo, raw_hi),
    }
}

/// Percentile normalization computed independently per metro (§4.9:
/// "within each metro (or all-metros if configured)"). Cells with no
/// metro (`None`) form their own group, matching the convention that
/// `None` is a real grouping key, not a sentinel to drop. Anchor mode
/// ignores grouping by construction (the mapping is fixed), so this is
/// only useful for [`NormalizationMode::Percentile`]; anchor callers
/// should use [`normalize`] directly.
pub fn normalize_grouped_by_metro(raw_values: &[f64], metros: &[Option<MetroId>], mode: &NormalizationMode) -> Vec<f64> {
    let mut groups: HashMap<Option<MetroId>, Vec<usize>> = HashMap::new();
    for (i, m) in metros.iter().enumerate() {
        groups.entry(m.clone()).or_default().push(i);
    }

    let mut out = vec![f64::NAN; raw_values.len()];
    for idxs in groups.values() {
        let group_values: Vec<f64> = idxs.iter().map(|&i| raw_values[i]).collect();
        let normalized = normalize(&group_values, mode);
        for (k, &i) in idxs.iter().enumerate() {
            out[i] = normalized[k];
        }
    }
    out
}

/// Outcome of composing one cell's normalized subscores into a final
/// `AUCS_i`.
#[derive(Debug, Clone)]
pub struct CompositionResult {
    pub aucs: Option<f64>,
    pub unscored_reason: Option<UnscoredReason>,
}

/// `AUCS_i = Σ_k w_k · Ŝ_i^k / 100 · 100` (§4.9), i.e. the subscore
/// weights (which sum to 100, §4.1) directly weight the `[0, 100]`
/// subscores. Any NaN subscore makes the whole cell unscored rather than
/// silently dropping a term — NaNs never propagate into a numeric score.
pub fn compose_aucs(normalized_subscores: &HashMap<SubscoreKind, f64>, weights: &SubscoreWeights) -> CompositionResult {
    let mut has_nan = false;
    let mut has_missing = false;
    let mut weighted_sum = 0.0;

    for kind in SubscoreKind::ALL {
        let Some(&value) = normalized_subscores.get(&kind) else {
            has_missing = true;
            continue;
        };
        if value.is_nan() {
            has_nan = true;
            continue;
        }
        weighted_sum += weights.get(kind) * value / 100.0;
    }

    if has_nan {
        return CompositionResult { aucs: None, unscored_reason: Some(UnscoredReason::SubscoreNaN) };
    }
    if has_missing {
        return CompositionResult { aucs: None, unscored_reason: Some(UnscoredReason::NoInputData) };
    }

    CompositionResult {
        aucs: Some(weighted_sum.clamp(0.0, 100.0)),
        unscored_reason: None,
    }
}
