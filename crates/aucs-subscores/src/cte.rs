//! Corridor Trip-Chaining Enrichment (§4.8 CTE): score allowed
//! category-pair chains along a cell's top transit itineraries, penalized
//! by detour time.

use crate::{Contributor, SubscoreOutput};
use aucs_params::CorridorParams;

/// One candidate two-stop chain: the `Q·w` contribution of each of its two
/// amenities and the extra time `Δ` (minutes) versus the direct itinerary.
#[derive(Debug, Clone)]
pub struct ChainCandidate {
    pub first_category: String,
    pub second_category: String,
    pub first_contribution: f64,
    pub second_contribution: f64,
    pub delta_min: f64,
}

fn is_whitelisted(pair_whitelist: &[(String, String)], a: &str, b: &str) -> bool {
    pair_whitelist
        .iter()
        .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
}

/// Score one chain: `(Q·w_first + Q·w_second) / (1 + Δ/Δ_max)`.
fn chain_score(chain: &ChainCandidate, delta_max_min: f64) -> f64 {
    let raw = chain.first_contribution + chain.second_contribution;
    raw / (1.0 + chain.delta_min.max(0.0) / delta_max_min)
}

/// Filter to whitelisted category pairs, score, sort descending, keep the
/// top `top_k`, sum, and clip to `[0, 100]` (§4.8: "Take top-K chains,
/// clip, normalize").
pub fn cte_subscore(candidates: &[ChainCandidate], params: &CorridorParams) -> SubscoreOutput {
    let mut scored: Vec<(f64, &ChainCandidate)> = candidates
        .iter()
        .filter(|c| is_whitelisted(&params.pair_whitelist, &c.first_category, &c.second_category))
        .map(|c| (chain_score(c, params.delta_max_min), c))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(params.top_k);

    let value = scored.iter().map(|(s, _)| s).sum::<f64>().clamp(0.0, 100.0);
    let contributors = scored
        .into_iter()
        .map(|(s, c)| Contributor {
            amenity_id: None,
            category: Some(format!("{}+{}", c.first_category, c.second_category)),
            mode: None,
            time_slice: None,
            contribution: s,
        })
        .collect();

    SubscoreOutput { value, contributors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CorridorParams {
        CorridorParams {
            delta_max_min: 10.0,
            stop_buffer_m: 350.0,
            pair_whitelist: vec![("grocery".to_string(), "pharmacy".to_string())],
            top_k: 3,
        }
    }

    fn candidate(a: &str, b: &str, delta: f64) -> ChainCandidate {
        ChainCandidate {
            first_category: a.to_string(),
            second_category: b.to_string(),
            first_contribution: 40.0,
            second_contribution: 30.0,
            delta_min: delta,
        }
    }

    #[test]
    fn non_whitelisted_pairs_are_excluded() {
        let candidates = vec![candidate("grocery", "bank_atm", 0.0)];
        let out = cte_subscore(&candidates, &params());
        assert_eq!(out.value, 0.0);
    }

    #[test]
    fn larger_detour_weakly_decreases_chain_score() {
        let near = candidate("grocery", "pharmacy", 0.0);
        let far = candidate("grocery", "pharmacy", 20.0);
        let p = params();
        let s_near = chain_score(&near, p.delta_max_min);
        let s_far = chain_score(&far, p.delta_max_min);
        assert!(s_near >= s_far);
    }

    #[test]
    fn keeps_only_top_k_chains() {
        let mut candidates = Vec::new();
        for i in 0..5 {
            candidates.push(candidate("grocery", "pharmacy", i as f64));
        }
        let out = cte_subscore(&candidates, &params());
        assert_eq!(out.contributors.len(), 3);
    }
}
