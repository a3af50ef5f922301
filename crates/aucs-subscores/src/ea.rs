//! Essentials Access (§4.8 EA): seven fixed categories, mean satiated
//! score minus a shortfall penalty for categories below threshold.

use crate::{rank_contributors, Contributor, IdentifiedContribution, SubscoreOutput};
use aucs_aggregate::CategoryResult;
use aucs_params::{CategoryParams, EaParams, EA_CATEGORIES};
use std::collections::BTreeMap;

/// `EA_i = mean_c Ŝ_{i,c} − Shortfall_i`, `Shortfall_i = min(P_max, P_miss
/// · |{c : Ŝ_{i,c} < S_min}|)`, floored at 0 (§4.8).
pub fn ea_subscore(
    category_results: &BTreeMap<String, CategoryResult>,
    category_params: &BTreeMap<String, CategoryParams>,
    contributions: &BTreeMap<String, Vec<IdentifiedContribution>>,
    ea_params: &EaParams,
    top_k: usize,
) -> SubscoreOutput {
    let mut sum_s_hat = 0.0;
    let mut below_min = 0u32;

    for cat in EA_CATEGORIES {
        let result = category_results.get(cat).map(|r| r.s_hat).unwrap_or(0.0);
        sum_s_hat += result;
        let s_min = category_params.get(cat).map(|p| p.s_min).unwrap_or(0.0);
        if result < s_min {
            below_min += 1;
        }
    }
    let mean = sum_s_hat / EA_CATEGORIES.len() as f64;
    let shortfall = (ea_params.p_miss * below_min as f64).min(ea_params.p_max);
    let value = (mean - shortfall).max(0.0);

    let mut pooled: Vec<IdentifiedContribution> = Vec::new();
    for cat in EA_CATEGORIES {
        if let Some(items) = contributions.get(cat) {
            pooled.extend(items.iter().cloned());
        }
    }
    let default_rho = category_params.values().next().map(|p| p.rho).unwrap_or(0.5);
    let contributors: Vec<Contributor> = pooled
        .chunk_by(|a, b| a.category == b.category)
        .flat_map(|group| {
            let rho = category_params.get(&group[0].category).map(|p| p.rho).unwrap_or(default_rho);
            rank_contributors(group, rho, top_k)
        })
        .collect();

    SubscoreOutput { value, contributors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aucs_params::Satiation;
    use aucs_types::{AmenityId, Mode, TimeSliceId};

    fn params(s_min: f64) -> CategoryParams {
        CategoryParams {
            rho: 0.6,
            satiation: Satiation::Fixed { kappa: 0.1 },
            diversity_weight: 0.2,
            diversity_min_mult: 0.8,
            diversity_max_mult: 1.2,
            s_min,
            novelty_weight: 0.0,
            z_cap: 3.0,
            carry_multiplier: 1.0,
        }
    }

    fn result(s_hat: f64) -> CategoryResult {
        CategoryResult {
            v: 1.0,
            s: s_hat,
            entropy: 0.0,
            diversity_multiplier: 1.0,
            s_hat,
        }
    }

    #[test]
    fn all_categories_above_threshold_has_no_shortfall() {
        let mut cat_results = BTreeMap::new();
        let mut cat_params = BTreeMap::new();
        for cat in EA_CATEGORIES {
            cat_results.insert(cat.to_string(), result(80.0));
            cat_params.insert(cat.to_string(), params(40.0));
        }
        let out = ea_subscore(
            &cat_results,
            &cat_params,
            &BTreeMap::new(),
            &EaParams { p_miss: 5.0, p_max: 20.0 },
            5,
        );
        assert!((out.value - 80.0).abs() < 1e-9);
    }

    #[test]
    fn categories_below_threshold_apply_capped_shortfall() {
        let mut cat_results = BTreeMap::new();
        let mut cat_params = BTreeMap::new();
        for cat in EA_CATEGORIES {
            cat_results.insert(cat.to_string(), result(10.0));
            cat_params.insert(cat.to_string(), params(40.0));
        }
        let out = ea_subscore(
            &cat_results,
            &cat_params,
            &BTreeMap::new(),
            &EaParams { p_miss: 5.0, p_max: 20.0 },
            5,
        );
        // mean = 10, all 7 categories below min -> shortfall capped at p_max=20
        assert!((out.value - 0.0).abs() < 1e-9);
    }

    #[test]
    fn s1_golden_scenario_empty_category_shortfall() {
        // grocery/pharmacy/primary_care fall short of s_min=20; the other
        // four categories clear it. mean(0,10,15,40,50,60,70)/7 = 35,
        // shortfall = min(2*3, 8) = 6, value = 35 - 6 = 29.
        let s_hats = [0.0, 10.0, 15.0, 40.0, 50.0, 60.0, 70.0];
        let mut cat_results = BTreeMap::new();
        let mut cat_params = BTreeMap::new();
        for (cat, s_hat) in EA_CATEGORIES.iter().zip(s_hats.iter()) {
            cat_results.insert(cat.to_string(), result(*s_hat));
            cat_params.insert(cat.to_string(), params(20.0));
        }
        let out = ea_subscore(
            &cat_results,
            &cat_params,
            &BTreeMap::new(),
            &EaParams { p_miss: 2.0, p_max: 8.0 },
            5,
        );
        assert!((out.value - 29.0).abs() < 1e-9);
    }

    #[test]
    fn contributors_are_ranked_within_category() {
        let mut contributions = BTreeMap::new();
        contributions.insert(
            "grocery".to_string(),
            vec![
                IdentifiedContribution {
                    amenity_id: AmenityId(1),
                    category: "grocery".into(),
                    mode: Mode::Walk,
                    time_slice: TimeSliceId("am_peak".into()),
                    quality: 90.0,
                    weight: 0.9,
                },
                IdentifiedContribution {
                    amenity_id: AmenityId(2),
                    category: "grocery".into(),
                    mode: Mode::Car,
                    time_slice: TimeSliceId("am_peak".into()),
                    quality: 30.0,
                    weight: 0.2,
                },
            ],
        );
        let mut cat_results = BTreeMap::new();
        let mut cat_params = BTreeMap::new();
        for cat in EA_CATEGORIES {
            cat_results.insert(cat.to_string(), result(70.0));
            cat_params.insert(cat.to_string(), params(40.0));
        }
        let out = ea_subscore(
            &cat_results,
            &cat_params,
            &contributions,
            &EaParams { p_miss: 5.0, p_max: 20.0 },
            5,
        );
        assert_eq!(out.contributors[0].amenity_id, Some(AmenityId(1)));
    }
}
