//! Mobility Options, Reliability & Resilience (§4.8 MORR): five
//! components in `[0, 100]`, weighted-summed.

use crate::{Contributor, SubscoreOutput};
use aucs_params::MorrParams;

/// C₁ frequent-stop exposure: fraction of transit stops within the
/// configured radius whose peak headway beats the frequent-headway
/// threshold.
pub fn frequent_stop_exposure(stop_headways_min: &[f64], frequent_headway_min: f64) -> f64 {
    if stop_headways_min.is_empty() {
        return 0.0;
    }
    let frequent = stop_headways_min.iter().filter(|&&h| h < frequent_headway_min).count();
    100.0 * frequent as f64 / stop_headways_min.len() as f64
}

/// C₂ span: weighted service-hours-per-day at nearby stops, linearly
/// interpolated (24h -> 100, 12h -> 50, 6h -> 25).
pub fn span_score(stop_service_hours: &[f64]) -> f64 {
    if stop_service_hours.is_empty() {
        return 0.0;
    }
    let mean_hours = stop_service_hours.iter().sum::<f64>() / stop_service_hours.len() as f64;
    (mean_hours / 24.0 * 100.0).clamp(0.0, 100.0)
}

/// C₃ on-time reliability: frequency-weighted on-time share, or the
/// schedule-proxy constant when no realtime sample exists (§4.8).
pub fn reliability_score(route_on_time: &[(f64, f64)], schedule_proxy_on_time_share: f64) -> f64 {
    if route_on_time.is_empty() {
        return 100.0 * schedule_proxy_on_time_share;
    }
    let total_weight: f64 = route_on_time.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return 100.0 * schedule_proxy_on_time_share;
    }
    let weighted: f64 = route_on_time.iter().map(|(share, w)| share * w).sum();
    100.0 * (weighted / total_weight)
}

/// C₄ redundancy: `1 − 1/(1 + R_i)` where `R_i` counts distinct transit
/// routes within range plus distinct alternative road paths.
pub fn redundancy_score(distinct_routes: u32, distinct_road_paths: u32) -> f64 {
    let r = (distinct_routes + distinct_road_paths) as f64;
    100.0 * (1.0 - 1.0 / (1.0 + r))
}

/// C₅ micromobility: density of shared-mobility stations within range,
/// already rescaled to `[0, 100]` upstream (min-max across the study
/// area, same pattern as MUHAA's hub access).
pub fn micromobility_score(density_normalized_0_1: f64) -> f64 {
    (density_normalized_0_1 * 100.0).clamp(0.0, 100.0)
}

pub struct MorrComponents {
    pub frequent_stop: f64,
    pub span: f64,
    pub reliability: f64,
    pub redundancy: f64,
    pub micromobility: f64,
}

/// `MORR_i = Σ_k w_k C_k`.
pub fn morr_subscore(components: &MorrComponents, params: &MorrParams) -> SubscoreOutput {
    let value = (params.weight_frequent_stop * components.frequent_stop
        + params.weight_span * components.span
        + params.weight_reliability * components.reliability
        + params.weight_redundancy * components.redundancy
        + params.weight_micromobility * components.micromobility)
        .clamp(0.0, 100.0);

    let contributors = vec![
        Contributor { amenity_id: None, category: Some("frequent_stop".into()), mode: None, time_slice: None, contribution: params.weight_frequent_stop * components.frequent_stop },
        Contributor { amenity_id: None, category: Some("span".into()), mode: None, time_slice: None, contribution: params.weight_span * components.span },
        Contributor { amenity_id: None, category: Some("reliability".into()), mode: None, time_slice: None, contribution: params.weight_reliability * components.reliability },
        Contributor { amenity_id: None, category: Some("redundancy".into()), mode: None, time_slice: None, contribution: params.weight_redundancy * components.redundancy },
        Contributor { amenity_id: None, category: Some("micromobility".into()), mode: None, time_slice: None, contribution: params.weight_micromobility * components.micromobility },
    ];

    SubscoreOutput { value, contributors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> MorrParams {
        MorrParams {
            weight_frequent_stop: 0.3,
            weight_span: 0.2,
            weight_reliability: 0.2,
            weight_redundancy: 0.2,
            weight_micromobility: 0.1,
            frequent_stop_radius_m: 500.0,
            frequent_headway_min: 15.0,
            redundancy_route_radius_m: 800.0,
            micromobility_radius_m: 500.0,
            schedule_proxy_on_time_share: 0.85,
        }
    }

    #[test]
    fn frequent_stop_exposure_fraction() {
        let f = frequent_stop_exposure(&[5.0, 20.0, 10.0, 30.0], 15.0);
        assert!((f - 50.0).abs() < 1e-9);
    }

    #[test]
    fn span_interpolates_linearly() {
        assert!((span_score(&[12.0]) - 50.0).abs() < 1e-9);
        assert!((span_score(&[24.0]) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn reliability_falls_back_to_schedule_proxy() {
        let r = reliability_score(&[], 0.85);
        assert!((r - 85.0).abs() < 1e-9);
    }

    #[test]
    fn redundancy_increases_with_more_options() {
        let low = redundancy_score(0, 0);
        let high = redundancy_score(3, 2);
        assert_eq!(low, 0.0);
        assert!(high > low);
        assert!(high < 100.0);
    }

    #[test]
    fn s5_golden_scenario_frequent_stop_composite() {
        // 10 stops within 500m, 4 with peak headway < 15min -> C1 = 40.
        let headways = [10.0, 12.0, 14.0, 8.0, 20.0, 25.0, 30.0, 18.0, 22.0, 16.0];
        let c1 = frequent_stop_exposure(&headways, 15.0);
        assert!((c1 - 40.0).abs() < 1e-9);

        // 18h average service span -> C2 = 75.
        let c2 = span_score(&[18.0]);
        assert!((c2 - 75.0).abs() < 1e-9);

        // 0.92 on-time share -> C3 = 92.
        let c3 = reliability_score(&[(0.92, 1.0)], 0.85);
        assert!((c3 - 92.0).abs() < 1e-9);

        // 3 distinct routes, no alternate road paths -> R=3 -> C4 = 75.
        let c4 = redundancy_score(3, 0);
        assert!((c4 - 75.0).abs() < 1e-9);

        // No micromobility presence -> C5 = 0.
        let c5 = micromobility_score(0.0);
        assert_eq!(c5, 0.0);

        let components = MorrComponents { frequent_stop: c1, span: c2, reliability: c3, redundancy: c4, micromobility: c5 };
        let equal_weights = MorrParams {
            weight_frequent_stop: 0.2,
            weight_span: 0.2,
            weight_reliability: 0.2,
            weight_redundancy: 0.2,
            weight_micromobility: 0.2,
            frequent_stop_radius_m: 500.0,
            frequent_headway_min: 15.0,
            redundancy_route_radius_m: 800.0,
            micromobility_radius_m: 500.0,
            schedule_proxy_on_time_share: 0.85,
        };
        let out = morr_subscore(&components, &equal_weights);
        assert!((out.value - 56.4).abs() < 1e-9);
    }

    #[test]
    fn morr_weighted_sum_bounded() {
        let components = MorrComponents {
            frequent_stop: 80.0,
            span: 90.0,
            reliability: 85.0,
            redundancy: 60.0,
            micromobility: 40.0,
        };
        let out = morr_subscore(&components, &params());
        assert!((0.0..=100.0).contains(&out.value));
        assert_eq!(out.contributors.len(), 5);
    }
}
