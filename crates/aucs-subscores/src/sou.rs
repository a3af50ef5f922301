//! Seasonal Outdoors Usability (§4.8 SOU): CES base over parks/trails,
//! scaled by an annual climate-comfort scalar.

use crate::{min_max_rescale, Contributor, SubscoreOutput};
use aucs_params::SeasonalityParams;

/// One month's raw climate normals for a cell (§4.7: "Climate scalar per
/// month `σ_m = temp̃_m · precip̃_m · wind̃_m`").
#[derive(Debug, Clone, Copy)]
pub struct MonthClimate {
    pub temp_f: f64,
    pub precip_in: f64,
    pub wind_mph: f64,
}

/// Rescale a value into `[0, 1]` where `1` is ideal and `0` is at or past
/// the threshold, for the "lower is better, capped" normals (precip,
/// wind).
fn threshold_rescale(value: f64, max_acceptable: f64) -> f64 {
    if max_acceptable <= 0.0 {
        return 0.0;
    }
    (1.0 - value / max_acceptable).clamp(0.0, 1.0)
}

/// Rescale temperature into `[0, 1]` via distance from the comfortable
/// band: `1` inside `[lo, hi]`, falling off linearly outside by the same
/// span as the band's half-width.
fn temp_rescale(temp_f: f64, lo: f64, hi: f64) -> f64 {
    if temp_f >= lo && temp_f <= hi {
        return 1.0;
    }
    let half_width = (hi - lo).max(1.0) / 2.0;
    let distance = if temp_f < lo { lo - temp_f } else { temp_f - hi };
    (1.0 - distance / half_width).clamp(0.0, 1.0)
}

/// `σ_m` for one month.
pub fn month_comfort_scalar(climate: &MonthClimate, params: &SeasonalityParams) -> f64 {
    let temp = temp_rescale(climate.temp_f, params.comfortable_temp_lo_f, params.comfortable_temp_hi_f);
    let precip = threshold_rescale(climate.precip_in, params.precip_max_in_per_day);
    let wind = threshold_rescale(climate.wind_mph, params.wind_max_mph);
    temp * precip * wind
}

/// `σ_out = Σ_m w_m · σ_m`.
pub fn annual_comfort_scalar(monthly_climate: &[MonthClimate; 12], params: &SeasonalityParams) -> f64 {
    monthly_climate
        .iter()
        .zip(params.month_weights.iter())
        .map(|(climate, &w)| w * month_comfort_scalar(climate, params))
        .sum()
}

/// One park/trail's quality contribution (area and designation, already
/// folded into a single size-like metric upstream).
#[derive(Debug, Clone)]
pub struct ParkContribution {
    pub park_id: u64,
    pub area_acres: f64,
    pub designation_quality: f64,
}

/// `Parks_i`: CES-style aggregate of area-weighted designation quality,
/// min-max rescaled across the cell's parks and summed (mirrors the
/// per-category aggregate shape of C7 without amenity accessibility
/// weights, since parks access here is presence-within-cell, not a
/// travel-cost kernel).
pub fn parks_score(parks: &[ParkContribution]) -> f64 {
    if parks.is_empty() {
        return 0.0;
    }
    let areas: Vec<f64> = parks.iter().map(|p| p.area_acres).collect();
    let area_r = min_max_rescale(&areas);
    let composite: f64 = parks
        .iter()
        .zip(area_r.iter())
        .map(|(p, &a)| a * p.designation_quality)
        .sum::<f64>()
        / parks.len() as f64;
    (composite * 100.0).clamp(0.0, 100.0)
}

/// `SOU_i = Parks_i · σ_out`; cells with no parks score 0 (§4.7).
pub fn sou_subscore(parks: &[ParkContribution], monthly_climate: &[MonthClimate; 12], params: &SeasonalityParams) -> SubscoreOutput {
    if parks.is_empty() {
        return SubscoreOutput { value: 0.0, contributors: Vec::new() };
    }
    let parks_base = parks_score(parks);
    let sigma_out = annual_comfort_scalar(monthly_climate, params);
    let value = (parks_base * sigma_out).clamp(0.0, 100.0);

    let contributors = parks
        .iter()
        .map(|p| Contributor {
            amenity_id: None,
            category: Some(format!("park:{}", p.park_id)),
            mode: None,
            time_slice: None,
            contribution: p.area_acres * p.designation_quality,
        })
        .collect();

    SubscoreOutput { value, contributors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SeasonalityParams {
        SeasonalityParams {
            month_weights: [1.0 / 12.0; 12],
            comfortable_temp_lo_f: 50.0,
            comfortable_temp_hi_f: 80.0,
            precip_max_in_per_day: 0.5,
            wind_max_mph: 15.0,
        }
    }

    #[test]
    fn no_parks_scores_zero() {
        let out = sou_subscore(&[], &[MonthClimate { temp_f: 65.0, precip_in: 0.0, wind_mph: 5.0 }; 12], &params());
        assert_eq!(out.value, 0.0);
    }

    #[test]
    fn ideal_month_has_full_comfort_scalar() {
        let ideal = MonthClimate { temp_f: 65.0, precip_in: 0.0, wind_mph: 0.0 };
        let sigma = month_comfort_scalar(&ideal, &params());
        assert!((sigma - 1.0).abs() < 1e-9);
    }

    #[test]
    fn extreme_month_has_low_comfort_scalar() {
        let harsh = MonthClimate { temp_f: 10.0, precip_in: 2.0, wind_mph: 40.0 };
        let sigma = month_comfort_scalar(&harsh, &params());
        assert!(sigma < 0.1);
    }

    #[test]
    fn s6_golden_scenario_harsh_winter_gating() {
        // A single park whose rescaled area is flat at 0.5 and whose
        // designation quality drives the composite to a base score of 80.
        let parks = vec![ParkContribution { park_id: 1, area_acres: 20.0, designation_quality: 1.6 }];
        assert!((parks_score(&parks) - 80.0).abs() < 1e-9);

        // Every month sits at the comfortable temp and has no precip, but
        // wind is exactly half of the max-acceptable threshold, so sigma_m
        // = 1 * 1 * 0.5 = 0.5 for all twelve months -> sigma_out = 0.5.
        let harsh_winter = MonthClimate { temp_f: 65.0, precip_in: 0.0, wind_mph: 7.5 };
        let monthly = [harsh_winter; 12];
        let out = sou_subscore(&parks, &monthly, &params());
        assert!((out.value - 40.0).abs() < 1e-9);

        // A cell with no parks scores 0 regardless of how favorable the
        // climate scalar is.
        let no_parks = sou_subscore(&[], &monthly, &params());
        assert_eq!(no_parks.value, 0.0);
    }

    #[test]
    fn sou_bounded_in_0_100() {
        let parks = vec![
            ParkContribution { park_id: 1, area_acres: 50.0, designation_quality: 0.9 },
            ParkContribution { park_id: 2, area_acres: 5.0, designation_quality: 0.5 },
        ];
        let monthly = [MonthClimate { temp_f: 65.0, precip_in: 0.0, wind_mph: 5.0 }; 12];
        let out = sou_subscore(&parks, &monthly, &params());
        assert!((0.0..=100.0).contains(&out.value));
    }
}
