//! Major Urban Hub & Airport Access (§4.8 MUHAA): gravity access to hub
//! centroids and airports, each normalized to `[0, 100]` across the study
//! area before blending.

use crate::min_max_rescale;
use aucs_params::HubsAirportsParams;
use aucs_types::CellId;

/// One hub's raw mass inputs, already present as per-hub rows (before the
/// cross-hub min-max rescale §4.8 requires: "Hub mass `M_h = w_pop·pop̃ +
/// w_gdp·gdp̃ + w_poi·poĩ + w_culture·cult̃`").
#[derive(Debug, Clone)]
pub struct HubRaw {
    pub hub_id: u64,
    pub pop: f64,
    pub gdp: f64,
    pub poi_count: f64,
    pub culture_index: f64,
}

/// `M_h` for every hub in the run, after rescaling pop/gdp/poi/culture
/// independently across the full hub set.
pub fn hub_masses(hubs: &[HubRaw], params: &HubsAirportsParams) -> Vec<f64> {
    let pop: Vec<f64> = hubs.iter().map(|h| h.pop).collect();
    let gdp: Vec<f64> = hubs.iter().map(|h| h.gdp).collect();
    let poi: Vec<f64> = hubs.iter().map(|h| h.poi_count).collect();
    let culture: Vec<f64> = hubs.iter().map(|h| h.culture_index).collect();
    let pop_r = min_max_rescale(&pop);
    let gdp_r = min_max_rescale(&gdp);
    let poi_r = min_max_rescale(&poi);
    let culture_r = min_max_rescale(&culture);

    (0..hubs.len())
        .map(|i| {
            params.weight_pop * pop_r[i]
                + params.weight_gdp * gdp_r[i]
                + params.weight_poi * poi_r[i]
                + params.weight_culture * culture_r[i]
        })
        .collect()
}

/// `A_h_i = Σ_h M_h · exp(−α_hub · GTC*_{i,h})` with `GTC* = min(car,
/// transit)` for this cell, over every hub (§4.8).
pub fn hub_access_raw(cell_gtc_to_hubs: &[(f64, f64)], masses: &[f64], alpha_hub: f64) -> f64 {
    cell_gtc_to_hubs
        .iter()
        .zip(masses)
        .map(|(&(car, transit), &mass)| {
            let gtc_star = car.min(transit);
            mass * (-alpha_hub * gtc_star).exp()
        })
        .sum()
}

/// Airport access uses enplanements in place of hub mass; same gravity
/// form (§4.8: "Airport access uses enplanement weight in place of
/// mass").
pub fn airport_access_raw(cell_gtc_to_airports: &[(f64, f64)], enplanements: &[f64], alpha_hub: f64) -> f64 {
    hub_access_raw(cell_gtc_to_airports, enplanements, alpha_hub)
}

/// One cell's MUHAA components, published for explainability.
#[derive(Debug, Clone)]
pub struct MuhaaResult {
    pub cell_id: CellId,
    pub value: f64,
    pub hub_access_normalized: f64,
    pub airport_access_normalized: f64,
}

/// Rescale raw hub/airport access to `[0, 100]` across every cell in the
/// run, then blend by `w_hub`/`w_air`. Requires the full per-cell raw
/// vectors since the rescale is study-area-wide, not per-cell (§4.8:
/// "after each term is normalized to [0, 100]").
pub fn muhaa_batch(
    cell_ids: &[CellId],
    hub_access_raw_values: &[f64],
    airport_access_raw_values: &[f64],
    params: &HubsAirportsParams,
) -> Vec<MuhaaResult> {
    let hub_norm = min_max_rescale(hub_access_raw_values);
    let air_norm = min_max_rescale(airport_access_raw_values);

    cell_ids
        .iter()
        .enumerate()
        .map(|(i, &cell_id)| {
            let hub_100 = hub_norm[i] * 100.0;
            let air_100 = air_norm[i] * 100.0;
            let value = (params.hub_weight * hub_100 + params.air_weight * air_100).clamp(0.0, 100.0);
            MuhaaResult {
                cell_id,
                value,
                hub_access_normalized: hub_100,
                airport_access_normalized: air_100,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> HubsAirportsParams {
        HubsAirportsParams {
            weight_pop: 0.4,
            weight_gdp: 0.3,
            weight_poi: 0.2,
            weight_culture: 0.1,
            alpha_hub: 0.05,
            hub_weight: 0.7,
            air_weight: 0.3,
        }
    }

    #[test]
    fn hub_masses_bounded_in_0_1() {
        let hubs = vec![
            HubRaw { hub_id: 1, pop: 1_000_000.0, gdp: 50.0, poi_count: 200.0, culture_index: 0.9 },
            HubRaw { hub_id: 2, pop: 200_000.0, gdp: 10.0, poi_count: 20.0, culture_index: 0.2 },
        ];
        let masses = hub_masses(&hubs, &params());
        for m in masses {
            assert!((0.0..=1.0).contains(&m));
        }
    }

    #[test]
    fn closer_hub_access_weakly_exceeds_farther() {
        let masses = vec![1.0];
        let near = hub_access_raw(&[(5.0, 10.0)], &masses, 0.05);
        let far = hub_access_raw(&[(50.0, 60.0)], &masses, 0.05);
        assert!(near >= far);
    }

    #[test]
    fn muhaa_batch_bounded_and_blended() {
        let cells = vec![CellId(1), CellId(2), CellId(3)];
        let hub_raw = vec![0.0, 5.0, 10.0];
        let air_raw = vec![0.0, 0.0, 2.0];
        let results = muhaa_batch(&cells, &hub_raw, &air_raw, &params());
        assert_eq!(results.len(), 3);
        for r in &results {
            assert!((0.0..=100.0).contains(&r.value));
        }
        // highest raw hub+air access cell should score highest
        assert!(results[2].value >= results[0].value);
    }
}
