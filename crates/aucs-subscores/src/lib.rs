//! Subscore modules (component C8). Each module follows the shared
//! structure described in §4.8: select an amenity set, compute `w_{i,a}`
//! and `Q_a` upstream (C4-C6), aggregate via CES/satiation/diversity (C7),
//! then apply the subscore-specific composition implemented here.

pub mod cte;
pub mod ea;
pub mod jea;
pub mod lca;
pub mod morr;
pub mod muhaa;
pub mod sou;

use aucs_types::{AmenityId, Mode, TimeSliceId};

/// One row of a subscore's contributor table (§4.8: "Every subscore
/// module emits, alongside the scalar, a contributor table with at least
/// (amenity id, category, chosen mode, chosen time-slice, Q·w
/// contribution)").
#[derive(Debug, Clone)]
pub struct Contributor {
    pub amenity_id: Option<AmenityId>,
    pub category: Option<String>,
    pub mode: Option<Mode>,
    pub time_slice: Option<TimeSliceId>,
    pub contribution: f64,
}

/// A subscore's scalar value plus its contributor table, ready for the
/// explainability stage (C10).
#[derive(Debug, Clone)]
pub struct SubscoreOutput {
    pub value: f64,
    pub contributors: Vec<Contributor>,
}

/// A single amenity's raw inputs to a category aggregate, carrying the
/// identifiers a contributor table needs that [`aucs_aggregate::AmenityContribution`]
/// deliberately omits (it is shared with the pure C7 kernel and stays
/// identifier-free).
#[derive(Debug, Clone)]
pub struct IdentifiedContribution {
    pub amenity_id: AmenityId,
    pub category: String,
    pub mode: Mode,
    pub time_slice: TimeSliceId,
    pub quality: f64,
    pub weight: f64,
}

impl IdentifiedContribution {
    fn z(&self, rho: f64) -> f64 {
        let base = self.quality * self.weight;
        if base <= 0.0 {
            0.0
        } else {
            base.powf(rho)
        }
    }
}

/// Rank a flat pool of identified contributions by their CES-weighted `z`
/// value and keep the top `top_k`, the shared building block every
/// subscore's contributor table is built from.
pub fn rank_contributors(items: &[IdentifiedContribution], rho: f64, top_k: usize) -> Vec<Contributor> {
    let mut scored: Vec<(f64, &IdentifiedContribution)> = items.iter().map(|c| (c.z(rho), c)).collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(top_k)
        .map(|(z, c)| Contributor {
            amenity_id: Some(c.amenity_id),
            category: Some(c.category.clone()),
            mode: Some(c.mode),
            time_slice: Some(c.time_slice.clone()),
            contribution: z,
        })
        .collect()
}

/// Min-max rescale to `[0, 1]`, flat `0.5` when every input is equal.
/// Shared across MUHAA's hub-mass composite and JEA's gravity inputs,
/// wherever the spec calls for a rescale across a finite reference set
/// rather than a per-(cell, category) CES aggregate.
pub fn min_max_rescale(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < 1e-12 {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}
