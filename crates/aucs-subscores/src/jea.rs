//! Jobs & Education Access (§4.8 JEA): gravity sum over census-block jobs
//! and Carnegie-tier-weighted university enrollment, combined by
//! configured weights.

use crate::{Contributor, SubscoreOutput};
use aucs_params::JeaParams;
use aucs_types::CellId;

/// One census block's job count and accessibility weight to this cell,
/// with an optional industry weighting factor (§4.8: "with optional
/// industry weights").
#[derive(Debug, Clone)]
pub struct JobsDestination {
    pub cell_id: CellId,
    pub jobs: f64,
    pub industry_weight: Option<f64>,
    pub weight: f64,
}

/// `J_i = Σ_b jobs_b · w_{i,b}` with the optional per-destination industry
/// factor folded in multiplicatively.
pub fn jobs_access(destinations: &[JobsDestination]) -> f64 {
    destinations
        .iter()
        .map(|d| d.jobs * d.industry_weight.unwrap_or(1.0) * d.weight)
        .sum()
}

/// One university's enrollment, Carnegie-tier factor, and accessibility
/// weight to this cell (§4.8: "Education: over universities weighted by
/// Carnegie-tier factor").
#[derive(Debug, Clone)]
pub struct EducationDestination {
    pub university_id: u64,
    pub enrollment: f64,
    pub carnegie_tier_factor: f64,
    pub weight: f64,
}

/// `E_i = Σ_u enrollment_u · tier_u · w_{i,u}`.
pub fn education_access(destinations: &[EducationDestination]) -> f64 {
    destinations.iter().map(|d| d.enrollment * d.carnegie_tier_factor * d.weight).sum()
}

/// Blend jobs and education access, each already normalized to `[0, 100]`
/// across the study area, by the configured JEA weights.
pub fn jea_subscore(jobs_normalized: f64, education_normalized: f64, params: &JeaParams) -> SubscoreOutput {
    let value = (params.weight_jobs * jobs_normalized + params.weight_education * education_normalized).clamp(0.0, 100.0);
    let contributors = vec![
        Contributor {
            amenity_id: None,
            category: Some("jobs".into()),
            mode: None,
            time_slice: None,
            contribution: params.weight_jobs * jobs_normalized,
        },
        Contributor {
            amenity_id: None,
            category: Some("education".into()),
            mode: None,
            time_slice: None,
            contribution: params.weight_education * education_normalized,
        },
    ];
    SubscoreOutput { value, contributors }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_access_sums_weighted_blocks() {
        let destinations = vec![
            JobsDestination { cell_id: CellId(1), jobs: 1000.0, industry_weight: None, weight: 0.5 },
            JobsDestination { cell_id: CellId(2), jobs: 500.0, industry_weight: Some(2.0), weight: 0.2 },
        ];
        let j = jobs_access(&destinations);
        assert!((j - (500.0 + 200.0)).abs() < 1e-9);
    }

    #[test]
    fn education_access_weights_by_tier() {
        let destinations = vec![EducationDestination {
            university_id: 1,
            enrollment: 10_000.0,
            carnegie_tier_factor: 1.5,
            weight: 0.1,
        }];
        let e = education_access(&destinations);
        assert!((e - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn jea_blend_is_bounded() {
        let out = jea_subscore(90.0, 40.0, &JeaParams { weight_jobs: 0.6, weight_education: 0.4 });
        assert!((0.0..=100.0).contains(&out.value));
        assert_eq!(out.contributors.len(), 2);
    }
}
