//! CES aggregation, satiation, and Shannon diversity bonus (component C7):
//! per-(cell, category) value `V_{i,c}`, satiated score `S_{i,c}`, and the
//! diversity-adjusted `Ŝ_{i,c}` (§4.7).

use aucs_params::CategoryParams;

/// One amenity's contribution to a category aggregate: its CES-weighted
/// value `z_{i,a} = (Q_a · w_{i,a})^{ρ_c}` and the subtype it belongs to
/// (for the diversity term).
#[derive(Debug, Clone)]
pub struct AmenityContribution {
    pub subtype: String,
    pub quality: f64,
    pub weight: f64,
}

impl AmenityContribution {
    fn z(&self, rho: f64) -> f64 {
        let base = self.quality * self.weight;
        if base <= 0.0 {
            0.0
        } else {
            base.powf(rho)
        }
    }
}

/// Full per-(cell, category) result published for explainability.
#[derive(Debug, Clone)]
pub struct CategoryResult {
    pub v: f64,
    pub s: f64,
    pub entropy: f64,
    pub diversity_multiplier: f64,
    pub s_hat: f64,
}

/// `V_{i,c} = (Σ_a z_{i,a})^{1/ρ_c}`, computed in log-space (`V = exp(ln(Σ
/// z) / ρ_c)`) so that small `ρ_c` with widely-spanning inputs stays
/// numerically stable (§4.7 numerical note). Returns `0` when the amenity
/// set is empty or every contribution is zero, per `V_{i,c} = 0` when `A_c
/// = ∅`.
pub fn category_value(items: &[AmenityContribution], rho: f64) -> f64 {
    let sum_z: f64 = items.iter().map(|a| a.z(rho)).sum();
    if sum_z <= 0.0 {
        return 0.0;
    }
    (sum_z.ln() / rho).exp()
}

/// `S_{i,c} = 100 · (1 − exp(−κ_c · V_{i,c}))`.
pub fn satiation_score(v: f64, kappa: f64) -> f64 {
    (100.0 * (1.0 - (-kappa * v).exp())).clamp(0.0, 100.0)
}

/// Shannon entropy `H_{i,c} = −Σ_g p_g·ln(p_g)` over per-subtype shares of
/// `Σ z`, and the resulting diversity multiplier `clip(1 + υ_c·(e^H − 1),
/// [μ_min, μ_max])`.
pub fn diversity(items: &[AmenityContribution], rho: f64, params: &CategoryParams) -> (f64, f64) {
    let mut by_subtype: std::collections::HashMap<&str, f64> = std::collections::HashMap::new();
    let mut total = 0.0;
    for item in items {
        let z = item.z(rho);
        total += z;
        *by_subtype.entry(item.subtype.as_str()).or_insert(0.0) += z;
    }
    if total <= 0.0 {
        return (0.0, 1.0);
    }
    let entropy: f64 = by_subtype
        .values()
        .filter(|&&z| z > 0.0)
        .map(|&z| {
            let p = z / total;
            -p * p.ln()
        })
        .sum();
    let multiplier = (1.0 + params.diversity_weight * (entropy.exp() - 1.0))
        .clamp(params.diversity_min_mult, params.diversity_max_mult);
    (entropy, multiplier)
}

/// Full C7 aggregation for one (cell, category): CES value, satiation, and
/// diversity-adjusted final score `Ŝ_{i,c} = clip(S_{i,c} · m_{i,c}, 0,
/// 100)`.
pub fn aggregate_category(items: &[AmenityContribution], params: &CategoryParams) -> CategoryResult {
    let v = category_value(items, params.rho);
    let s = satiation_score(v, params.satiation.kappa());
    let (entropy, multiplier) = diversity(items, params.rho, params);
    let s_hat = (s * multiplier).clamp(0.0, 100.0);
    CategoryResult {
        v,
        s,
        entropy,
        diversity_multiplier: multiplier,
        s_hat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aucs_params::Satiation;

    fn params(rho: f64, kappa: f64) -> CategoryParams {
        CategoryParams {
            rho,
            satiation: Satiation::Fixed { kappa },
            diversity_weight: 0.2,
            diversity_min_mult: 0.8,
            diversity_max_mult: 1.2,
            s_min: 40.0,
            novelty_weight: 0.0,
            z_cap: 3.0,
            carry_multiplier: 1.0,
        }
    }

    fn contribution(subtype: &str, quality: f64, weight: f64) -> AmenityContribution {
        AmenityContribution {
            subtype: subtype.to_string(),
            quality,
            weight,
        }
    }

    #[test]
    fn empty_amenity_set_has_zero_value() {
        let v = category_value(&[], 0.5);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn ces_homogeneity_scaling_by_k_scales_v_by_k() {
        let items = vec![contribution("a", 50.0, 0.8), contribution("b", 30.0, 0.6)];
        let v1 = category_value(&items, 0.6);
        let scaled: Vec<AmenityContribution> = items
            .iter()
            .map(|a| contribution(&a.subtype, a.quality * 2.0, a.weight))
            .collect();
        let v2 = category_value(&scaled, 0.6);
        assert!((v2 - 2.0 * v1).abs() < 1e-9);
    }

    #[test]
    fn adding_positive_input_weakly_increases_v() {
        let items = vec![contribution("a", 50.0, 0.8)];
        let v1 = category_value(&items, 0.6);
        let mut more = items.clone();
        more.push(contribution("b", 40.0, 0.5));
        let v2 = category_value(&more, 0.6);
        assert!(v2 >= v1);
    }

    #[test]
    fn satiation_bounded_in_0_100() {
        assert_eq!(satiation_score(0.0, 0.1), 0.0);
        assert!(satiation_score(1000.0, 0.1) <= 100.0);
    }

    #[test]
    fn s2_anchor_kappa_hits_target_satiation() {
        let v_star = 10.0;
        let s_star = 80.0;
        let kappa = Satiation::Anchor { v_star, s_star }.kappa();
        let s = satiation_score(v_star, kappa);
        assert!((s - s_star).abs() < 1e-9);
    }

    #[test]
    fn single_subtype_has_zero_entropy_and_baseline_multiplier() {
        let items = vec![contribution("grocery", 50.0, 0.8), contribution("grocery", 40.0, 0.5)];
        let p = params(0.6, 0.1);
        let (entropy, multiplier) = diversity(&items, p.rho, &p);
        assert!(entropy.abs() < 1e-9);
        assert!((multiplier - 1.0).abs() < 1e-9);
    }

    #[test]
    fn multiple_subtypes_increase_diversity_multiplier() {
        let p = params(0.6, 0.1);
        let single = vec![contribution("grocery", 50.0, 0.8), contribution("grocery", 50.0, 0.8)];
        let mixed = vec![contribution("grocery", 50.0, 0.8), contribution("pharmacy", 50.0, 0.8)];
        let (_, m_single) = diversity(&single, p.rho, &p);
        let (_, m_mixed) = diversity(&mixed, p.rho, &p);
        assert!(m_mixed >= m_single);
    }

    #[test]
    fn s_hat_clipped_to_0_100() {
        let items = vec![contribution("a", 100.0, 1.0), contribution("b", 100.0, 1.0), contribution("c", 100.0, 1.0)];
        let p = params(0.9, 5.0);
        let result = aggregate_category(&items, &p);
        assert!((0.0..=100.0).contains(&result.s_hat));
    }
}
