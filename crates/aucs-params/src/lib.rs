//! Typed, versioned, hash-stamped configuration (component C1).
//!
//! A [`ParamSnapshot`] is loaded once per run from a single TOML document,
//! validated, canonicalized, and hashed. Every other crate takes a
//! `&ParamSnapshot` by reference; nothing here is mutated after load.

use aucs_types::{CategoryId, Mode, SubscoreKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// The seven fixed Essentials Access categories (§4.8 EA).
pub const EA_CATEGORIES: [&str; 7] = [
    "grocery",
    "pharmacy",
    "primary_care",
    "childcare",
    "k8_school",
    "bank_atm",
    "postal_parcel",
];

/// The eight Leisure & Culture Access categories (§4.8 LCA). The spec names
/// the count but not the list; this is the shipped default crosswalk.
pub const LCA_CATEGORIES: [&str; 8] = [
    "restaurant",
    "bar_cafe",
    "museum_gallery",
    "performing_arts",
    "cinema",
    "fitness_rec",
    "library",
    "entertainment_other",
];

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("failed to read parameter document at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse parameter document: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation failed at {field}: {message}")]
    Validation { field: String, message: String },
    #[error("failed to canonicalize parameter snapshot: {0}")]
    Canonicalize(#[from] serde_json::Error),
}

fn fail(field: &str, message: impl Into<String>) -> ParamError {
    ParamError::Validation {
        field: field.to_string(),
        message: message.into(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridParams {
    pub resolution_m: f64,
}

/// Weights for the weighted sum into AUCS (§3 Parameters, §4.9). Must sum
/// to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscoreWeights {
    pub ea: f64,
    pub lca: f64,
    pub muhaa: f64,
    pub jea: f64,
    pub morr: f64,
    pub cte: f64,
    pub sou: f64,
}

impl SubscoreWeights {
    pub fn get(&self, kind: SubscoreKind) -> f64 {
        match kind {
            SubscoreKind::Ea => self.ea,
            SubscoreKind::Lca => self.lca,
            SubscoreKind::Muhaa => self.muhaa,
            SubscoreKind::Jea => self.jea,
            SubscoreKind::Morr => self.morr,
            SubscoreKind::Cte => self.cte,
            SubscoreKind::Sou => self.sou,
        }
    }

    pub fn sum(&self) -> f64 {
        self.ea + self.lca + self.muhaa + self.jea + self.morr + self.cte + self.sou
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSliceParams {
    pub id: String,
    pub weight: f64,
    /// Value of time for this slice, dollars per minute.
    pub value_of_time_per_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeParams {
    pub decay_half_life_min: f64,
    pub beta0: f64,
    pub vot_multiplier: f64,
    pub carry_penalty_min: f64,
    /// Per-mode ceiling on in-vehicle minutes (§4.4 numeric rules).
    pub ivt_cap_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeParamSet {
    pub walk: ModeParams,
    pub bike: ModeParams,
    pub car: ModeParams,
    pub transit: ModeParams,
}

impl ModeParamSet {
    pub fn get(&self, mode: Mode) -> &ModeParams {
        match mode {
            Mode::Walk => &self.walk,
            Mode::Bike => &self.bike,
            Mode::Car => &self.car,
            Mode::Transit => &self.transit,
        }
    }
}

/// Nest-scale θ_n for the fixed two-level nest topology (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestParamSet {
    pub non_motorized: f64,
    pub transit: f64,
    pub car: f64,
}

impl NestParamSet {
    pub fn get(&self, nest: aucs_types::NestId) -> f64 {
        match nest {
            aucs_types::NestId::NonMotorized => self.non_motorized,
            aucs_types::NestId::Transit => self.transit,
            aucs_types::NestId::Car => self.car,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityParams {
    pub weight_size: f64,
    pub weight_popularity: f64,
    pub weight_brand: f64,
    pub weight_heritage: f64,
    /// Multiplier for {24/7, extended, standard, limited} hours regimes.
    pub hours_uplift: [f64; 4],
    /// Blend constant ξ (Open Question 2): defaults to 0.5.
    pub hours_blend: f64,
    /// β in the brand-proximity dedup penalty (§4.6).
    pub brand_proximity_beta: f64,
    /// Radius within which same-brand amenities count toward dedup, meters.
    pub brand_proximity_radius_m: f64,
}

/// Either a fixed satiation rate or an anchor pair calibrated into one
/// (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Satiation {
    Fixed { kappa: f64 },
    Anchor { v_star: f64, s_star: f64 },
}

impl Satiation {
    /// Resolve to a concrete κ_c, performing the closed-form anchor
    /// calibration `κ_c = -ln(1 - S*/100) / V*` when needed.
    pub fn kappa(&self) -> f64 {
        match *self {
            Satiation::Fixed { kappa } => kappa,
            Satiation::Anchor { v_star, s_star } => -((1.0 - s_star / 100.0).ln()) / v_star,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryParams {
    /// CES elasticity ρ_c ∈ (0, 1].
    pub rho: f64,
    pub satiation: Satiation,
    /// Diversity weight υ_c.
    pub diversity_weight: f64,
    pub diversity_min_mult: f64,
    pub diversity_max_mult: f64,
    /// Minimum acceptable satiated score for EA's shortfall rule.
    pub s_min: f64,
    /// Novelty weight ν_c (LCA only; 0 elsewhere).
    #[serde(default)]
    pub novelty_weight: f64,
    /// Novelty z-score clip ceiling (Open Question 1).
    #[serde(default = "default_z_cap")]
    pub z_cap: f64,
    /// Multiplier on a mode's base carry penalty for this category (e.g.
    /// groceries carried on foot cost more than a bank visit).
    #[serde(default = "default_carry_multiplier")]
    pub carry_multiplier: f64,
}

fn default_z_cap() -> f64 {
    3.0
}

fn default_carry_multiplier() -> f64 {
    1.0
}

/// Generalized-cost coefficients shared across modes (§4.4): the α/γ/ρ_rel
/// terms that scale skim components into perceived minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtcCoefficients {
    pub alpha_access: f64,
    pub alpha_egress: f64,
    pub alpha_wait: f64,
    pub gamma_transfer: f64,
    pub rho_reliability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EaParams {
    pub p_miss: f64,
    pub p_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LcaParams {
    /// Cross-category elasticity for the second-tier CES aggregator.
    pub rho_cross: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JeaParams {
    pub weight_jobs: f64,
    pub weight_education: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubsAirportsParams {
    pub weight_pop: f64,
    pub weight_gdp: f64,
    pub weight_poi: f64,
    pub weight_culture: f64,
    pub alpha_hub: f64,
    /// Blend between hub and airport access (Open Question 3); default
    /// 0.7 / 0.3.
    pub hub_weight: f64,
    pub air_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorrParams {
    pub weight_frequent_stop: f64,
    pub weight_span: f64,
    pub weight_reliability: f64,
    pub weight_redundancy: f64,
    pub weight_micromobility: f64,
    pub frequent_stop_radius_m: f64,
    pub frequent_headway_min: f64,
    pub redundancy_route_radius_m: f64,
    pub micromobility_radius_m: f64,
    /// Schedule-proxy constant on-time share used when realtime data is
    /// unavailable (§4.8 C₃).
    pub schedule_proxy_on_time_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorridorParams {
    pub delta_max_min: f64,
    pub stop_buffer_m: f64,
    pub pair_whitelist: Vec<(String, String)>,
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalityParams {
    pub month_weights: [f64; 12],
    pub comfortable_temp_lo_f: f64,
    pub comfortable_temp_hi_f: f64,
    pub precip_max_in_per_day: f64,
    pub wind_max_mph: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum NormalizationMode {
    Percentile { p_lo: f64, p_hi: f64 },
    Anchor { raw_lo: f64, raw_hi: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub ea: NormalizationMode,
    pub lca: NormalizationMode,
    pub muhaa: NormalizationMode,
    pub jea: NormalizationMode,
    pub morr: NormalizationMode,
    pub cte: NormalizationMode,
    pub sou: NormalizationMode,
}

impl NormalizationParams {
    pub fn get(&self, kind: SubscoreKind) -> &NormalizationMode {
        match kind {
            SubscoreKind::Ea => &self.ea,
            SubscoreKind::Lca => &self.lca,
            SubscoreKind::Muhaa => &self.muhaa,
            SubscoreKind::Jea => &self.jea,
            SubscoreKind::Morr => &self.morr,
            SubscoreKind::Cte => &self.cte,
            SubscoreKind::Sou => &self.sou,
        }
    }
}

/// QA thresholds (§7, §11): share of sentinel/unreachable rows above which
/// a stage is considered failed rather than merely degraded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaThresholds {
    pub max_unreachable_share: f64,
    pub max_sentinel_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSnapshot {
    pub version: u32,
    pub grid: GridParams,
    pub subscore_weights: SubscoreWeights,
    pub time_slices: Vec<TimeSliceParams>,
    pub modes: ModeParamSet,
    pub nests: NestParamSet,
    pub gtc: GtcCoefficients,
    pub quality: QualityParams,
    pub categories: BTreeMap<String, CategoryParams>,
    pub ea: EaParams,
    pub lca: LcaParams,
    pub jea: JeaParams,
    pub hubs_airports: HubsAirportsParams,
    pub morr: MorrParams,
    pub corridor: CorridorParams,
    pub seasonality: SeasonalityParams,
    pub normalization: NormalizationParams,
    pub qa: QaThresholds,
}

impl ParamSnapshot {
    /// Load, validate, and return a ready-to-hash snapshot. CLI/env
    /// overrides (§4.1) must be applied by the caller before this returns,
    /// by mutating the parsed value prior to calling [`validate`].
    pub fn load(path: &Path) -> Result<ParamSnapshot, ParamError> {
        let text = std::fs::read_to_string(path).map_err(|source| ParamError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot: ParamSnapshot = toml::from_str(&text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        let sum = self.subscore_weights.sum();
        if (sum - 100.0).abs() > 1e-6 {
            return Err(fail(
                "subscore_weights",
                format!("weights must sum to 100, got {sum}"),
            ));
        }

        let ts_weight_sum: f64 = self.time_slices.iter().map(|t| t.weight).sum();
        if (ts_weight_sum - 1.0).abs() > 1e-6 {
            return Err(fail(
                "time_slices",
                format!("weights must sum to 1, got {ts_weight_sum}"),
            ));
        }
        if self.time_slices.is_empty() {
            return Err(fail("time_slices", "at least one time slice is required"));
        }
        for ts in &self.time_slices {
            if !(0.0..=1.0).contains(&ts.weight) {
                return Err(fail(
                    &format!("time_slices.{}.weight", ts.id),
                    "must be in [0, 1]",
                ));
            }
            if ts.value_of_time_per_min <= 0.0 {
                return Err(fail(
                    &format!("time_slices.{}.value_of_time_per_min", ts.id),
                    "must be positive",
                ));
            }
        }

        for (name, theta) in [
            ("nests.non_motorized", self.nests.non_motorized),
            ("nests.transit", self.nests.transit),
            ("nests.car", self.nests.car),
        ] {
            if !(0.0 < theta && theta <= 1.0) {
                return Err(fail(name, "nest scale theta must be in (0, 1]"));
            }
        }

        for (name, v) in [
            ("gtc.alpha_access", self.gtc.alpha_access),
            ("gtc.alpha_egress", self.gtc.alpha_egress),
            ("gtc.alpha_wait", self.gtc.alpha_wait),
            ("gtc.gamma_transfer", self.gtc.gamma_transfer),
            ("gtc.rho_reliability", self.gtc.rho_reliability),
        ] {
            if v < 0.0 {
                return Err(fail(name, "GTC coefficients must be non-negative"));
            }
        }

        let qw = self.quality.weight_size
            + self.quality.weight_popularity
            + self.quality.weight_brand
            + self.quality.weight_heritage;
        if (qw - 1.0).abs() > 1e-6 {
            return Err(fail("quality", format!("quality weights must sum to 1, got {qw}")));
        }
        if !(0.0..=1.0).contains(&self.quality.hours_blend) {
            return Err(fail("quality.hours_blend", "must be in [0, 1]"));
        }

        for (cat, p) in &self.categories {
            if !(0.0 < p.rho && p.rho <= 1.0) {
                return Err(fail(&format!("categories.{cat}.rho"), "must be in (0, 1]"));
            }
            if p.diversity_min_mult > p.diversity_max_mult {
                return Err(fail(
                    &format!("categories.{cat}.diversity_min_mult"),
                    "must not exceed diversity_max_mult",
                ));
            }
            if let Satiation::Anchor { v_star, s_star } = p.satiation {
                if v_star <= 0.0 || !(0.0..100.0).contains(&s_star) {
                    return Err(fail(
                        &format!("categories.{cat}.satiation"),
                        "anchor requires v_star > 0 and 0 <= s_star < 100",
                    ));
                }
            }
        }

        for cat in EA_CATEGORIES {
            if !self.categories.contains_key(cat) {
                return Err(fail(
                    "categories",
                    format!("EA references category '{cat}' which is not defined"),
                ));
            }
        }
        for cat in LCA_CATEGORIES {
            if !self.categories.contains_key(cat) {
                return Err(fail(
                    "categories",
                    format!("LCA references category '{cat}' which is not defined"),
                ));
            }
        }

        let morr_sum = self.morr.weight_frequent_stop
            + self.morr.weight_span
            + self.morr.weight_reliability
            + self.morr.weight_redundancy
            + self.morr.weight_micromobility;
        if (morr_sum - 1.0).abs() > 1e-6 {
            return Err(fail("morr", format!("MORR component weights must sum to 1, got {morr_sum}")));
        }

        let jea_sum = self.jea.weight_jobs + self.jea.weight_education;
        if (jea_sum - 1.0).abs() > 1e-6 {
            return Err(fail(
                "jea",
                format!("weight_jobs + weight_education must sum to 1, got {jea_sum}"),
            ));
        }

        let hub_sum = self.hubs_airports.hub_weight + self.hubs_airports.air_weight;
        if (hub_sum - 1.0).abs() > 1e-6 {
            return Err(fail(
                "hubs_airports",
                format!("hub_weight + air_weight must sum to 1, got {hub_sum}"),
            ));
        }

        let month_sum: f64 = self.seasonality.month_weights.iter().sum();
        if (month_sum - 1.0).abs() > 1e-6 {
            return Err(fail(
                "seasonality.month_weights",
                format!("must sum to 1, got {month_sum}"),
            ));
        }

        Ok(())
    }

    pub fn category(&self, id: &CategoryId) -> Option<&CategoryParams> {
        self.categories.get(&id.0)
    }

    /// Canonical JSON form used for hashing. `BTreeMap` guarantees
    /// sorted-key output; sequences (time slices, corridor whitelist)
    /// keep their authored order because order is semantically meaningful
    /// there (§4.2 determinism: integer/stable keys only in hash inputs —
    /// here we hash the canonical text form, not floats directly).
    pub fn canonical_json(&self) -> Result<String, ParamError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deterministic SHA-256 of the canonicalized snapshot (§3 `param_hash`).
    pub fn param_hash(&self) -> Result<String, ParamError> {
        let canonical = self.canonical_json()?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}
