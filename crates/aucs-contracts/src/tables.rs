//! Concrete artifact row schemas (§6 External Interfaces).

use crate::Validate;
use serde::{Deserialize, Serialize};

fn in_range(v: f64, lo: f64, hi: f64) -> bool {
    v.is_finite() && v >= lo && v <= hi
}

/// Opening-hours regime (§3 Amenity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoursRegime {
    TwentyFourSeven,
    Extended,
    Standard,
    Limited,
}

impl HoursRegime {
    pub fn uplift_index(self) -> usize {
        match self {
            HoursRegime::TwentyFourSeven => 0,
            HoursRegime::Extended => 1,
            HoursRegime::Standard => 2,
            HoursRegime::Limited => 3,
        }
    }
}

/// The places table (§6): one row per amenity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceRow {
    pub amenity_id: u64,
    pub cell_id: u64,
    pub category: String,
    pub subtype: String,
    pub brand_key: Option<String>,
    pub size_metric: Option<f64>,
    pub popularity_metric: Option<f64>,
    pub brand_recognized: Option<bool>,
    pub heritage_flag: Option<bool>,
    pub hours_regime: HoursRegime,
    pub lon: f64,
    pub lat: f64,
}

impl Validate for PlaceRow {
    fn validate(&self) -> Option<String> {
        if self.category.is_empty() {
            return Some("category must not be empty".into());
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Some(format!("lon {} out of range", self.lon));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Some(format!("lat {} out of range", self.lat));
        }
        if let Some(s) = self.size_metric {
            if s < 0.0 {
                return Some("size_metric must be non-negative".into());
            }
        }
        if let Some(p) = self.popularity_metric {
            if p < 0.0 {
                return Some("popularity_metric must be non-negative".into());
            }
        }
        None
    }
}

/// A skim entry (§3, §6): one row per (origin, destination, mode,
/// time-slice). `reachable = false` rows must still carry a fingerprint
/// but all minute/cost fields are ignored downstream in favor of the
/// `GTC = +infinity` sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkimRow {
    pub origin_cell: u64,
    pub destination_id: u64,
    pub mode: String,
    pub time_slice: String,
    pub in_vehicle_min: f64,
    pub access_min: f64,
    pub egress_min: f64,
    pub wait_min: f64,
    pub transfers: u32,
    pub fare: f64,
    pub reliability_buffer_min: f64,
    pub reachable: bool,
    pub fingerprint: String,
}

impl Validate for SkimRow {
    fn validate(&self) -> Option<String> {
        if self.reachable {
            for (name, v) in [
                ("in_vehicle_min", self.in_vehicle_min),
                ("access_min", self.access_min),
                ("egress_min", self.egress_min),
                ("wait_min", self.wait_min),
                ("reliability_buffer_min", self.reliability_buffer_min),
            ] {
                if v < 0.0 || !v.is_finite() {
                    return Some(format!("{name} must be a finite non-negative minute value"));
                }
            }
            if self.fare < 0.0 {
                return Some("fare must be non-negative".into());
            }
        }
        if self.fingerprint.is_empty() {
            return Some("fingerprint must not be empty".into());
        }
        None
    }
}

/// Transit stop with service span and peak headway (§6 Schedule-derived
/// tables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRow {
    pub stop_id: u64,
    pub cell_id: u64,
    pub service_span_hours: f64,
    pub peak_headway_min: f64,
}

impl Validate for StopRow {
    fn validate(&self) -> Option<String> {
        if !in_range(self.service_span_hours, 0.0, 24.0) {
            return Some("service_span_hours must be in [0, 24]".into());
        }
        if self.peak_headway_min < 0.0 {
            return Some("peak_headway_min must be non-negative".into());
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStopRow {
    pub route_id: u64,
    pub stop_id: u64,
}

impl Validate for RouteStopRow {
    fn validate(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityRow {
    pub route_id: u64,
    pub on_time_share: f64,
    pub sample_count: u64,
}

impl Validate for ReliabilityRow {
    fn validate(&self) -> Option<String> {
        if !in_range(self.on_time_share, 0.0, 1.0) {
            return Some("on_time_share must be in [0, 1]".into());
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubRow {
    pub hub_id: u64,
    pub cbsa: String,
    pub cell_id: u64,
    pub pop: f64,
    pub gdp: f64,
    pub poi_count: f64,
    pub culture_index: f64,
}

impl Validate for HubRow {
    fn validate(&self) -> Option<String> {
        if self.pop < 0.0 || self.gdp < 0.0 || self.poi_count < 0.0 || self.culture_index < 0.0 {
            return Some("hub mass components must be non-negative".into());
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirportRow {
    pub airport_id: u64,
    pub cell_id: u64,
    pub enplanements: f64,
}

impl Validate for AirportRow {
    fn validate(&self) -> Option<String> {
        if self.enplanements < 0.0 {
            return Some("enplanements must be non-negative".into());
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsByCellRow {
    pub cell_id: u64,
    pub jobs: f64,
    pub industry_weight: Option<f64>,
}

impl Validate for JobsByCellRow {
    fn validate(&self) -> Option<String> {
        if self.jobs < 0.0 {
            return Some("jobs must be non-negative".into());
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniversityRow {
    pub university_id: u64,
    pub cell_id: u64,
    pub enrollment: f64,
    pub carnegie_tier_factor: f64,
}

impl Validate for UniversityRow {
    fn validate(&self) -> Option<String> {
        if self.enrollment < 0.0 {
            return Some("enrollment must be non-negative".into());
        }
        if !in_range(self.carnegie_tier_factor, 0.0, 1.0) {
            return Some("carnegie_tier_factor must be in [0, 1]".into());
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkTrailRow {
    pub park_id: u64,
    pub cell_id: u64,
    pub area_acres: f64,
    pub designation_quality: f64,
}

impl Validate for ParkTrailRow {
    fn validate(&self) -> Option<String> {
        if self.area_acres < 0.0 {
            return Some("area_acres must be non-negative".into());
        }
        if !in_range(self.designation_quality, 0.0, 1.0) {
            return Some("designation_quality must be in [0, 1]".into());
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimateNormalRow {
    pub cell_id: u64,
    pub month: u8,
    pub temp_f: f64,
    pub precip_in: f64,
    pub wind_mph: f64,
}

impl Validate for ClimateNormalRow {
    fn validate(&self) -> Option<String> {
        if !(1..=12).contains(&self.month) {
            return Some("month must be in 1..=12".into());
        }
        if self.precip_in < 0.0 || self.wind_mph < 0.0 {
            return Some("precip_in and wind_mph must be non-negative".into());
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicromobilityStationRow {
    pub station_id: u64,
    pub cell_id: u64,
    pub dock_count: u32,
}

impl Validate for MicromobilityStationRow {
    fn validate(&self) -> Option<String> {
        None
    }
}

/// Final output row (§6): `aucs` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AucsRow {
    pub cell_id: u64,
    pub aucs: Option<f64>,
    pub ea: Option<f64>,
    pub lca: Option<f64>,
    pub muhaa: Option<f64>,
    pub jea: Option<f64>,
    pub morr: Option<f64>,
    pub cte: Option<f64>,
    pub sou: Option<f64>,
    pub metro: Option<String>,
    pub param_hash: String,
    pub unscored_reason: Option<String>,
}

impl Validate for AucsRow {
    fn validate(&self) -> Option<String> {
        for (name, v) in [
            ("aucs", self.aucs),
            ("ea", self.ea),
            ("lca", self.lca),
            ("muhaa", self.muhaa),
            ("jea", self.jea),
            ("morr", self.morr),
            ("cte", self.cte),
            ("sou", self.sou),
        ] {
            if let Some(v) = v {
                if v.is_nan() {
                    return Some(format!("{name} must not be NaN (use None for unscored)"));
                }
                if !in_range(v, 0.0, 100.0) {
                    return Some(format!("{name} must be in [0, 100], got {v}"));
                }
            }
        }
        if self.aucs.is_none() && self.unscored_reason.is_none() {
            return Some("unscored cell must carry unscored_reason".into());
        }
        None
    }
}

/// Pre-normalization values (§6): `subscores_raw` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscoresRawRow {
    pub cell_id: u64,
    pub ea: f64,
    pub lca: f64,
    pub muhaa: f64,
    pub jea: f64,
    pub morr: f64,
    pub cte: f64,
    pub sou: f64,
    pub metro: Option<String>,
    pub param_hash: String,
}

impl Validate for SubscoresRawRow {
    fn validate(&self) -> Option<String> {
        for (name, v) in [
            ("ea", self.ea),
            ("lca", self.lca),
            ("muhaa", self.muhaa),
            ("jea", self.jea),
            ("morr", self.morr),
            ("cte", self.cte),
            ("sou", self.sou),
        ] {
            if v.is_nan() {
                return Some(format!("raw {name} must not be NaN"));
            }
            if v < 0.0 {
                return Some(format!("raw {name} must be non-negative, got {v}"));
            }
        }
        None
    }
}

/// Explainability table (§6, §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainabilityRow {
    pub cell_id: u64,
    pub subscore: String,
    pub rank: u32,
    pub amenity_id: Option<u64>,
    pub category: Option<String>,
    pub mode: Option<String>,
    pub time_slice: Option<String>,
    pub contribution: f64,
}

impl Validate for ExplainabilityRow {
    fn validate(&self) -> Option<String> {
        if self.contribution < 0.0 || !self.contribution.is_finite() {
            return Some("contribution must be a finite non-negative value".into());
        }
        if self.rank == 0 {
            return Some("rank is 1-based, got 0".into());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_regime_uplift_index_matches_order() {
        assert_eq!(HoursRegime::TwentyFourSeven.uplift_index(), 0);
        assert_eq!(HoursRegime::Limited.uplift_index(), 3);
    }

    #[test]
    fn aucs_row_requires_reason_when_unscored() {
        let row = AucsRow {
            cell_id: 1,
            aucs: None,
            ea: None,
            lca: None,
            muhaa: None,
            jea: None,
            morr: None,
            cte: None,
            sou: None,
            metro: None,
            param_hash: "abc".into(),
            unscored_reason: None,
        };
        assert!(row.validate().is_some());
    }
}
