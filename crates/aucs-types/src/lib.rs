//! Shared identifiers and small enums used across every AUCS crate.
//!
//! Kept deliberately free of behavior: this crate exists so that
//! `aucs-grid`, `aucs-skim`, `aucs-gtc`, ... all agree on the same key
//! types without depending on each other.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A hex cell at the study grid's fixed resolution (~250 m edge).
///
/// Backed by an H3-style 64-bit index. Determinism (§4.2) requires integer
/// keys only; no floating point ever enters a hash input derived from a
/// `CellId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellId(pub u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Stable amenity identifier, unique across the places table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AmenityId(pub u64);

impl fmt::Display for AmenityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Destination id for non-amenity destinations (hubs, airports, jobs
/// blocks, universities) that share the skim store's destination key
/// space but are not themselves amenities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DestinationId(pub u64);

/// One of the four travel modes the engine models (§3 `modes`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Walk,
    Bike,
    Car,
    Transit,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Walk, Mode::Bike, Mode::Car, Mode::Transit];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Walk => "walk",
            Mode::Bike => "bike",
            Mode::Car => "car",
            Mode::Transit => "transit",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two-level nest topology fixed by §4.5: non-motorized, transit, car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestId {
    NonMotorized,
    Transit,
    Car,
}

impl NestId {
    pub const ALL: [NestId; 3] = [NestId::NonMotorized, NestId::Transit, NestId::Car];

    /// Fixed mode membership for the nest topology (§4.5). Parameters may
    /// still override the *scale* θ_n per nest, but nest membership itself
    /// is part of the model, not configuration.
    pub fn of_mode(mode: Mode) -> NestId {
        match mode {
            Mode::Walk | Mode::Bike => NestId::NonMotorized,
            Mode::Transit => NestId::Transit,
            Mode::Car => NestId::Car,
        }
    }
}

/// A named time-of-day slice (e.g. "am_peak", "midday"). Identity is by
/// name so parameter documents remain human-readable; ordering is carried
/// by the parameter snapshot's `time_slices` sequence, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSliceId(pub String);

impl fmt::Display for TimeSliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TimeSliceId {
    fn from(s: &str) -> Self {
        TimeSliceId(s.to_string())
    }
}

/// An AUCS amenity category tag, keyed by the fixed crosswalk name
/// (e.g. `"grocery"`, `"pharmacy"`). The crosswalk itself lives in
/// parameters (`categories`), not in code, so this stays a thin wrapper.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub String);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(s: &str) -> Self {
        CategoryId(s.to_string())
    }
}

/// Metro (CBSA) tag a cell belongs to, used for metro-relative
/// normalization (§4.9). Cells outside any delineated metro carry `None`
/// at the call site, not a sentinel variant here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetroId(pub String);

/// The closed set of seven AUCS subscores (§3, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscoreKind {
    Ea,
    Lca,
    Muhaa,
    Jea,
    Morr,
    Cte,
    Sou,
}

impl SubscoreKind {
    pub const ALL: [SubscoreKind; 7] = [
        SubscoreKind::Ea,
        SubscoreKind::Lca,
        SubscoreKind::Muhaa,
        SubscoreKind::Jea,
        SubscoreKind::Morr,
        SubscoreKind::Cte,
        SubscoreKind::Sou,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubscoreKind::Ea => "EA",
            SubscoreKind::Lca => "LCA",
            SubscoreKind::Muhaa => "MUHAA",
            SubscoreKind::Jea => "JEA",
            SubscoreKind::Morr => "MORR",
            SubscoreKind::Cte => "CTE",
            SubscoreKind::Sou => "SOU",
        }
    }
}

impl fmt::Display for SubscoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Perceived generalized cost in minutes. `f64::INFINITY` is the defined
/// unreachable sentinel (§3 GTC entry, §7 numeric hazard policy) — never a
/// `None`/`NaN`, so it composes directly in min/sum reductions.
pub type Minutes = f64;

/// Reason codes attached to a cell whose AUCS could not be scored
/// (§4.9: "any subscore NaN causes the cell's AUCS to be recorded as
/// unscored"). Kept as a small closed enum so downstream reporting doesn't
/// need to parse free-text reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscoredReason {
    SubscoreNaN,
    MissingMetro,
    NoInputData,
}

impl fmt::Display for UnscoredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnscoredReason::SubscoreNaN => "subscore_nan",
            UnscoredReason::MissingMetro => "missing_metro",
            UnscoredReason::NoInputData => "no_input_data",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nest_membership_matches_spec_topology() {
        assert_eq!(NestId::of_mode(Mode::Walk), NestId::NonMotorized);
        assert_eq!(NestId::of_mode(Mode::Bike), NestId::NonMotorized);
        assert_eq!(NestId::of_mode(Mode::Transit), NestId::Transit);
        assert_eq!(NestId::of_mode(Mode::Car), NestId::Car);
    }

    #[test]
    fn mode_round_trips_through_serde() {
        let json = serde_json::to_string(&Mode::Transit).unwrap();
        assert_eq!(json, "\"transit\"");
        let back: Mode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Mode::Transit);
    }

    #[test]
    fn cell_id_displays_as_fixed_width_hex() {
        let c = CellId(255);
        assert_eq!(c.to_string(), "00000000000000ff");
    }
}
