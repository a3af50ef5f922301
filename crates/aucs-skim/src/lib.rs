//! Skim store (component C3): a write-once, fingerprinted store of travel
//! times per (origin cell, destination, mode, time-slice), produced by
//! external routing collaborators (OSRM/OTP, treated as opaque per §1) and
//! only ever read by the core.

use aucs_contracts::tables::SkimRow;
use aucs_types::{CellId, DestinationId, Mode, TimeSliceId};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkimError {
    #[error("unknown mode '{0}' in skim row")]
    UnknownMode(String),
    #[error("duplicate skim row for origin={origin:?} destination={destination:?} mode={mode} slice={slice}")]
    Duplicate {
        origin: CellId,
        destination: DestinationId,
        mode: Mode,
        slice: TimeSliceId,
    },
}

/// A fully populated skim entry, or the unreachable sentinel (§3 Skim
/// entry: "Missing ⇒ unreachable (treated as cost = +∞, never as zero)").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkimEntry {
    pub in_vehicle_min: f64,
    pub access_min: f64,
    pub egress_min: f64,
    pub wait_min: f64,
    pub transfers: u32,
    pub fare: f64,
    pub reliability_buffer_min: f64,
    pub reachable: bool,
}

impl SkimEntry {
    pub const UNREACHABLE: SkimEntry = SkimEntry {
        in_vehicle_min: f64::INFINITY,
        access_min: 0.0,
        egress_min: 0.0,
        wait_min: 0.0,
        transfers: 0,
        fare: 0.0,
        reliability_buffer_min: 0.0,
        reachable: false,
    };
}

impl From<&SkimRow> for SkimEntry {
    fn from(row: &SkimRow) -> Self {
        if !row.reachable {
            return SkimEntry::UNREACHABLE;
        }
        SkimEntry {
            in_vehicle_min: row.in_vehicle_min,
            access_min: row.access_min,
            egress_min: row.egress_min,
            wait_min: row.wait_min,
            transfers: row.transfers,
            fare: row.fare,
            reliability_buffer_min: row.reliability_buffer_min,
            reachable: true,
        }
    }
}

/// Identifies the provenance of a skim partition (§3 "Skim fingerprint").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkimFingerprint {
    pub engine_version: String,
    pub graph_build_id: String,
    pub od_set_id: String,
    pub mode: Mode,
    pub time_slice: TimeSliceId,
}

impl SkimFingerprint {
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.engine_version.as_bytes());
        hasher.update(b"|");
        hasher.update(self.graph_build_id.as_bytes());
        hasher.update(b"|");
        hasher.update(self.od_set_id.as_bytes());
        hasher.update(b"|");
        hasher.update(self.mode.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.time_slice.0.as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn parse_mode(s: &str) -> Result<Mode, SkimError> {
    match s {
        "walk" => Ok(Mode::Walk),
        "bike" => Ok(Mode::Bike),
        "car" => Ok(Mode::Car),
        "transit" => Ok(Mode::Transit),
        other => Err(SkimError::UnknownMode(other.to_string())),
    }
}

/// In-memory, read-only view over one or more skim partitions, keyed by
/// `(mode, time_slice, origin, destination)`.
#[derive(Debug, Default)]
pub struct SkimStore {
    entries: HashMap<(Mode, TimeSliceId, CellId, DestinationId), SkimEntry>,
    fingerprints: HashMap<(Mode, TimeSliceId), SkimFingerprint>,
}

impl SkimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize rows from a routing collaborator's partition output
    /// into the store. The store is write-once per partition: loading the
    /// same `(mode, time_slice)` twice is a logic error in the driver, not
    /// something this method silently tolerates.
    pub fn load_partition(
        &mut self,
        rows: &[SkimRow],
        fingerprint: SkimFingerprint,
    ) -> Result<(), SkimError> {
        for row in rows {
            let mode = parse_mode(&row.mode)?;
            let slice = TimeSliceId(row.time_slice.clone());
            let key = (mode, slice.clone(), CellId(row.origin_cell), DestinationId(row.destination_id));
            if self.entries.contains_key(&key) {
                return Err(SkimError::Duplicate {
                    origin: key.2,
                    destination: key.3,
                    mode,
                    slice,
                });
            }
            self.entries.insert(key, SkimEntry::from(row));
        }
        self.fingerprints
            .insert((fingerprint.mode, fingerprint.time_slice.clone()), fingerprint);
        Ok(())
    }

    /// Returns the entry for the given OD pair, mode, and time-slice. A
    /// missing entry is the unreachable sentinel, never a panic or `None`
    /// (§4.3 contract).
    pub fn get(
        &self,
        origin: CellId,
        destination: DestinationId,
        mode: Mode,
        slice: &TimeSliceId,
    ) -> SkimEntry {
        self.entries
            .get(&(mode, slice.clone(), origin, destination))
            .copied()
            .unwrap_or(SkimEntry::UNREACHABLE)
    }

    pub fn fingerprint(&self, mode: Mode, slice: &TimeSliceId) -> Option<&SkimFingerprint> {
        self.fingerprints.get(&(mode, slice.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Straight-line pruning (§4.3: "Large OD sets are pruned by the consumer
/// using straight-line distance against the mode's maximum-useful-time
/// bound"). Given an assumed average speed for `mode`, returns whether a
/// destination at `distance_km` could possibly be reached within
/// `max_useful_time_min`.
pub fn within_useful_distance(distance_km: f64, mode_avg_speed_kmh: f64, max_useful_time_min: f64) -> bool {
    if mode_avg_speed_kmh <= 0.0 {
        return false;
    }
    let time_min = distance_km / mode_avg_speed_kmh * 60.0;
    time_min <= max_useful_time_min
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(reachable: bool) -> SkimRow {
        SkimRow {
            origin_cell: 1,
            destination_id: 2,
            mode: "walk".into(),
            time_slice: "am_peak".into(),
            in_vehicle_min: 10.0,
            access_min: 1.0,
            egress_min: 1.0,
            wait_min: 0.0,
            transfers: 0,
            fare: 0.0,
            reliability_buffer_min: 0.5,
            reachable,
            fingerprint: "fp".into(),
        }
    }

    #[test]
    fn missing_entry_is_unreachable_not_zero() {
        let store = SkimStore::new();
        let entry = store.get(CellId(99), DestinationId(1), Mode::Car, &TimeSliceId::from("am_peak"));
        assert!(!entry.reachable);
        assert_eq!(entry.in_vehicle_min, f64::INFINITY);
    }

    #[test]
    fn loaded_entry_is_reachable() {
        let mut store = SkimStore::new();
        let fp = SkimFingerprint {
            engine_version: "osrm-5.27".into(),
            graph_build_id: "g1".into(),
            od_set_id: "od1".into(),
            mode: Mode::Walk,
            time_slice: TimeSliceId::from("am_peak"),
        };
        store.load_partition(&[row(true)], fp).unwrap();
        let entry = store.get(CellId(1), DestinationId(2), Mode::Walk, &TimeSliceId::from("am_peak"));
        assert!(entry.reachable);
        assert_eq!(entry.in_vehicle_min, 10.0);
    }

    #[test]
    fn duplicate_rows_rejected() {
        let mut store = SkimStore::new();
        let fp = SkimFingerprint {
            engine_version: "osrm-5.27".into(),
            graph_build_id: "g1".into(),
            od_set_id: "od1".into(),
            mode: Mode::Walk,
            time_slice: TimeSliceId::from("am_peak"),
        };
        store.load_partition(&[row(true)], fp.clone()).unwrap();
        assert!(store.load_partition(&[row(true)], fp).is_err());
    }

    #[test]
    fn fingerprint_hash_is_stable() {
        let fp = SkimFingerprint {
            engine_version: "osrm-5.27".into(),
            graph_build_id: "g1".into(),
            od_set_id: "od1".into(),
            mode: Mode::Walk,
            time_slice: TimeSliceId::from("am_peak"),
        };
        assert_eq!(fp.hash(), fp.hash());
    }

    #[test]
    fn useful_distance_pruning() {
        assert!(within_useful_distance(2.0, 5.0, 30.0));
        assert!(!within_useful_distance(100.0, 5.0, 30.0));
    }
}
