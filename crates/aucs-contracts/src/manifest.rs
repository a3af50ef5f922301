//! Run manifest (§3 "Run manifest", §4.11, §5): an ordered, append-only log
//! of stage completions, plus the QA report attached to it (§7).

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::ContractError;

/// One row per completed stage. Written once, on success, never mutated
/// afterward (§3: "Produced atomically on stage completion. Immutable.").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRow {
    pub stage: String,
    pub artifact_hash: String,
    pub param_hash: String,
    pub input_artifact_hashes: Vec<String>,
    pub wall_time_ms: u64,
    pub row_count: u64,
    /// Unix epoch seconds; supplied by the caller since this crate must
    /// not call the wall clock itself to stay reproducible in tests.
    pub timestamp_unix: u64,
    pub qa: QaReport,
}

/// Per-stage QA counters (§7 "Partial failures are surfaced in the QA
/// report attached to the run manifest").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaReport {
    pub total_rows: u64,
    pub unreachable_rows: u64,
    pub sentinel_rows: u64,
    /// Per-category share of sentinel rows, for categories where that
    /// breakdown is meaningful (e.g. per-mode unreachable shares).
    pub category_shares: Vec<(String, f64)>,
}

impl QaReport {
    pub fn unreachable_share(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.unreachable_rows as f64 / self.total_rows as f64
        }
    }

    pub fn sentinel_share(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.sentinel_rows as f64 / self.total_rows as f64
        }
    }
}

/// Appends manifest rows to `manifest.ndjson` (§6 "Persisted state
/// layout"). Each `append` is one `fsync`'d line (§5 "manifest updates
/// append one row and fsync").
pub struct RunManifest {
    path: std::path::PathBuf,
}

impl RunManifest {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, row: &ManifestRow) -> Result<(), ContractError> {
        let line = serde_json::to_string(row).map_err(|source| ContractError::Io {
            path: self.path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| ContractError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        writeln!(file, "{line}").map_err(|source| ContractError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        file.sync_all().map_err(|source| ContractError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    /// Load every row, in append order, for restart/resume decisions
    /// (§4.11: "restart skips completed stages whose hashes still match").
    pub fn load(&self) -> Result<Vec<ManifestRow>, ContractError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path).map_err(|source| ContractError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut rows = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|source| ContractError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let row: ManifestRow = serde_json::from_str(&line).map_err(|source| ContractError::Io {
                path: self.path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
            })?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// The most recent manifest row for `stage`, if any, used to decide
    /// whether a restart can skip re-running it.
    pub fn last_for_stage(&self, stage: &str) -> Result<Option<ManifestRow>, ContractError> {
        Ok(self.load()?.into_iter().filter(|r| r.stage == stage).last())
    }
}
