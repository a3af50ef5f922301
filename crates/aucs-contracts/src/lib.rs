//! Contracts (component C12): tabular schemas for every intermediate and
//! output artifact, enforced on read and write, plus the run manifest and
//! QA report types the pipeline driver (C11) threads through stages.

pub mod manifest;
pub mod tables;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error at {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("schema violation in {table} ({violation_count} row(s) failed):\n{sample}")]
    SchemaViolation {
        table: String,
        violation_count: usize,
        sample: String,
    },
}

/// A row-level schema contract (§4.12). Implementors declare the value
/// ranges and nullability rules for their columns; [`read_table`] and
/// [`write_table`] call this on every row.
pub trait Validate {
    /// Returns a human-readable description of the first violated
    /// invariant, or `None` if the row is valid.
    fn validate(&self) -> Option<String>;
}

const MAX_SAMPLE_ROWS: usize = 10;

/// Read a CSV artifact into typed, schema-validated rows. Violations are
/// fatal with a row-level error report naming the first
/// [`MAX_SAMPLE_ROWS`] offending rows (§4.12).
pub fn read_table<T>(path: &Path) -> Result<Vec<T>, ContractError>
where
    T: DeserializeOwned + Validate,
{
    let file = File::open(path).map_err(|source| ContractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));
    let mut rows = Vec::new();
    let mut violations = Vec::new();

    for (idx, result) in reader.deserialize::<T>().enumerate() {
        let row: T = result.map_err(|source| ContractError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        if let Some(reason) = row.validate() {
            if violations.len() < MAX_SAMPLE_ROWS {
                violations.push(format!("row {idx}: {reason}"));
            }
        }
        rows.push(row);
    }

    if !violations.is_empty() {
        return Err(ContractError::SchemaViolation {
            table: path.display().to_string(),
            violation_count: violations.len(),
            sample: violations.join("\n"),
        });
    }

    Ok(rows)
}

/// Write a CSV artifact atomically: write to `<path>.tmp`, validate every
/// row, then rename over `path` (§5 "write-temp-then-rename").
pub fn write_table<T>(path: &Path, rows: &[T]) -> Result<(), ContractError>
where
    T: Serialize + Validate,
{
    let mut violations = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if let Some(reason) = row.validate() {
            if violations.len() < MAX_SAMPLE_ROWS {
                violations.push(format!("row {idx}: {reason}"));
            }
        }
    }
    if !violations.is_empty() {
        return Err(ContractError::SchemaViolation {
            table: path.display().to_string(),
            violation_count: violations.len(),
            sample: violations.join("\n"),
        });
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path).map_err(|source| ContractError::Io {
            path: tmp_path.display().to_string(),
            source,
        })?;
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));
        for row in rows {
            writer.serialize(row).map_err(|source| ContractError::Csv {
                path: tmp_path.display().to_string(),
                source,
            })?;
        }
        writer.flush().map_err(|source| ContractError::Io {
            path: tmp_path.display().to_string(),
            source,
        })?;
    }
    std::fs::rename(&tmp_path, path).map_err(|source| ContractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Row {
        value: f64,
    }

    impl Validate for Row {
        fn validate(&self) -> Option<String> {
            if self.value < 0.0 {
                Some("value must be non-negative".to_string())
            } else {
                None
            }
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let rows = vec![Row { value: 1.0 }, Row { value: 2.5 }];
        write_table(&path, &rows).unwrap();
        let read_back: Vec<Row> = read_table(&path).unwrap();
        assert_eq!(read_back.len(), 2);
    }

    #[test]
    fn write_rejects_invalid_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let rows = vec![Row { value: -1.0 }];
        assert!(write_table(&path, &rows).is_err());
        assert!(!path.exists());
    }
}
