//! Stage execution and resumability (§4.11): each stage reads prior
//! artifacts by hash, validates schemas at the boundary, writes an output
//! artifact plus a manifest row, and may be skipped on restart when its
//! hashes still match.

use aucs_contracts::manifest::{ManifestRow, QaReport, RunManifest};
use aucs_params::QaThresholds;

use crate::error::PipelineError;

/// Whether `stage` can be skipped on restart: its most recent manifest
/// row exists and was produced from the same parameter hash and the same
/// set of input artifact hashes (§4.11: "restart skips completed stages
/// whose hashes still match").
pub fn can_skip(manifest: &RunManifest, stage: &str, param_hash: &str, input_hashes: &[String]) -> Result<bool, PipelineError> {
    let Some(last) = manifest.last_for_stage(stage)? else {
        return Ok(false);
    };
    Ok(last.param_hash == param_hash && last.input_artifact_hashes == input_hashes)
}

/// Enforce the QA thresholds a completed stage's counters must satisfy
/// (§7: "Stage fails only if unreachable share exceeds a configured
/// critical threshold" / "stage fails if the sentinel share exceeds a
/// per-stage threshold").
pub fn check_qa_thresholds(stage: &str, qa: &QaReport, thresholds: &QaThresholds) -> Result<(), PipelineError> {
    if qa.unreachable_share() > thresholds.max_unreachable_share {
        return Err(PipelineError::StageFailure {
            stage: stage.to_string(),
            detail: format!(
                "unreachable share {:.4} exceeds threshold {:.4}",
                qa.unreachable_share(),
                thresholds.max_unreachable_share
            ),
        });
    }
    if qa.sentinel_share() > thresholds.max_sentinel_share {
        return Err(PipelineError::StageFailure {
            stage: stage.to_string(),
            detail: format!(
                "sentinel share {:.4} exceeds threshold {:.4}",
                qa.sentinel_share(),
                thresholds.max_sentinel_share
            ),
        });
    }
    Ok(())
}

/// Append one stage's completion row. Called only after the stage's
/// artifact has been durably written (write-temp-then-rename happens in
/// `aucs-contracts::write_table`); the manifest append is therefore the
/// linearization point that marks the stage done (§5 "manifest updates
/// append one row and fsync").
#[allow(clippy::too_many_arguments)]
pub fn record_completion(
    manifest: &RunManifest,
    stage: &str,
    artifact_hash: String,
    param_hash: String,
    input_artifact_hashes: Vec<String>,
    wall_time_ms: u64,
    row_count: u64,
    timestamp_unix: u64,
    qa: QaReport,
) -> Result<(), PipelineError> {
    let row = ManifestRow {
        stage: stage.to_string(),
        artifact_hash,
        param_hash,
        input_artifact_hashes,
        wall_time_ms,
        row_count,
        timestamp_unix,
        qa,
    };
    manifest.append(&row)?;
    Ok(())
}

/// The fixed stage ordering (§4.11). Subscore stages are listed
/// individually even though they execute concurrently: each still gets
/// its own manifest row and resumability check.
pub const STAGE_ORDER: [&str; 16] = [
    "parameter_load",
    "skim_materialize",
    "gtc",
    "logsum",
    "quality",
    "category_value",
    "subscore_ea",
    "subscore_lca",
    "subscore_muhaa",
    "subscore_jea",
    "subscore_morr",
    "subscore_cte",
    "subscore_sou",
    "normalization",
    "composition",
    "explainability",
];
