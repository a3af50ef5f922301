//! Pipeline driver (component C11): stage ordering, resumable
//! manifest-hash checkpointing, the filesystem run lock, QA threshold
//! enforcement, and concurrent subscore execution (§4.11, §5).
//!
//! The driver coordinates stages; it does not itself contain scoring
//! logic. Each stage's computation lives in the kernel crates
//! (`aucs-gtc`, `aucs-logsum`, `aucs-quality`, `aucs-aggregate`,
//! `aucs-subscores`, `aucs-normalize`, `aucs-explain`) and is wired
//! together by a caller (the CLI) using [`run_stage`] for sequencing and
//! [`driver::run_parallel`] for the concurrent subscore fan-out.

pub mod driver;
pub mod error;
pub mod lock;
pub mod stage;

pub use error::PipelineError;
pub use lock::RunLock;

use aucs_contracts::manifest::{QaReport, RunManifest};
use aucs_params::QaThresholds;
use std::time::Instant;

/// Runs one stage with the full resumability/QA contract from §4.11:
/// skip if a prior manifest row matches this stage's param hash and
/// input hashes; otherwise execute `compute`, check its QA counters
/// against `thresholds`, and append the manifest row on success. Leaves
/// prior artifacts untouched on failure (§4.11 point 4) since `compute`
/// is expected to use `aucs_contracts::write_table`'s
/// write-temp-then-rename internally and this function never writes
/// artifact bytes itself.
pub fn run_stage<F>(
    manifest: &RunManifest,
    stage: &str,
    param_hash: &str,
    input_hashes: &[String],
    thresholds: &QaThresholds,
    timestamp_unix: u64,
    compute: F,
) -> Result<bool, PipelineError>
where
    F: FnOnce() -> Result<(String, u64, QaReport), PipelineError>,
{
    if stage::can_skip(manifest, stage, param_hash, input_hashes)? {
        tracing::info!(stage, "skipping stage, manifest hashes unchanged");
        return Ok(false);
    }

    let started = Instant::now();
    let (artifact_hash, row_count, qa) = compute()?;
    stage::check_qa_thresholds(stage, &qa, thresholds)?;

    stage::record_completion(
        manifest,
        stage,
        artifact_hash,
        param_hash.to_string(),
        input_hashes.to_vec(),
        started.elapsed().as_millis() as u64,
        row_count,
        timestamp_unix,
        qa,
    )?;
    tracing::info!(stage, row_count, "stage complete");
    Ok(true)
}
