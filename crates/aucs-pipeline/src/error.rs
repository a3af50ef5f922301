//! Pipeline error kinds and their exit-code mapping (§6, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("parameter validation failed: {0}")]
    ParameterValidation(String),

    #[error("contract violation in stage {stage}: {detail}")]
    ContractViolation { stage: String, detail: String },

    #[error("stage {stage} failed after retries: {detail}")]
    StageFailure { stage: String, detail: String },

    #[error("stage {stage} exceeded its timeout ({timeout_ms} ms)")]
    Timeout { stage: String, timeout_ms: u64 },

    #[error("another run already holds the lock at {0}")]
    ConcurrentRun(String),

    #[error("run was cancelled")]
    Cancelled,

    #[error("resource exhausted: {0}")]
    ResourceExhaustion(String),

    #[error(transparent)]
    Contract(#[from] aucs_contracts::ContractError),

    #[error(transparent)]
    Param(#[from] aucs_params::ParamError),
}

impl PipelineError {
    /// §6 exit codes: `0` success; `2` validation failure; `3`
    /// unrecoverable stage failure; `4` cancelled; `5` resource
    /// exhaustion. A filesystem-lock conflict is a validation-class
    /// failure at startup (§7: "fatal at startup").
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::ParameterValidation(_) | PipelineError::ContractViolation { .. } | PipelineError::Contract(_) | PipelineError::Param(_) => 2,
            PipelineError::ConcurrentRun(_) => 2,
            PipelineError::StageFailure { .. } | PipelineError::Timeout { .. } => 3,
            PipelineError::Cancelled => 4,
            PipelineError::ResourceExhaustion(_) => 5,
        }
    }
}
