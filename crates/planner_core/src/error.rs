use std::time::Duration;

use thiserror::Error;

use crate::plan::PlanError;

/// Failure of a single collaborator call, before it is mapped onto a workflow stage.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("collaborator responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response payload: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("prompt is empty; describe what needs to be built")]
    EmptyPrompt,
    #[error("plan service returned a malformed plan: {0}")]
    MalformedPlan(#[from] PlanError),
    #[error("plan generation failed: {0}")]
    PlanGenerationFailed(BackendError),
    #[error("inventory check failed: {0}")]
    InventoryCheckFailed(BackendError),
    #[error("location lookup for {part_number} failed: {source}")]
    LocationLookupFailed {
        part_number: String,
        source: BackendError,
    },
    #[error("sourcing request submission failed: {0}")]
    SubmissionFailed(BackendError),
    #[error("no plan has been generated yet")]
    NoActivePlan,
    #[error("part {0} is not in the current plan")]
    UnknownPart(String),
    #[error("part {0} is not out of stock at its required location")]
    PartNotShort(String),
    #[error("no shortage resolution is open")]
    NoActiveResolution,
    #[error("shortage resolution cannot {0} from its current state")]
    InvalidTransition(&'static str),
    #[error("{0} is not one of the offered source locations")]
    UnknownSource(String),
    #[error("select a source location before submitting")]
    NoSourceSelected,
    #[error("transfer quantity must be greater than zero")]
    InvalidQuantity,
}

impl WorkflowError {
    /// True for failures that abort a plan-generation run.
    pub fn aborts_plan_run(&self) -> bool {
        matches!(
            self,
            Self::EmptyPrompt
                | Self::MalformedPlan(_)
                | Self::PlanGenerationFailed(_)
                | Self::InventoryCheckFailed(_)
        )
    }
}
