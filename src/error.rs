//! Error kinds for the calibration workflow.
//!
//! Two layers: `PlanError` is fatal configuration trouble that aborts the
//! whole invocation, `StepError` is a per-step signal the orchestrator
//! records and moves past.
use thiserror::Error;

/// Fatal configuration errors. These propagate and abort the run.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Identifier is empty or would escape the working layout.
    #[error("invalid experiment identifier {0:?}: must be non-empty and free of path separators")]
    InvalidIdentifier(String),

    /// One or more requested step names match no registered step.
    #[error("unknown step name(s): {0}")]
    UnknownStep(String),

    /// Two table purposes resolved to the same location.
    #[error("calibration table collision at {0}")]
    TableCollision(String),

    /// The static step registry failed its startup checks.
    #[error("step registry is inconsistent: {0}")]
    Registry(String),
}

/// Per-step failures signalled by a delegate.
///
/// `MissingInput` and `Transient` become `Failed` outcomes and the run
/// continues; `AlreadyPresent` becomes a `Skipped` outcome.
#[derive(Debug, Error)]
pub enum StepError {
    /// A required input file or file set is absent or empty.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// The step's effect is already in place on disk.
    #[error("already present: {0}")]
    AlreadyPresent(String),

    /// The external task ran but could not complete.
    #[error("external task failed: {0}")]
    Transient(String),
}
