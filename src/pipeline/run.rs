//! Step execution and the per-run outcome log.
//!
//! Runs one step at a time in plan order. Steps share the on-disk dataset,
//! so there is no overlap and no cancellation mid-step; a run is resumed by
//! re-invoking with a narrower plan and letting the idempotency predicates
//! skip completed work.
use super::registry::{StepDefinition, StepName};
use crate::context::ExperimentContext;
use crate::delegate::StepDelegate;
use crate::error::StepError;
use crate::paths::PathBundle;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Terminal state of one step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Skipped,
    Failed,
}

/// Record of one executed (or skipped) step, appended to the run log.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub name: StepName,
    pub status: StepStatus,
    /// Failure description or skip reason; `None` for plain success.
    pub detail: Option<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(
    elapsed: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

/// Execute a plan against one experiment, recording an outcome per step.
///
/// A step whose idempotency predicate reports its effect already on disk is
/// skipped without touching the delegate. Recoverable delegate failures
/// (`MissingInput`, `Transient`) are recorded and the run continues, since
/// later steps may be independent diagnostics; nothing in here retries.
pub fn run(
    plan: &[&'static StepDefinition],
    ctx: &ExperimentContext,
    paths: &PathBundle,
    delegate: &dyn StepDelegate,
) -> Vec<StepOutcome> {
    let mut outcomes = Vec::with_capacity(plan.len());
    for def in plan {
        outcomes.push(run_step(def, ctx, paths, delegate));
    }
    outcomes
}

fn run_step(
    def: &StepDefinition,
    ctx: &ExperimentContext,
    paths: &PathBundle,
    delegate: &dyn StepDelegate,
) -> StepOutcome {
    let started = Instant::now();

    if let Some(predicate) = def.idempotency {
        if predicate(paths) {
            tracing::info!(step = %def.name, "effect already present, skipping");
            return StepOutcome {
                name: def.name,
                status: StepStatus::Skipped,
                detail: Some("effect already present".to_string()),
                elapsed: started.elapsed(),
            };
        }
    }

    tracing::info!(step = %def.name, experiment = %ctx.identifier, "running step");
    match delegate.invoke(def.name, ctx, paths) {
        Ok(()) => {
            let elapsed = started.elapsed();
            tracing::info!(step = %def.name, elapsed_ms = elapsed.as_millis() as u64, "step succeeded");
            StepOutcome {
                name: def.name,
                status: StepStatus::Succeeded,
                detail: None,
                elapsed,
            }
        }
        Err(StepError::AlreadyPresent(detail)) => StepOutcome {
            name: def.name,
            status: StepStatus::Skipped,
            detail: Some(format!("already present: {detail}")),
            elapsed: started.elapsed(),
        },
        Err(err @ (StepError::MissingInput(_) | StepError::Transient(_))) => {
            tracing::warn!(step = %def.name, error = %err, "step failed, continuing");
            StepOutcome {
                name: def.name,
                status: StepStatus::Failed,
                detail: Some(err.to_string()),
                elapsed: started.elapsed(),
            }
        }
    }
}
