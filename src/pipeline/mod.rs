//! Pipeline orchestration: the step registry, planning, and execution.
//!
//! Each piece is intentionally small so the CLI can remain thin and a run
//! stays predictable: a closed registry fixes what can execute, planning
//! fixes the order, and the runner records one outcome per step.
mod plan;
mod registry;
mod run;

pub use plan::{canonical_step_names, plan};
pub use registry::{registry, verify_registry, StepDefinition, StepName};
pub use run::{run, StepOutcome, StepStatus};
