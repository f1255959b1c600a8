//! Planning: turn a requested step subset into an ordered execution plan.
//!
//! Planning is all-or-nothing. A typo'd step name fails the whole call
//! rather than silently dropping out of the plan, because an incomplete
//! calibration run is much harder to diagnose than a rejected one.
use super::registry::{registry, StepDefinition, StepName};
use crate::error::PlanError;
use std::collections::BTreeSet;

/// Build the ordered execution plan for the requested step names.
///
/// Caller order and duplicates are irrelevant; the result is de-duplicated
/// and sorted by registry rank. An empty request is a legal no-op plan.
pub fn plan(requested: &[String]) -> Result<Vec<&'static StepDefinition>, PlanError> {
    let mut unknown = Vec::new();
    let mut selected: BTreeSet<StepName> = BTreeSet::new();
    for name in requested {
        match name.parse::<StepName>() {
            Ok(step) => {
                selected.insert(step);
            }
            Err(()) => unknown.push(name.clone()),
        }
    }
    if !unknown.is_empty() {
        return Err(PlanError::UnknownStep(unknown.join(", ")));
    }

    let mut steps: Vec<&'static StepDefinition> = registry()
        .iter()
        .filter(|def| selected.contains(&def.name))
        .collect();
    steps.sort_by_key(|def| def.order);
    Ok(steps)
}

/// All canonical step names in execution order, for the CLI default.
pub fn canonical_step_names() -> Vec<String> {
    let mut defs: Vec<&StepDefinition> = registry().iter().collect();
    defs.sort_by_key(|def| def.order);
    defs.iter().map(|def| def.name.to_string()).collect()
}
