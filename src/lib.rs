//! Step-sequencing orchestrator for EVN calibration runs.
//!
//! Given an experiment identifier, `evncal` derives the canonical working
//! paths for that experiment, plans a rank-ordered subset of the ten
//! calibration steps, and runs each one through a delegate that drives an
//! external CASA installation, recording an outcome per step.
pub mod cli;
pub mod context;
pub mod delegate;
pub mod error;
pub mod paths;
pub mod pipeline;
pub mod probe;
