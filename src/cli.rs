//! CLI argument parsing for the calibration workflow.
//!
//! The CLI is intentionally thin: it wires identifiers and a step subset
//! into the pipeline without embedding policy, so the same core logic can be
//! driven from elsewhere.
use crate::delegate::DEFAULT_CASA_CMD;
use clap::Parser;
use std::path::PathBuf;

/// Root CLI entrypoint for the calibration pipeline.
#[derive(Parser, Debug)]
#[command(
    name = "evncal",
    version,
    about = "Step-sequencing orchestrator for EVN calibration runs",
    after_help = "Examples:\n  evncal n24l2\n  evncal n24l2 --steps gen_cal apply_cal\n  evncal n24l2 ek051 --root /data/evn --json",
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Experiment identifier(s); each runs as an independent pipeline
    #[arg(value_name = "EXPERIMENT", required = true)]
    pub identifiers: Vec<String>,

    /// Steps to run (default: all ten canonical steps in canonical order)
    #[arg(long, value_name = "NAME", num_args = 1..)]
    pub steps: Vec<String>,

    /// Base directory the working layout hangs off
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Working subdirectory for the measurement set and solved tables
    #[arg(long, value_name = "NAME")]
    pub workdir: Option<String>,

    /// Subdirectory holding raw FITS-IDI correlator output
    #[arg(long, value_name = "NAME")]
    pub fits_dir: Option<String>,

    /// Subdirectory holding auxiliary calibration inputs (antab, uvflg)
    #[arg(long, value_name = "NAME")]
    pub calib_dir: Option<String>,

    /// Reference antenna station code
    #[arg(long, value_name = "ANT")]
    pub refant: Option<String>,

    /// Interpreter command used to execute CASA snippets
    #[arg(long, value_name = "CMD", default_value = DEFAULT_CASA_CMD)]
    pub casa_cmd: String,

    /// Emit the outcome log as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Emit a verbose transcript of the run
    #[arg(long)]
    pub verbose: bool,
}
