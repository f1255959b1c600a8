//! Immutable per-run context.
//!
//! One value carries everything the pipeline needs to know about a run; all
//! derived paths are recomputed from it instead of shared mutable globals.
use std::path::PathBuf;

/// Default reference antenna (Effelsberg).
pub const DEFAULT_REF_ANTENNA: &str = "EF";

/// Default working subdirectory under the root.
pub const DEFAULT_WORK_DIR: &str = "workdir";

/// Default subdirectory holding the raw FITS-IDI files.
pub const DEFAULT_FITS_DIR: &str = "fits";

/// Default subdirectory holding pipeline calibration inputs (antab, uvflg).
pub const DEFAULT_CALIB_DIR: &str = "pipeline_calibration";

/// Settings for a single experiment run, fixed at process start.
#[derive(Debug, Clone)]
pub struct ExperimentContext {
    /// Experiment/project code, e.g. `ex2021a`.
    pub identifier: String,
    /// Base location every subdirectory hangs off.
    pub root: PathBuf,
    /// Working subdirectory name for the measurement set and solved tables.
    pub work_dir: String,
    /// Subdirectory name for raw FITS-IDI correlator output.
    pub fits_dir: String,
    /// Subdirectory name for auxiliary calibration inputs.
    pub calib_dir: String,
    /// Reference antenna station code.
    pub ref_antenna: String,
}

impl ExperimentContext {
    /// Build a context with the default layout under `root`.
    pub fn new(identifier: impl Into<String>, root: PathBuf) -> Self {
        Self {
            identifier: identifier.into(),
            root,
            work_dir: DEFAULT_WORK_DIR.to_string(),
            fits_dir: DEFAULT_FITS_DIR.to_string(),
            calib_dir: DEFAULT_CALIB_DIR.to_string(),
            ref_antenna: DEFAULT_REF_ANTENNA.to_string(),
        }
    }
}
