//! The seam to the external CASA installation.
//!
//! The orchestrator treats every step uniformly through `StepDelegate`; the
//! production implementation renders a casatasks snippet per step and hands
//! it to the configured interpreter as a child process.
use crate::context::ExperimentContext;
use crate::error::StepError;
use crate::paths::{CalTable, PathBundle};
use crate::pipeline::StepName;
use anyhow::{anyhow, Result};
use std::path::Path;
use std::process::Command;

/// Default interpreter invocation; the trailing `-c` takes the snippet.
pub const DEFAULT_CASA_CMD: &str = "casa --nologger --nogui -c";

/// Longest stderr excerpt carried into an outcome detail.
const MAX_STDERR_BYTES: usize = 2048;

/// External operation invoked for one step of the plan.
pub trait StepDelegate {
    fn invoke(
        &self,
        step: StepName,
        ctx: &ExperimentContext,
        paths: &PathBundle,
    ) -> Result<(), StepError>;
}

/// Delegate that drives CASA through its command-line interpreter.
pub struct CasaDelegate {
    interpreter: Vec<String>,
}

impl CasaDelegate {
    /// Build a delegate from an interpreter command line such as
    /// `casa --nologger --nogui -c`.
    pub fn new(command: &str) -> Result<Self> {
        let interpreter = shell_words::split(command)
            .map_err(|err| anyhow!("cannot parse interpreter command {command:?}: {err}"))?;
        if interpreter.is_empty() {
            return Err(anyhow!("interpreter command is empty"));
        }
        Ok(Self { interpreter })
    }

    fn run_snippet(&self, snippet: &str) -> Result<(), StepError> {
        let program = which::which(&self.interpreter[0]).map_err(|_| {
            StepError::Transient(format!(
                "interpreter {:?} not found on PATH",
                self.interpreter[0]
            ))
        })?;

        tracing::debug!(snippet, "invoking casa");
        let output = Command::new(program)
            .args(&self.interpreter[1..])
            .arg(snippet)
            .output()
            .map_err(|err| StepError::Transient(format!("spawn interpreter: {err}")))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(StepError::Transient(format!(
            "interpreter exited with {}: {}",
            exit_status_string(&output.status),
            tail(stderr.trim(), MAX_STDERR_BYTES)
        )))
    }
}

impl StepDelegate for CasaDelegate {
    fn invoke(
        &self,
        step: StepName,
        ctx: &ExperimentContext,
        paths: &PathBundle,
    ) -> Result<(), StepError> {
        match step {
            StepName::UnzipGz => unzip_archives(&ctx.root.join(&ctx.calib_dir)),
            _ => {
                let snippet = render_snippet(step, ctx, paths)?;
                self.run_snippet(&snippet)
            }
        }
    }
}

/// Decompress every `*.gz` left in the calibration directory.
fn unzip_archives(calib_dir: &Path) -> Result<(), StepError> {
    let entries = std::fs::read_dir(calib_dir).map_err(|_| {
        StepError::MissingInput(format!(
            "calibration directory {} does not exist",
            calib_dir.display()
        ))
    })?;
    let archives: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.to_string_lossy().ends_with(".gz"))
        .collect();
    if archives.is_empty() {
        return Err(StepError::AlreadyPresent(
            "no gzipped archives remain".to_string(),
        ));
    }
    for archive in archives {
        let status = Command::new("gunzip")
            .arg(&archive)
            .status()
            .map_err(|err| StepError::Transient(format!("spawn gunzip: {err}")))?;
        if !status.success() {
            return Err(StepError::Transient(format!(
                "gunzip {} exited with {}",
                archive.display(),
                exit_status_string(&status)
            )));
        }
    }
    Ok(())
}

/// Render the casatasks snippet for a step, checking its inputs first.
fn render_snippet(
    step: StepName,
    ctx: &ExperimentContext,
    paths: &PathBundle,
) -> Result<String, StepError> {
    let vis = py_str(&paths.visibility);
    let tsys = py_str(paths.cal_table(CalTable::SystemTemperature));
    let gcal = py_str(paths.cal_table(CalTable::Gain));

    let snippet = match step {
        StepName::UnzipGz => unreachable!("handled natively"),
        StepName::CheckTsysGaincurve => {
            require_raw_inputs(paths)?;
            require_file(&paths.antab, "ANTAB file")?;
            let idis = py_path_list(&paths.raw_inputs);
            let first = py_str(&paths.raw_inputs[0]);
            format!(
                "from casavlbitools import fitsidi; \
                 fitsidi.append_tsys({antab}, {idis}); \
                 fitsidi.append_gc({antab}, {first})",
                antab = py_str(&paths.antab),
            )
        }
        StepName::ConvertFlag => {
            require_raw_inputs(paths)?;
            require_file(&paths.aips_flags, "AIPS flag table")?;
            format!(
                "from casavlbitools import fitsidi; \
                 fitsidi.convert_flags({uvflg}, {idis}, outfile={out})",
                uvflg = py_str(&paths.aips_flags),
                idis = py_path_list(&paths.raw_inputs),
                out = py_str(&paths.flag_file),
            )
        }
        StepName::ImportFitsIdi => {
            require_raw_inputs(paths)?;
            format!(
                "from casatasks import importfitsidi; \
                 importfitsidi(fitsidifile={idis}, vis={vis}, constobsid=True, \
                 scanreindexgap_s=15.0, specframe='GEO')",
                idis = py_path_list(&paths.raw_inputs),
            )
        }
        StepName::GenListOfScans => {
            require_visibility(paths)?;
            format!(
                "from casatasks import listobs; \
                 listobs({vis}, listfile={listing})",
                listing = py_str(&paths.scan_listing),
            )
        }
        StepName::FlagData => {
            require_visibility(paths)?;
            require_file(&paths.flag_file, "converted flag file")?;
            format!(
                "from casatasks import flagdata; \
                 flagdata(vis={vis}, mode='list', inpfile={flags}, reason='any', \
                 action='apply', flagbackup=False, savepars=False)",
                flags = py_str(&paths.flag_file),
            )
        }
        StepName::GenCal => {
            require_visibility(paths)?;
            format!(
                "from casatasks import gencal; \
                 gencal({vis}, caltable={tsys}, caltype='tsys', uniform=False); \
                 gencal({vis}, caltable={gcal}, caltype='gc', infile='EVN.gc')"
            )
        }
        StepName::ApplyCal => {
            require_visibility(paths)?;
            require_file(paths.cal_table(CalTable::SystemTemperature), "tsys table")?;
            require_file(paths.cal_table(CalTable::Gain), "gain table")?;
            format!(
                "from casatasks import applycal; \
                 applycal(vis={vis}, gaintable=[{tsys}, {gcal}], \
                 flagbackup=False, parang=True)"
            )
        }
        StepName::FlagAutocorrelation => {
            require_visibility(paths)?;
            format!(
                "from casatasks import flagdata; \
                 flagdata({vis}, mode='manual', autocorr=True, flagbackup=False)"
            )
        }
        StepName::FlagquackIntervals => {
            require_visibility(paths)?;
            format!(
                "from casatasks import flagdata, flagmanager; \
                 flagdata({vis}, mode='quack', quackinterval=5, flagbackup=False); \
                 flagmanager({vis}, mode='save', versionname='precal_flags', \
                 comment='Flags from Tsys, gaincal, bad data and edge channels')"
            )
        }
    };
    Ok(snippet)
}

fn require_raw_inputs(paths: &PathBundle) -> Result<(), StepError> {
    if paths.raw_inputs.is_empty() {
        return Err(StepError::MissingInput(
            "no FITS-IDI files discovered; is the fits directory populated?".to_string(),
        ));
    }
    Ok(())
}

fn require_visibility(paths: &PathBundle) -> Result<(), StepError> {
    if !paths.visibility.exists() {
        return Err(StepError::MissingInput(format!(
            "measurement set {} does not exist; run import_fits_idi first",
            paths.visibility.display()
        )));
    }
    Ok(())
}

fn require_file(path: &Path, what: &str) -> Result<(), StepError> {
    if !path.exists() {
        return Err(StepError::MissingInput(format!(
            "{what} {} does not exist",
            path.display()
        )));
    }
    Ok(())
}

/// Quote a path as a Python string literal.
fn py_str(path: &Path) -> String {
    let text = path.to_string_lossy();
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Render a list of paths as a Python list literal.
fn py_path_list(paths: &[std::path::PathBuf]) -> String {
    let items: Vec<String> = paths.iter().map(|p| py_str(p)).collect();
    format!("[{}]", items.join(", "))
}

fn tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

fn exit_status_string(status: &std::process::ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("{code}"),
        None => "terminated by signal".to_string(),
    }
}
