//! Typed paths into the experiment working layout.
//!
//! Centralizing path derivation keeps file access consistent across the
//! pipeline and prevents drift when step signatures evolve: every step reads
//! the same named bundle instead of unpacking a positional tuple.
use crate::context::ExperimentContext;
use crate::error::PlanError;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Marker token carried by every raw correlator output filename.
const RAW_INPUT_MARKER: &str = "IDI";

/// Purpose of a solved calibration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CalTable {
    Gain,
    SystemTemperature,
    SingleBandDelay,
    MultiBandDelay,
    Bandpass,
}

impl CalTable {
    /// All table purposes, in a stable order.
    pub const ALL: [CalTable; 5] = [
        CalTable::Gain,
        CalTable::SystemTemperature,
        CalTable::SingleBandDelay,
        CalTable::MultiBandDelay,
        CalTable::Bandpass,
    ];

    /// File extension used for the table on disk.
    pub fn extension(self) -> &'static str {
        match self {
            CalTable::Gain => "gcal",
            CalTable::SystemTemperature => "tsys",
            CalTable::SingleBandDelay => "sbd",
            CalTable::MultiBandDelay => "mbd",
            CalTable::Bandpass => "bpass",
        }
    }
}

/// Every artifact location a run touches, derived once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBundle {
    /// The measurement set: `{root}/{work_dir}/{id}.ms`.
    pub visibility: PathBuf,
    /// Solved calibration tables keyed by purpose.
    pub cal_tables: BTreeMap<CalTable, PathBuf>,
    /// Raw FITS-IDI inputs in natural order. May legitimately be empty.
    pub raw_inputs: Vec<PathBuf>,
    /// ANTAB file holding system temperatures and gain curves.
    pub antab: PathBuf,
    /// AIPS-style flag table to convert.
    pub aips_flags: PathBuf,
    /// Converted flag command file consumed by flag application.
    pub flag_file: PathBuf,
    /// Scan listing written by the scan-list step.
    pub scan_listing: PathBuf,
}

impl PathBundle {
    /// Location of a solved table by purpose.
    ///
    /// The map is populated for every purpose at resolve time, so the lookup
    /// cannot miss.
    pub fn cal_table(&self, kind: CalTable) -> &Path {
        &self.cal_tables[&kind]
    }
}

/// Derive the full path bundle for a context.
///
/// Pure apart from one listing of the raw-input directory, which is
/// deliberately re-done on every call so files that arrived between runs are
/// picked up. A missing raw-input directory yields an empty input set; steps
/// that need inputs report that themselves.
pub fn resolve(ctx: &ExperimentContext) -> Result<PathBundle, PlanError> {
    validate_identifier(&ctx.identifier)?;

    let work = ctx.root.join(&ctx.work_dir);
    let calib = ctx.root.join(&ctx.calib_dir);
    let stem = |dir: &Path, ext: &str| dir.join(format!("{}.{ext}", ctx.identifier));

    let mut cal_tables = BTreeMap::new();
    for kind in CalTable::ALL {
        let path = stem(&work, kind.extension());
        if cal_tables.values().any(|existing| existing == &path) {
            return Err(PlanError::TableCollision(path.display().to_string()));
        }
        cal_tables.insert(kind, path);
    }

    Ok(PathBundle {
        visibility: stem(&work, "ms"),
        cal_tables,
        raw_inputs: discover_raw_inputs(&ctx.root.join(&ctx.fits_dir), &ctx.identifier),
        antab: stem(&calib, "antab"),
        aips_flags: stem(&calib, "uvflg"),
        flag_file: stem(&work, "flag"),
        scan_listing: stem(&calib, "listobs"),
    })
}

fn validate_identifier(identifier: &str) -> Result<(), PlanError> {
    let bad = identifier.is_empty()
        || identifier.contains(std::path::MAIN_SEPARATOR)
        || identifier.contains('/');
    if bad {
        return Err(PlanError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(())
}

/// List FITS-IDI files for the experiment, naturally ordered.
///
/// Matches names that start with the identifier and contain the `IDI`
/// marker. A missing or unreadable directory is an empty set, not an error.
fn discover_raw_inputs(fits_dir: &Path, identifier: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(fits_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(identifier) && name.contains(RAW_INPUT_MARKER))
        .collect();
    names.sort_by(|a, b| natural_cmp(a, b));
    names.into_iter().map(|name| fits_dir.join(name)).collect()
}

/// Compare strings treating embedded digit runs as integers.
///
/// `EX2_IDI2` sorts before `EX2_IDI10`, which lexicographic order gets
/// wrong. Digit runs are compared by stripped length then digits, so leading
/// zeros do not disturb the order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ia = a.chars().peekable();
    let mut ib = b.chars().peekable();
    loop {
        match (ia.peek().copied(), ib.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let run_a = take_digits(&mut ia);
                    let run_b = take_digits(&mut ib);
                    let cmp = compare_digit_runs(&run_a, &run_b);
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                } else {
                    let cmp = ca.cmp(&cb);
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                    ia.next();
                    ib.next();
                }
            }
        }
    }
}

fn take_digits(iter: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(ch) = iter.peek().copied() {
        if !ch.is_ascii_digit() {
            break;
        }
        run.push(ch);
        iter.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
