//! Closed registry of the ten canonical calibration steps.
//!
//! The registry is static: step names, execution ranks, and idempotency
//! predicates are fixed at compile time and checked once at startup. An
//! execution plan can only ever reference entries in this table.
use crate::error::PlanError;
use crate::paths::PathBundle;
use crate::probe;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Names of the canonical processing steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    UnzipGz,
    CheckTsysGaincurve,
    ConvertFlag,
    ImportFitsIdi,
    GenListOfScans,
    FlagData,
    GenCal,
    ApplyCal,
    FlagAutocorrelation,
    FlagquackIntervals,
}

impl StepName {
    /// Stable string form used on the command line and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            StepName::UnzipGz => "unzip_gz",
            StepName::CheckTsysGaincurve => "check_tsys_gaincurve",
            StepName::ConvertFlag => "convert_flag",
            StepName::ImportFitsIdi => "import_fits_idi",
            StepName::GenListOfScans => "gen_list_of_scans",
            StepName::FlagData => "flag_data",
            StepName::GenCal => "gen_cal",
            StepName::ApplyCal => "apply_cal",
            StepName::FlagAutocorrelation => "flag_autocorrelation",
            StepName::FlagquackIntervals => "flagquack_intervals",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        registry()
            .iter()
            .map(|def| def.name)
            .find(|name| name.as_str() == s)
            .ok_or(())
    }
}

/// Registry entry: rank fixes the canonical order, the predicate (when
/// present) lets an expensive step be skipped once its effect is on disk.
#[derive(Debug)]
pub struct StepDefinition {
    pub name: StepName,
    pub order: u32,
    pub idempotency: Option<fn(&PathBundle) -> bool>,
}

/// The canonical step table, in dependency order.
///
/// Ranks are spaced so a reader can see the order at a glance; only their
/// relative order matters.
pub fn registry() -> &'static [StepDefinition; 10] {
    &REGISTRY
}

static REGISTRY: [StepDefinition; 10] = [
    StepDefinition {
        name: StepName::UnzipGz,
        order: 10,
        idempotency: Some(archives_already_unpacked),
    },
    StepDefinition {
        name: StepName::CheckTsysGaincurve,
        order: 20,
        idempotency: Some(aux_tables_already_appended),
    },
    StepDefinition {
        name: StepName::ConvertFlag,
        order: 30,
        idempotency: Some(flag_file_exists),
    },
    StepDefinition {
        name: StepName::ImportFitsIdi,
        order: 40,
        idempotency: Some(visibility_exists),
    },
    StepDefinition {
        name: StepName::GenListOfScans,
        order: 50,
        idempotency: Some(scan_listing_exists),
    },
    StepDefinition {
        name: StepName::FlagData,
        order: 60,
        idempotency: None,
    },
    StepDefinition {
        name: StepName::GenCal,
        order: 70,
        idempotency: None,
    },
    StepDefinition {
        name: StepName::ApplyCal,
        order: 80,
        idempotency: None,
    },
    StepDefinition {
        name: StepName::FlagAutocorrelation,
        order: 90,
        idempotency: None,
    },
    StepDefinition {
        name: StepName::FlagquackIntervals,
        order: 100,
        idempotency: None,
    },
];

fn archives_already_unpacked(paths: &PathBundle) -> bool {
    match paths.antab.parent() {
        Some(calib_dir) => !probe::has_gzipped_archives(calib_dir),
        None => false,
    }
}

fn aux_tables_already_appended(paths: &PathBundle) -> bool {
    let Some(first) = paths.raw_inputs.first() else {
        return false;
    };
    probe::fits_has_extension(first, probe::TSYS_EXTENSION)
        && probe::fits_has_extension(first, probe::GAIN_CURVE_EXTENSION)
}

fn flag_file_exists(paths: &PathBundle) -> bool {
    paths.flag_file.is_file()
}

fn visibility_exists(paths: &PathBundle) -> bool {
    paths.visibility.exists()
}

fn scan_listing_exists(paths: &PathBundle) -> bool {
    paths.scan_listing.is_file()
}

/// Check registry invariants once at startup.
///
/// Catches an edited table with a duplicated name or rank before any
/// planning happens, instead of failing obscurely per call.
pub fn verify_registry() -> Result<(), PlanError> {
    let steps = registry();
    for (index, def) in steps.iter().enumerate() {
        for other in &steps[index + 1..] {
            if def.name == other.name {
                return Err(PlanError::Registry(format!(
                    "duplicate step name {}",
                    def.name
                )));
            }
            if def.order == other.order {
                return Err(PlanError::Registry(format!(
                    "steps {} and {} share rank {}",
                    def.name, other.name, def.order
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_passes_verification() {
        verify_registry().unwrap();
    }

    #[test]
    fn registry_holds_exactly_the_canonical_steps() {
        let names: Vec<_> = registry().iter().map(|def| def.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "unzip_gz",
                "check_tsys_gaincurve",
                "convert_flag",
                "import_fits_idi",
                "gen_list_of_scans",
                "flag_data",
                "gen_cal",
                "apply_cal",
                "flag_autocorrelation",
                "flagquack_intervals",
            ]
        );
    }

    #[test]
    fn ranks_strictly_increase() {
        let orders: Vec<_> = registry().iter().map(|def| def.order).collect();
        let mut sorted = orders.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(orders, sorted);
    }

    #[test]
    fn step_names_round_trip() {
        for def in registry() {
            assert_eq!(def.name.as_str().parse::<StepName>(), Ok(def.name));
        }
        assert!("not_a_step".parse::<StepName>().is_err());
    }

    #[test]
    fn calibration_generation_precedes_application() {
        let rank = |name: StepName| {
            registry()
                .iter()
                .find(|def| def.name == name)
                .map(|def| def.order)
                .unwrap()
        };
        assert!(rank(StepName::GenCal) < rank(StepName::ApplyCal));
        assert!(rank(StepName::ImportFitsIdi) < rank(StepName::FlagData));
    }
}
