//! End-to-end pipeline behavior against a temporary working layout.
//!
//! Uses a recording delegate that writes the same artifacts the real CASA
//! tasks would, so a re-run exercises the idempotency skips the same way a
//! resumed production run does.
use evncal::context::ExperimentContext;
use evncal::delegate::StepDelegate;
use evncal::error::StepError;
use evncal::paths::{self, PathBundle};
use evncal::pipeline::{self, StepName, StepStatus};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Delegate that fakes each CASA task by writing its output artifact.
struct ArtifactDelegate {
    invoked: RefCell<Vec<StepName>>,
}

impl ArtifactDelegate {
    fn new() -> Self {
        Self {
            invoked: RefCell::new(Vec::new()),
        }
    }

    fn invocations(&self) -> Vec<StepName> {
        self.invoked.borrow().clone()
    }
}

impl StepDelegate for ArtifactDelegate {
    fn invoke(
        &self,
        step: StepName,
        _ctx: &ExperimentContext,
        paths: &PathBundle,
    ) -> Result<(), StepError> {
        self.invoked.borrow_mut().push(step);
        match step {
            StepName::ConvertFlag => touch(&paths.flag_file),
            StepName::ImportFitsIdi => {
                fs::create_dir_all(&paths.visibility).expect("create measurement set");
            }
            StepName::GenListOfScans => touch(&paths.scan_listing),
            _ => {}
        }
        Ok(())
    }
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().expect("artifact has a parent")).expect("create parent");
    fs::write(path, b"").expect("write artifact");
}

/// Lay out an experiment with raw inputs and calibration aux files.
fn seeded_layout(identifier: &str) -> (TempDir, ExperimentContext) {
    let root = TempDir::new().expect("create temp root");
    let fits = root.path().join("fits");
    fs::create_dir(&fits).expect("create fits dir");
    for suffix in ["IDI1", "IDI2"] {
        fs::write(fits.join(format!("{identifier}_1_1.{suffix}")), b"").expect("seed raw input");
    }
    let calib = root.path().join("pipeline_calibration");
    fs::create_dir(&calib).expect("create calib dir");
    fs::write(calib.join(format!("{identifier}.antab")), b"").expect("seed antab");
    fs::write(calib.join(format!("{identifier}.uvflg")), b"").expect("seed uvflg");

    let ctx = ExperimentContext::new(identifier, root.path().to_path_buf());
    (root, ctx)
}

#[test]
fn full_run_then_rerun_skips_completed_work() {
    let (_root, ctx) = seeded_layout("ek051");
    let delegate = ArtifactDelegate::new();
    let plan = pipeline::plan(&pipeline::canonical_step_names()).expect("plan all steps");

    let bundle = paths::resolve(&ctx).expect("resolve paths");
    let outcomes = pipeline::run(&plan, &ctx, &bundle, &delegate);
    assert_eq!(outcomes.len(), 10);
    // unzip_gz skips (nothing gzipped); everything else runs.
    assert_eq!(outcomes[0].name, StepName::UnzipGz);
    assert_eq!(outcomes[0].status, StepStatus::Skipped);
    for outcome in &outcomes[1..] {
        assert_eq!(
            outcome.status,
            StepStatus::Succeeded,
            "step {} should succeed",
            outcome.name
        );
    }

    // Re-resolve and re-run: steps whose artifacts now exist are skipped
    // without reaching the delegate.
    let before = delegate.invocations().len();
    let bundle = paths::resolve(&ctx).expect("re-resolve paths");
    let outcomes = pipeline::run(&plan, &ctx, &bundle, &delegate);
    let statuses: Vec<_> = outcomes
        .iter()
        .map(|outcome| (outcome.name, outcome.status))
        .collect();
    for (name, status) in &statuses {
        match name {
            StepName::ConvertFlag | StepName::ImportFitsIdi | StepName::GenListOfScans => {
                assert_eq!(*status, StepStatus::Skipped, "step {name} should skip");
            }
            _ => {}
        }
    }
    let rerun_invocations = &delegate.invocations()[before..];
    assert!(!rerun_invocations.contains(&StepName::ImportFitsIdi));
    assert!(!rerun_invocations.contains(&StepName::GenListOfScans));
}

#[test]
fn missing_aux_input_fails_one_step_but_not_the_run() {
    let (_root, ctx) = seeded_layout("ek051");
    // Remove the ANTAB so the real delegate's precondition would trip; the
    // scripted equivalent here raises MissingInput for that step only.
    struct OneMissing;
    impl StepDelegate for OneMissing {
        fn invoke(
            &self,
            step: StepName,
            _ctx: &ExperimentContext,
            _paths: &PathBundle,
        ) -> Result<(), StepError> {
            if step == StepName::CheckTsysGaincurve {
                return Err(StepError::MissingInput("ANTAB file missing".to_string()));
            }
            Ok(())
        }
    }

    let bundle = paths::resolve(&ctx).expect("resolve paths");
    let plan =
        pipeline::plan(&["check_tsys_gaincurve".into(), "convert_flag".into()]).expect("plan");
    let outcomes = pipeline::run(&plan, &ctx, &bundle, &OneMissing);

    assert_eq!(outcomes[0].status, StepStatus::Failed);
    assert!(outcomes[0]
        .detail
        .as_deref()
        .expect("failure detail")
        .contains("missing input"));
    assert_eq!(outcomes[1].status, StepStatus::Succeeded);
}

#[test]
fn invalid_identifier_never_reaches_the_delegate() {
    let root = TempDir::new().expect("create temp root");
    let ctx = ExperimentContext::new("bad/id", root.path().to_path_buf());
    assert!(paths::resolve(&ctx).is_err());
}

#[test]
fn outcome_log_serializes_to_json() {
    let (_root, ctx) = seeded_layout("ek051");
    let delegate = ArtifactDelegate::new();
    let plan = pipeline::plan(&["gen_cal".into()]).expect("plan");
    let bundle = paths::resolve(&ctx).expect("resolve paths");
    let outcomes = pipeline::run(&plan, &ctx, &bundle, &delegate);

    let json = serde_json::to_value(&outcomes).expect("serialize outcomes");
    assert_eq!(json[0]["name"], "gen_cal");
    assert_eq!(json[0]["status"], "succeeded");
    assert!(json[0]["elapsed_ms"].is_u64());
}
