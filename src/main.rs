use anyhow::Result;
use clap::Parser;
use evncal::cli::RootArgs;
use evncal::context::ExperimentContext;
use evncal::delegate::CasaDelegate;
use evncal::paths;
use evncal::pipeline::{self, StepOutcome, StepStatus};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    pipeline::verify_registry()?;
    let delegate = CasaDelegate::new(&args.casa_cmd)?;

    let requested = if args.steps.is_empty() {
        pipeline::canonical_step_names()
    } else {
        args.steps.clone()
    };
    // Planning is shared across the batch; a bad step list fails before any
    // experiment is touched.
    let plan = pipeline::plan(&requested)?;

    let root = match &args.root {
        Some(root) => root.clone(),
        None => std::env::current_dir()?,
    };

    let mut logs = Vec::with_capacity(args.identifiers.len());
    for identifier in &args.identifiers {
        let ctx = build_context(&args, identifier, root.clone());
        tracing::info!(experiment = %ctx.identifier, steps = plan.len(), "starting run");

        // A fatal resolve error aborts the remaining identifiers too; the
        // operator isolates runs by invoking once per identifier.
        let bundle = paths::resolve(&ctx)?;
        let outcomes = pipeline::run(&plan, &ctx, &bundle, &delegate);
        if !args.json {
            print_summary(identifier, &outcomes);
        }
        logs.push((identifier.clone(), outcomes));
    }

    if args.json {
        print_json(&logs)?;
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_context(args: &RootArgs, identifier: &str, root: std::path::PathBuf) -> ExperimentContext {
    let mut ctx = ExperimentContext::new(identifier, root);
    if let Some(workdir) = &args.workdir {
        ctx.work_dir = workdir.clone();
    }
    if let Some(fits_dir) = &args.fits_dir {
        ctx.fits_dir = fits_dir.clone();
    }
    if let Some(calib_dir) = &args.calib_dir {
        ctx.calib_dir = calib_dir.clone();
    }
    if let Some(refant) = &args.refant {
        ctx.ref_antenna = refant.clone();
    }
    ctx
}

fn print_summary(identifier: &str, outcomes: &[StepOutcome]) {
    println!("{identifier}:");
    for outcome in outcomes {
        let status = match outcome.status {
            StepStatus::Succeeded => "ok",
            StepStatus::Skipped => "skipped",
            StepStatus::Failed => "FAILED",
        };
        let detail = outcome
            .detail
            .as_deref()
            .map(|detail| format!(" ({detail})"))
            .unwrap_or_default();
        println!(
            "  {status:>7}  {name}  {ms}ms{detail}",
            name = outcome.name,
            ms = outcome.elapsed.as_millis()
        );
    }
}

fn print_json(logs: &[(String, Vec<StepOutcome>)]) -> Result<()> {
    let rendered: Vec<serde_json::Value> = logs
        .iter()
        .map(|(identifier, outcomes)| {
            Ok(serde_json::json!({
                "experiment": identifier,
                "outcomes": serde_json::to_value(outcomes)?,
            }))
        })
        .collect::<Result<_>>()?;
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}
