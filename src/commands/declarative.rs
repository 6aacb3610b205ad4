//! Declarative commands
//!
//! - `validate` - Check a desired-state file offline
//! - `plan` - Preview what apply would change, from local state only
//! - `apply` - Make remote objects match the desired-state file
//! - `refresh` - Re-read managed objects, dropping ones deleted remotely
//! - `destroy` - Delete managed objects

use anyhow::{Context as AnyhowContext, Result, bail};
use rayon::prelude::*;
use reconcile::{
    Address, ExecuteOptions, ExecuteSummary, ExecutionPlan, Instance, Lifecycle, ReadOutcome,
    RemoteApi, execute,
};
use std::path::Path;

use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs};
use crate::desired;
use crate::progress::{self, BarProgress, PromptConfirm};
use crate::resource::Registry;
use crate::state::StateFile;
use crate::ui;

// ============================================================================
// Target Matching
// ============================================================================

/// Whether `address` is selected by a `type` or `type.name` target
fn matches_target(address: &Address, target: Option<&str>) -> bool {
    match target.map(|t| t.split_once('.')) {
        None => true,
        Some(None) => target == Some(address.kind.as_str()),
        Some(Some((kind, name))) => address.kind == kind && address.name == name,
    }
}

// ============================================================================
// Validate
// ============================================================================

pub fn validate(ctx: &Context, file: &Path) -> Result<()> {
    let registry = Registry::new();
    let instances = desired::load(file, &registry)?;
    check(&instances)?;
    if !ctx.quiet {
        ui::success(&format!(
            "{} is valid ({} instances)",
            file.display(),
            instances.len()
        ));
    }
    Ok(())
}

/// Print every diagnostic; fail if any is an error
fn check(instances: &[Instance]) -> Result<()> {
    let report = desired::validate(instances);
    let mut errors = 0;
    for (address, diags) in &report {
        ui::print_diagnostics(&address.to_string(), diags);
        errors += diags.iter().filter(|d| d.is_error()).count();
    }
    if errors > 0 {
        bail!("Configuration has {errors} error(s)");
    }
    Ok(())
}

// ============================================================================
// Plan
// ============================================================================

pub fn plan(ctx: &Context, file: &Path, target: Option<&str>) -> Result<()> {
    let state = StateFile::load(&ctx.state_path()?)?;
    let plan = build_plan(file, &state, target)?;
    ui::print_plan(&plan);
    Ok(())
}

/// Validate the desired file and compare it with recorded state
fn build_plan(file: &Path, state: &StateFile, target: Option<&str>) -> Result<ExecutionPlan> {
    let registry = Registry::new();
    let wanted = desired::load(file, &registry)?;
    check(&wanted)?;
    let recorded = state.to_instances(&registry)?;
    Ok(ExecutionPlan::build(wanted, recorded).filter_by_target(target))
}

// ============================================================================
// Apply
// ============================================================================

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let path = ctx.state_path()?;
    let mut state = StateFile::load(&path)?;
    let plan = build_plan(&args.file, &state, args.target.as_deref())?;
    ui::print_plan(&plan);
    if plan.is_empty() {
        return Ok(());
    }
    if args.dry_run {
        println!();
        ui::info("Dry run - no changes made");
        return Ok(());
    }

    let client = ctx.client()?;
    let summary = run_plan(ctx, plan, &client, &mut state, &path, args.yes, args.jobs as usize)?;
    ui::print_summary(&summary);
    finish(&summary)
}

/// Execute a plan and record every outcome in state
///
/// State is saved even when some instances failed, so objects that were
/// created are never forgotten.
fn run_plan(
    ctx: &Context,
    plan: ExecutionPlan,
    api: &dyn RemoteApi,
    state: &mut StateFile,
    state_path: &Path,
    yes: bool,
    jobs: usize,
) -> Result<ExecuteSummary> {
    let opts = ExecuteOptions {
        dry_run: false,
        jobs: jobs.max(1),
    };
    let mut progress = BarProgress::new(ctx.quiet);
    let mut confirm = PromptConfirm { assume_yes: yes };
    let report = execute(plan, api, &opts, &mut progress, &mut confirm)?;

    state.record(&report.outcomes)?;
    state.save(state_path)?;

    if ctx.verbose > 0 {
        for outcome in &report.outcomes {
            ui::dim(&format!("{} {}", progress::symbol(&outcome.result), outcome.address));
        }
    }
    Ok(report.summary)
}

fn finish(summary: &ExecuteSummary) -> Result<()> {
    if !summary.is_success() {
        bail!("{} of {} resources failed", summary.failed, summary.total());
    }
    Ok(())
}

// ============================================================================
// Refresh
// ============================================================================

/// Counts from one refresh run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub removed: usize,
    pub failed: usize,
}

pub fn refresh(ctx: &Context, target: Option<&str>, jobs: usize) -> Result<()> {
    let path = ctx.state_path()?;
    let mut state = StateFile::load(&path)?;
    if state.is_empty() {
        ui::info("No managed resources in state");
        return Ok(());
    }

    let client = ctx.client()?;
    let summary = refresh_with(ctx, &client, &mut state, target, jobs)?;
    state.save(&path)?;

    if !ctx.quiet {
        ui::success(&format!(
            "Refreshed {} resources, {} removed from state",
            summary.refreshed, summary.removed
        ));
    }
    if summary.failed > 0 {
        bail!("{} resources could not be refreshed", summary.failed);
    }
    Ok(())
}

/// Read every targeted instance in parallel and update `state`
fn refresh_with(
    ctx: &Context,
    api: &dyn RemoteApi,
    state: &mut StateFile,
    target: Option<&str>,
    jobs: usize,
) -> Result<RefreshSummary> {
    let registry = Registry::new();
    let instances: Vec<Instance> = state
        .to_instances(&registry)?
        .into_iter()
        .filter(|i| matches_target(&i.address, target))
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to create refresh thread pool")?;

    let pb = if ctx.quiet {
        indicatif::ProgressBar::hidden()
    } else {
        progress::bar(instances.len() as u64, "Refreshing")
    };
    let results: Vec<_> = pool.install(|| {
        instances
            .into_par_iter()
            .map(|mut instance| {
                let outcome = Lifecycle::new(api).read(instance.resource.as_ref(), &mut instance.attributes);
                pb.inc(1);
                (instance, outcome)
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut summary = RefreshSummary::default();
    for (instance, outcome) in results {
        match outcome {
            Ok(ReadOutcome::Present) => {
                state.upsert(&instance.address, &instance.attributes)?;
                summary.refreshed += 1;
            }
            Ok(ReadOutcome::Gone) => {
                state.remove(&instance.address);
                summary.removed += 1;
            }
            Err(e) => {
                ui::error(&format!("{}: {e}", instance.address));
                ui::dim(e.category().advice());
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

// ============================================================================
// Destroy
// ============================================================================

pub fn destroy(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    let path = ctx.state_path()?;
    let mut state = StateFile::load(&path)?;
    let plan = destroy_plan(&state, args.target.as_deref())?;
    ui::print_plan(&plan);
    if plan.is_empty() {
        return Ok(());
    }

    let client = ctx.client()?;
    let summary = run_plan(ctx, plan, &client, &mut state, &path, args.yes, args.jobs as usize)?;
    ui::print_summary(&summary);
    finish(&summary)
}

fn destroy_plan(state: &StateFile, target: Option<&str>) -> Result<ExecutionPlan> {
    let recorded = state.to_instances(&Registry::new())?;
    Ok(ExecutionPlan::destroy(recorded).filter_by_target(target))
}
