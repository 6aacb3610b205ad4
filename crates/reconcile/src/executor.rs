//! Execution engine - applies a plan with parallelism across instances
//!
//! Each instance runs to completion on one worker; instances never share a
//! store, so the only shared value is the API client.

use crate::api::RemoteApi;
use crate::context::{ConfirmCallback, ProgressCallback};
use crate::diff::PlannedAction;
use crate::lifecycle::Lifecycle;
use crate::planner::{Address, ExecutionPlan, PlannedChange};
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use crate::value::AttributeStore;
use anyhow::Result;
use rayon::prelude::*;

/// What happened to one instance, and the state to record for it
#[derive(Debug, Clone)]
pub struct Outcome {
    pub address: Address,
    pub result: ApplyResult,
    /// State to record; `None` removes the instance from state
    pub state: Option<AttributeStore>,
}

/// Result of executing a plan
#[derive(Debug, Clone, Default)]
pub struct ExecuteReport {
    pub summary: ExecuteSummary,
    pub outcomes: Vec<Outcome>,
}

/// Execute a plan with the given options and callbacks
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `api` - Remote API client shared by every worker
/// * `opts` - Execution options (dry_run, jobs)
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
pub fn execute<P, C>(
    plan: ExecutionPlan,
    api: &dyn RemoteApi,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let (pending, unchanged): (Vec<PlannedChange>, Vec<PlannedChange>) =
        plan.changes.into_iter().partition(|c| c.action.is_change());

    let mut report = ExecuteReport::default();
    for change in unchanged {
        report.summary.add_result(&ApplyResult::NoChange);
        report.outcomes.push(Outcome {
            address: change.address,
            result: ApplyResult::NoChange,
            state: change.prior,
        });
    }

    if pending.is_empty() {
        return Ok(report);
    }

    if opts.dry_run {
        for change in pending {
            let result = ApplyResult::Skipped {
                reason: "Dry run".into(),
            };
            report.summary.add_result(&result);
            report.outcomes.push(Outcome {
                address: change.address,
                result,
                state: change.prior,
            });
        }
        return Ok(report);
    }

    if !confirm.confirm(&format!("Apply {} changes?", pending.len()))? {
        for change in pending {
            let result = ApplyResult::Skipped {
                reason: "Declined".into(),
            };
            report.summary.add_result(&result);
            report.outcomes.push(Outcome {
                address: change.address,
                result,
                state: change.prior,
            });
        }
        return Ok(report);
    }

    progress.on_batch_start(pending.len());
    let outcomes = if opts.jobs <= 1 || pending.len() == 1 {
        let mut outcomes = Vec::with_capacity(pending.len());
        for change in pending {
            progress.on_resource_start(&change.address.to_string(), &change.description());
            let outcome = apply_change(change, api);
            progress.on_resource_complete(&outcome.address.to_string(), &outcome.result);
            outcomes.push(outcome);
        }
        outcomes
    } else {
        execute_parallel(pending, api, opts.jobs, progress)?
    };
    progress.on_batch_complete();

    for outcome in outcomes {
        report.summary.add_result(&outcome.result);
        report.outcomes.push(outcome);
    }
    Ok(report)
}

/// Execute changes in parallel using rayon
fn execute_parallel<P: ProgressCallback>(
    pending: Vec<PlannedChange>,
    api: &dyn RemoteApi,
    jobs: usize,
    progress: &mut P,
) -> Result<Vec<Outcome>> {
    // The progress callback is not thread-safe; results are reported after.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {e}"))?;

    let outcomes: Vec<Outcome> =
        pool.install(|| pending.into_par_iter().map(|c| apply_change(c, api)).collect());

    for outcome in &outcomes {
        progress.on_resource_complete(&outcome.address.to_string(), &outcome.result);
    }
    Ok(outcomes)
}

/// Apply one planned change
fn apply_change(change: PlannedChange, api: &dyn RemoteApi) -> Outcome {
    let lifecycle = Lifecycle::new(api);
    let resource = change.resource.as_ref();
    let failed = |e: &dyn std::fmt::Display| ApplyResult::Failed {
        error: e.to_string(),
    };

    let (result, state) = match (change.action, change.prior, change.desired) {
        (PlannedAction::Create, _, Some(mut store)) => match lifecycle.create(resource, &mut store) {
            Ok(()) => (ApplyResult::Created, Some(store)),
            // keep the identifier if the object exists remotely
            Err(e) => (failed(&e), store.id().is_some().then_some(store)),
        },
        (PlannedAction::Update, Some(prior), Some(mut store)) => {
            match lifecycle.update(resource, &prior, &mut store) {
                Ok(()) => (ApplyResult::Modified, Some(store)),
                Err(e) if e.category().needs_refresh() => (failed(&e), Some(store)),
                Err(e) => (failed(&e), Some(prior)),
            }
        }
        (PlannedAction::Replace, Some(mut prior), Some(mut store)) => {
            match lifecycle.delete(resource, &mut prior) {
                Err(e) => (failed(&e), Some(prior)),
                Ok(()) => match lifecycle.create(resource, &mut store) {
                    Ok(()) => (ApplyResult::Replaced, Some(store)),
                    Err(e) => (failed(&e), store.id().is_some().then_some(store)),
                },
            }
        }
        (PlannedAction::Delete, Some(mut prior), _) => match lifecycle.delete(resource, &mut prior) {
            Ok(()) => (ApplyResult::Removed, None),
            Err(e) => (failed(&e), Some(prior)),
        },
        (PlannedAction::NoOp, prior, _) => (ApplyResult::NoChange, prior),
        (action, prior, _) => (
            ApplyResult::Skipped {
                reason: format!("inconsistent plan entry for {action:?}"),
            },
            prior,
        ),
    };

    Outcome {
        address: change.address,
        result,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Method, MockApi};
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::error::ApiError;
    use crate::planner::Instance;
    use crate::resource::{Resource, SharedResource};
    use crate::schema::{Field, ResourceSchema};
    use crate::value::Value;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Group(ResourceSchema);

    impl Resource for Group {
        fn type_name(&self) -> &'static str {
            "group"
        }

        fn api_path(&self) -> &'static str {
            "group"
        }

        fn schema(&self) -> &ResourceSchema {
            &self.0
        }
    }

    fn resource() -> SharedResource {
        Arc::new(Group(
            ResourceSchema::new()
                .field(Field::string("name").required())
                .field(Field::string("region").force_new()),
        ))
    }

    fn instance(name: &str, region: &str) -> Instance {
        let mut attributes = AttributeStore::new();
        attributes.set("name", Value::from(name));
        attributes.set("region", Value::from(region));
        Instance {
            address: Address::new("group", name),
            resource: resource(),
            attributes,
        }
    }

    fn run(plan: ExecutionPlan, api: &MockApi, jobs: usize) -> ExecuteReport {
        let opts = ExecuteOptions {
            dry_run: false,
            jobs,
        };
        execute(plan, api, &opts, &mut NoProgress, &mut AutoConfirm).unwrap()
    }

    fn recorded(report: &ExecuteReport) -> Vec<Instance> {
        report
            .outcomes
            .iter()
            .filter_map(|o| {
                o.state.clone().map(|attributes| Instance {
                    address: o.address.clone(),
                    resource: resource(),
                    attributes,
                })
            })
            .collect()
    }

    #[test]
    fn test_execute_empty_plan() {
        let api = MockApi::new();
        let report = run(ExecutionPlan::new(), &api, 4);
        assert_eq!(report.summary.total(), 0);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_create_in_parallel() {
        let api = MockApi::new();
        let desired = (0..8).map(|i| instance(&format!("g{i}"), "us")).collect();
        let report = run(ExecutionPlan::build(desired, Vec::new()), &api, 4);

        assert_eq!(report.summary.created, 8);
        assert_eq!(api.len("group"), 8);
        assert!(report.outcomes.iter().all(|o| o.state.as_ref().and_then(AttributeStore::id).is_some()));
    }

    #[test]
    fn test_second_apply_is_noop() {
        let api = MockApi::new();
        let first = run(ExecutionPlan::build(vec![instance("web", "us")], Vec::new()), &api, 1);
        let plan = ExecutionPlan::build(vec![instance("web", "us")], recorded(&first));
        assert!(plan.is_empty());

        let second = run(plan, &api, 1);
        assert_eq!(second.summary.no_change, 1);
        assert_eq!(api.calls_of(Method::Create).len(), 1);
    }

    #[test]
    fn test_replace_deletes_then_creates() {
        let api = MockApi::new();
        let first = run(ExecutionPlan::build(vec![instance("web", "us")], Vec::new()), &api, 1);
        let old_id = first.outcomes[0].state.as_ref().and_then(AttributeStore::id).unwrap().to_string();

        let plan = ExecutionPlan::build(vec![instance("web", "eu")], recorded(&first));
        let report = run(plan, &api, 1);

        assert_eq!(report.summary.replaced, 1);
        let new_id = report.outcomes[0].state.as_ref().and_then(AttributeStore::id).unwrap();
        assert_ne!(new_id, old_id);
        assert!(api.object("group", &old_id).is_none());
    }

    #[test]
    fn test_delete_removes_state() {
        let api = MockApi::new();
        let first = run(ExecutionPlan::build(vec![instance("web", "us")], Vec::new()), &api, 1);
        let report = run(ExecutionPlan::destroy(recorded(&first)), &api, 1);
        assert_eq!(report.summary.removed, 1);
        assert!(report.outcomes[0].state.is_none());
        assert!(api.is_empty());
    }

    #[test]
    fn test_failed_delete_keeps_state() {
        let api = MockApi::new();
        let first = run(ExecutionPlan::build(vec![instance("web", "us")], Vec::new()), &api, 1);
        api.fail_next(Method::Delete, ApiError::Transport("reset".into()));

        let report = run(ExecutionPlan::destroy(recorded(&first)), &api, 1);
        assert_eq!(report.summary.failed, 1);
        assert!(report.outcomes[0].state.is_some());
    }

    #[test]
    fn test_failed_create_records_nothing() {
        let api = MockApi::new();
        api.fail_next(
            Method::Create,
            ApiError::Http {
                status: 400,
                message: "bad".into(),
            },
        );
        let report = run(ExecutionPlan::build(vec![instance("web", "us")], Vec::new()), &api, 1);
        assert_eq!(report.summary.failed, 1);
        assert!(report.outcomes[0].state.is_none());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let api = MockApi::new();
        let opts = ExecuteOptions {
            dry_run: true,
            jobs: 1,
        };
        let plan = ExecutionPlan::build(vec![instance("web", "us")], Vec::new());
        let report = execute(plan, &api, &opts, &mut NoProgress, &mut AutoConfirm).unwrap();
        assert_eq!(report.summary.skipped, 1);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_declined() {
        let api = MockApi::new();
        let plan = ExecutionPlan::build(vec![instance("web", "us")], Vec::new());
        let report = execute(plan, &api, &ExecuteOptions::default(), &mut NoProgress, &mut AutoDecline).unwrap();
        assert_eq!(report.summary.skipped, 1);
        assert!(api.calls().is_empty());
    }
}
