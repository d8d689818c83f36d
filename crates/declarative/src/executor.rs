//! Execution engine - runs planned changes with bounded parallelism
//!
//! Independent resource instances are reconciled concurrently on a rayon
//! pool. Each task drives its own controller, so no state is shared between
//! tasks besides the transport.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::plan::Action;

/// Result of running one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Created; carries the new tracked state
    Created { state: Value },
    /// Updated; carries the new tracked state
    Updated { state: Value },
    /// Deleted, or found already gone
    Deleted,
    /// Failed; tracked state is unchanged
    Failed { error: String },
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created { .. } | Self::Updated { .. } | Self::Deleted
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of tasks processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created { .. } => self.created += 1,
            ApplyResult::Updated { .. } => self.updated += 1,
            ApplyResult::Deleted => self.deleted += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
        }
    }
}

/// One unit of reconciliation work.
pub trait Task: Send + Sync {
    /// Address of the instance, e.g. `devhub_dashboard.ops`
    fn address(&self) -> &str;

    fn action(&self) -> Action;

    /// Run the remote calls. Must not panic on remote failure.
    fn run(&self) -> ApplyResult;
}

/// Results in task order, plus their summary
#[derive(Debug, Default)]
pub struct ExecuteReport {
    pub results: Vec<(String, ApplyResult)>,
    pub summary: ExecuteSummary,
}

impl ExecuteReport {
    fn from_results(results: Vec<(String, ApplyResult)>) -> Self {
        let mut summary = ExecuteSummary::default();
        for (_, result) in &results {
            summary.add_result(result);
        }
        Self { results, summary }
    }
}

/// Execute tasks with the given options and callbacks
///
/// Deletions require confirmation. In a dry run, every task is skipped.
pub fn execute<P, C>(
    tasks: &[Box<dyn Task>],
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let pending: Vec<&dyn Task> = tasks
        .iter()
        .map(|t| &**t)
        .filter(|t| t.action() != Action::NoOp)
        .collect();

    if pending.is_empty() {
        return Ok(ExecuteReport::default());
    }

    if opts.dry_run {
        return Ok(skip_all(&pending, "Dry run"));
    }

    let deletions = pending
        .iter()
        .filter(|t| t.action() == Action::Delete)
        .count();
    if deletions > 0 && !confirm.confirm(&format!("Delete {deletions} resource(s)?"))? {
        return Ok(skip_all(&pending, "Declined"));
    }

    progress.on_batch_start(pending.len());
    let results = if opts.jobs <= 1 || pending.len() == 1 {
        execute_sequential(&pending, progress)
    } else {
        execute_parallel(&pending, opts.jobs, progress)?
    };
    progress.on_batch_complete();

    Ok(ExecuteReport::from_results(results))
}

fn skip_all(tasks: &[&dyn Task], reason: &str) -> ExecuteReport {
    ExecuteReport::from_results(
        tasks
            .iter()
            .map(|t| {
                (
                    t.address().to_string(),
                    ApplyResult::Skipped {
                        reason: reason.to_string(),
                    },
                )
            })
            .collect(),
    )
}

fn execute_sequential<P: ProgressCallback>(
    tasks: &[&dyn Task],
    progress: &mut P,
) -> Vec<(String, ApplyResult)> {
    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        progress.on_task_start(task.address());
        let result = task.run();
        progress.on_task_complete(task.address(), &result);
        results.push((task.address().to_string(), result));
    }
    results
}

/// Execute tasks in parallel using rayon
fn execute_parallel<P: ProgressCallback>(
    tasks: &[&dyn Task],
    jobs: usize,
    progress: &mut P,
) -> Result<Vec<(String, ApplyResult)>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to create thread pool")?;

    // The progress callback is not thread-safe; report after the batch.
    let results: Vec<(String, ApplyResult)> = pool.install(|| {
        tasks
            .par_iter()
            .map(|task| (task.address().to_string(), task.run()))
            .collect()
    });

    for (address, result) in &results {
        progress.on_task_complete(address, result);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct TestTask {
        address: String,
        action: Action,
        runs: Arc<AtomicUsize>,
    }

    impl Task for TestTask {
        fn address(&self) -> &str {
            &self.address
        }

        fn action(&self) -> Action {
            self.action
        }

        fn run(&self) -> ApplyResult {
            self.runs.fetch_add(1, Ordering::SeqCst);
            match self.action {
                Action::Create => ApplyResult::Created {
                    state: json!({ "id": self.address }),
                },
                Action::Update => ApplyResult::Failed {
                    error: "status 500".to_string(),
                },
                Action::Delete => ApplyResult::Deleted,
                Action::NoOp => ApplyResult::NoChange,
            }
        }
    }

    fn tasks(actions: &[Action], runs: &Arc<AtomicUsize>) -> Vec<Box<dyn Task>> {
        actions
            .iter()
            .enumerate()
            .map(|(i, action)| {
                Box::new(TestTask {
                    address: format!("test.t{i}"),
                    action: *action,
                    runs: Arc::clone(runs),
                }) as Box<dyn Task>
            })
            .collect()
    }

    #[test]
    fn test_execute_empty() {
        let report = execute(
            &[],
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();
        assert_eq!(report.summary.total(), 0);
    }

    #[test]
    fn test_execute_skips_noop_tasks() {
        let runs = Arc::new(AtomicUsize::new(0));
        let tasks = tasks(&[Action::NoOp, Action::NoOp], &runs);
        let report = execute(
            &tasks,
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();
        assert_eq!(report.summary.total(), 0);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_execute_parallel_keeps_order() {
        let runs = Arc::new(AtomicUsize::new(0));
        let tasks = tasks(
            &[Action::Create, Action::Update, Action::Delete, Action::Create],
            &runs,
        );
        let report = execute(
            &tasks,
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 4);
        assert_eq!(report.summary.created, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.deleted, 1);
        assert!(!report.summary.is_success());
        let addresses: Vec<_> = report.results.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(addresses, ["test.t0", "test.t1", "test.t2", "test.t3"]);
    }

    #[test]
    fn test_dry_run_runs_nothing() {
        let runs = Arc::new(AtomicUsize::new(0));
        let tasks = tasks(&[Action::Create, Action::Delete], &runs);
        let opts = ExecuteOptions {
            dry_run: true,
            jobs: 1,
        };
        let report = execute(&tasks, &opts, &mut NoProgress, &mut AutoConfirm).unwrap();
        assert_eq!(report.summary.skipped, 2);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_declined_deletion_skips_everything() {
        let runs = Arc::new(AtomicUsize::new(0));
        let tasks = tasks(&[Action::Create, Action::Delete], &runs);
        let report = execute(
            &tasks,
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();
        assert_eq!(report.summary.skipped, 2);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_creates_need_no_confirmation() {
        let runs = Arc::new(AtomicUsize::new(0));
        let tasks = tasks(&[Action::Create], &runs);
        let report = execute(
            &tasks,
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();
        assert_eq!(report.summary.created, 1);
    }
}
