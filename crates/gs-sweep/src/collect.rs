//! Result collection and sweep reporting.

use chrono::{DateTime, Utc};
use gs_types::{JobError, SweepResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use crate::job::{Job, JobRun};
use crate::space::GridPoint;

/// Terminal outcome of an invoked job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded { value: serde_json::Value },
    Failed { reason: String },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Result of one job that reached the routine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub job_number: usize,
    pub point: GridPoint,
    pub config_path: PathBuf,
    pub output: String,
    pub outcome: JobOutcome,
    pub worker_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl JobResult {
    pub fn new(run: JobRun, job: &Job, outcome: JobOutcome) -> Self {
        let duration_ms = run.invocation_millis();
        Self {
            job_number: run.number,
            point: run.point,
            config_path: job.config_path().to_path_buf(),
            output: job.output().to_string(),
            outcome,
            worker_id: run.worker_id,
            started_at: run.created_at,
            finished_at: run.finished_at,
            duration_ms,
        }
    }
}

/// A grid point abandoned before invocation (rendering, naming or writing
/// the config failed).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFailure {
    pub job_number: usize,
    pub point: GridPoint,
    /// The unresolved placeholder, when that was the cause.
    pub missing_parameter: Option<String>,
    pub reason: String,
}

impl RenderFailure {
    pub fn new(run: JobRun, error: &JobError) -> Self {
        Self {
            job_number: run.number,
            point: run.point,
            missing_parameter: error.missing_parameter().map(str::to_string),
            reason: error.to_string(),
        }
    }
}

/// What the dispatcher hands back for each grid point.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Invoked(JobResult),
    Abandoned(RenderFailure),
}

#[derive(Debug, Default)]
struct CollectorState {
    submitted: usize,
    results: Vec<JobResult>,
    rendering_failures: Vec<RenderFailure>,
}

/// Thread-safe sink for job completions.
///
/// Workers record completions concurrently; the collector keeps every one.
/// `finish` produces the report once the dispatcher has joined its workers.
#[derive(Debug, Default)]
pub struct ResultCollector {
    state: Mutex<CollectorState>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note that a grid point has been handed to the dispatcher.
    pub fn submit(&self) {
        self.state.lock().submitted += 1;
    }

    pub fn record(&self, completion: Completion) {
        let mut state = self.state.lock();
        match completion {
            Completion::Invoked(result) => state.results.push(result),
            Completion::Abandoned(failure) => state.rendering_failures.push(failure),
        }
    }

    /// Submitted grid points without a recorded completion.
    pub fn pending(&self) -> usize {
        let state = self.state.lock();
        state
            .submitted
            .saturating_sub(state.results.len() + state.rendering_failures.len())
    }

    pub fn finish(
        self,
        sweep_id: Uuid,
        strategy: String,
        started_at: DateTime<Utc>,
    ) -> SweepReport {
        let state = self.state.into_inner();
        let recorded = state.results.len() + state.rendering_failures.len();
        if recorded != state.submitted {
            warn!(
                submitted = state.submitted,
                recorded, "sweep finished with unaccounted grid points"
            );
        }
        SweepReport {
            sweep_id,
            strategy,
            started_at,
            finished_at: Utc::now(),
            total_points: state.submitted,
            results: state.results,
            rendering_failures: state.rendering_failures,
        }
    }
}

/// Everything a sweep produced, for printing or exit-code decisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub sweep_id: Uuid,
    pub strategy: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_points: usize,
    /// Invoked jobs, in completion order.
    pub results: Vec<JobResult>,
    pub rendering_failures: Vec<RenderFailure>,
}

impl SweepReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_success()).count()
    }

    /// Invoked jobs whose routine call failed.
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn abandoned(&self) -> usize {
        self.rendering_failures.len()
    }

    /// True when every grid point was invoked and succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && self.abandoned() == 0
    }

    /// Invoked jobs in grid expansion order.
    pub fn results_in_grid_order(&self) -> Vec<&JobResult> {
        let mut ordered: Vec<&JobResult> = self.results.iter().collect();
        ordered.sort_by_key(|r| r.job_number);
        ordered
    }

    pub fn outcome_for(&self, point: &GridPoint) -> Option<&JobOutcome> {
        self.results
            .iter()
            .find(|r| &r.point == point)
            .map(|r| &r.outcome)
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> SweepResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "{} grid points: {} succeeded, {} failed, {} not run",
            self.total_points,
            self.succeeded(),
            self.failed(),
            self.abandoned()
        )
    }
}
