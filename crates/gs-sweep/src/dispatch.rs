//! Job construction and dispatch, sequential or over a bounded worker pool.

use crossbeam_channel::SendError;
use gs_types::JobError;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tracing::{debug, error, info, warn};

use crate::collect::{Completion, JobOutcome, JobResult, RenderFailure, ResultCollector};
use crate::job::{Job, JobRun};
use crate::naming::NameResolver;
use crate::routine::FitRoutine;
use crate::space::{AuxiliaryValues, GridPoint};
use crate::template::Template;

/// How jobs are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    /// One job at a time, in grid order, on the calling thread.
    Sequential,
    /// A fixed pool of worker threads pulling jobs from a shared queue.
    Parallel { workers: usize },
}

impl ExecutionStrategy {
    /// `n <= 1` runs sequentially.
    pub fn from_workers(n: usize) -> Self {
        if n <= 1 {
            Self::Sequential
        } else {
            Self::Parallel { workers: n }
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Parallel { workers } => *workers,
        }
    }
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Parallel { workers } => write!(f, "parallel ({workers} workers)"),
        }
    }
}

/// Turns a grid point into a ready-to-invoke [`Job`].
///
/// Holds only read-only inputs, so one builder is shared by all workers.
#[derive(Debug, Clone)]
pub struct JobBuilder<'a> {
    template: &'a Template,
    names: &'a NameResolver,
    aux: &'a AuxiliaryValues,
    prefix: Vec<String>,
}

impl<'a> JobBuilder<'a> {
    pub fn new(
        template: &'a Template,
        names: &'a NameResolver,
        aux: &'a AuxiliaryValues,
        prefix: Vec<String>,
    ) -> Self {
        Self {
            template,
            names,
            aux,
            prefix,
        }
    }

    /// Resolve names, render the config to disk, and assemble arguments.
    ///
    /// Names are resolved before anything is written, so a naming failure
    /// leaves no config file behind.
    pub fn build(&self, number: usize, point: &GridPoint) -> Result<Job, JobError> {
        let names = self
            .names
            .resolve(point, self.aux)
            .map_err(JobError::Naming)?;
        self.template
            .render_to_file(point, self.aux, &names.config_path)?;
        Ok(Job::new(
            number,
            point.clone(),
            names.config_path,
            names.output,
            &self.prefix,
        ))
    }
}

/// Runs every grid point through build and invoke, isolating failures per
/// job.
pub struct JobDispatcher<'a, R: FitRoutine + ?Sized> {
    builder: JobBuilder<'a>,
    routine: &'a R,
    strategy: ExecutionStrategy,
}

impl<'a, R: FitRoutine + ?Sized> JobDispatcher<'a, R> {
    pub fn new(builder: JobBuilder<'a>, routine: &'a R, strategy: ExecutionStrategy) -> Self {
        Self {
            builder,
            routine,
            strategy,
        }
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Dispatch all points and return once every one has reached a terminal
    /// state and been recorded.
    pub fn dispatch<I>(&self, points: I, collector: &ResultCollector)
    where
        I: IntoIterator<Item = GridPoint>,
    {
        match self.strategy {
            ExecutionStrategy::Sequential => {
                for (number, point) in points.into_iter().enumerate() {
                    collector.submit();
                    collector.record(self.run_job(number, point, None));
                }
            }
            ExecutionStrategy::Parallel { workers } => {
                self.dispatch_parallel(points, workers, collector)
            }
        }
    }

    fn dispatch_parallel<I>(&self, points: I, workers: usize, collector: &ResultCollector)
    where
        I: IntoIterator<Item = GridPoint>,
    {
        let points = points.into_iter();
        let workers = points
            .size_hint()
            .1
            .map_or(workers, |size| workers.min(size))
            .max(1);
        let (tx, rx) = crossbeam_channel::bounded::<(usize, GridPoint)>(workers.saturating_mul(2));

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let rx = rx.clone();
                let worker_id = format!("worker-{worker}");
                let spawned = thread::Builder::new()
                    .name(worker_id.clone())
                    .spawn_scoped(scope, move || {
                        for (number, point) in rx.iter() {
                            collector.record(self.run_job(number, point, Some(worker_id.clone())));
                        }
                        debug!(worker = %worker_id, "queue drained");
                    });
                if let Err(err) = spawned {
                    error!(worker, error = %err, "failed to spawn worker thread");
                }
            }
            drop(rx);

            for (number, point) in points.enumerate() {
                collector.submit();
                if let Err(SendError((number, point))) = tx.send((number, point)) {
                    warn!(job = number, "no worker accepted the grid point, running it inline");
                    collector.record(self.run_job(number, point, None));
                }
            }
            // Closing the queue lets workers exit once it drains; the scope
            // joins them before returning.
            drop(tx);
        });
    }

    /// Build and invoke one job. A panic while rendering or inside the
    /// routine is confined to this job.
    pub fn run_job(&self, number: usize, point: GridPoint, worker_id: Option<String>) -> Completion {
        let mut run = JobRun::new(number, point, worker_id);

        run.mark_rendering();
        let job = match contain(|| self.builder.build(number, &run.point)) {
            Ok(job) => job,
            Err(err) => {
                warn!(job = number, point = %run.point, error = %err, "skipping grid point");
                run.mark_failed();
                return Completion::Abandoned(RenderFailure::new(run, &err));
            }
        };

        run.mark_invoking();
        info!(
            job = number,
            point = %job.point(),
            output = job.output(),
            "running {}",
            self.routine.name()
        );
        debug!(job = number, args = %job.args(), "invocation arguments");

        let outcome = match contain(|| self.routine.invoke(job.args())) {
            Ok(value) => JobOutcome::Succeeded { value },
            Err(err) => JobOutcome::Failed {
                reason: err.to_string(),
            },
        };

        match &outcome {
            JobOutcome::Succeeded { .. } => {
                run.mark_succeeded();
                info!(job = number, output = job.output(), "job succeeded");
            }
            JobOutcome::Failed { reason } => {
                run.mark_failed();
                warn!(job = number, point = %job.point(), %reason, "job failed");
            }
        }

        Completion::Invoked(JobResult::new(run, &job, outcome))
    }
}

/// Run one job step, turning a panic into `JobError::Panicked`.
fn contain<T>(step: impl FnOnce() -> Result<T, JobError>) -> Result<T, JobError> {
    panic::catch_unwind(AssertUnwindSafe(step)).unwrap_or_else(|payload| {
        Err(JobError::Panicked {
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
