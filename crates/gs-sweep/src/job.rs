//! Jobs: one rendered config plus one invocation of the fitting routine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::space::GridPoint;

/// Invocation arguments shared by every job in a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedArgs {
    /// Leading tokens, e.g. `["fit"]`.
    pub subcommand: Vec<String>,
    pub experiments: Vec<PathBuf>,
    pub method: PathBuf,
    pub kinetics: PathBuf,
    /// Objective-function / minimizer name passed with `-f`.
    pub function: String,
}

impl FixedArgs {
    /// `<subcommand> -e <experiments...> -m <method> -d <kinetics> -f <function>`
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = self.subcommand.clone();
        tokens.push("-e".to_string());
        tokens.extend(self.experiments.iter().map(|p| p.display().to_string()));
        tokens.push("-m".to_string());
        tokens.push(self.method.display().to_string());
        tokens.push("-d".to_string());
        tokens.push(self.kinetics.display().to_string());
        tokens.push("-f".to_string());
        tokens.push(self.function.clone());
        tokens
    }
}

/// The complete, immutable argument list for one invocation.
///
/// Built fresh for each job and handed to the routine by reference; nothing
/// is shared or mutated between jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationArgs {
    tokens: Vec<String>,
}

impl InvocationArgs {
    /// `prefix + -p <config_path> + -o <output>`
    pub fn new(prefix: &[String], config_path: &Path, output: &str) -> Self {
        let mut tokens = Vec::with_capacity(prefix.len() + 4);
        tokens.extend_from_slice(prefix);
        tokens.push("-p".to_string());
        tokens.push(config_path.display().to_string());
        tokens.push("-o".to_string());
        tokens.push(output.to_string());
        Self { tokens }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The token following the first occurrence of `flag`.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.tokens
            .iter()
            .position(|t| t == flag)
            .and_then(|i| self.tokens.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for InvocationArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

/// A fully prepared job: config rendered, names resolved, arguments built.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    number: usize,
    point: GridPoint,
    config_path: PathBuf,
    output: String,
    args: InvocationArgs,
}

impl Job {
    pub fn new(
        number: usize,
        point: GridPoint,
        config_path: PathBuf,
        output: String,
        prefix: &[String],
    ) -> Self {
        let args = InvocationArgs::new(prefix, &config_path, &output);
        Self {
            number,
            point,
            config_path,
            output,
            args,
        }
    }

    /// Position of the grid point in expansion order (0-indexed).
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn point(&self) -> &GridPoint {
        &self.point
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn args(&self) -> &InvocationArgs {
        &self.args
    }
}

/// Per-job lifecycle: `Pending -> Rendering -> Invoking -> {Succeeded, Failed}`.
///
/// A job may also fail straight from `Rendering`. There is no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Rendering,
    Invoking,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Tracking record for one grid point as it moves through dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRun {
    pub number: usize,
    pub point: GridPoint,
    pub status: JobStatus,
    pub worker_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub invoked_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRun {
    pub fn new(number: usize, point: GridPoint, worker_id: Option<String>) -> Self {
        Self {
            number,
            point,
            status: JobStatus::Pending,
            worker_id,
            created_at: Utc::now(),
            invoked_at: None,
            finished_at: None,
        }
    }

    pub fn mark_rendering(&mut self) {
        self.status = JobStatus::Rendering;
    }

    pub fn mark_invoking(&mut self) {
        self.status = JobStatus::Invoking;
        self.invoked_at = Some(Utc::now());
    }

    pub fn mark_succeeded(&mut self) {
        self.status = JobStatus::Succeeded;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self) {
        self.status = JobStatus::Failed;
        self.finished_at = Some(Utc::now());
    }

    /// Milliseconds spent in the routine, if it was invoked and has finished.
    pub fn invocation_millis(&self) -> Option<u64> {
        let elapsed = self.finished_at? - self.invoked_at?;
        u64::try_from(elapsed.num_milliseconds()).ok()
    }
}
