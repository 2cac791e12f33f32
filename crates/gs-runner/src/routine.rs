//! Process-backed fitting routines.

use gs_sweep::{FitRoutine, InvocationArgs};
use gs_types::JobError;
use serde_json::json;
use std::process::{Command, Stdio};
use tracing::{debug, info};

const DEFAULT_TAIL_LINES: usize = 20;

/// Runs the fitting routine as an external command, one process per job.
#[derive(Debug, Clone)]
pub struct CommandRoutine {
    program: String,
    tail_lines: usize,
}

impl CommandRoutine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    /// Lines of stdout/stderr kept in results and error messages.
    pub fn with_tail_lines(mut self, lines: usize) -> Self {
        self.tail_lines = lines;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl FitRoutine for CommandRoutine {
    fn invoke(&self, args: &InvocationArgs) -> Result<serde_json::Value, JobError> {
        debug!(program = %self.program, args = %args, "spawning routine");

        let output = Command::new(&self.program)
            .args(args.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| JobError::invocation(format!("failed to start '{}': {e}", self.program)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() {
            Ok(json!({
                "exit_code": output.status.code(),
                "stdout": tail(&stdout, self.tail_lines),
            }))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut message = format!("'{}' exited with {}", self.program, output.status);
            let stderr_tail = tail(&stderr, self.tail_lines);
            if !stderr_tail.is_empty() {
                message.push_str(": ");
                message.push_str(&stderr_tail);
            }
            Err(JobError::invocation(message))
        }
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Renders configs and logs the command line without running anything.
#[derive(Debug, Clone)]
pub struct DryRunRoutine {
    program: String,
}

impl DryRunRoutine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command_line(&self, args: &InvocationArgs) -> String {
        if args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {args}", self.program)
        }
    }
}

impl FitRoutine for DryRunRoutine {
    fn invoke(&self, args: &InvocationArgs) -> Result<serde_json::Value, JobError> {
        let command = self.command_line(args);
        info!(%command, "dry run");
        Ok(json!({ "dry_run": true, "command": command }))
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

/// Last `lines` lines of `text`, ignoring trailing blank lines.
fn tail(text: &str, lines: usize) -> String {
    let kept: Vec<&str> = text.trim_end().lines().collect();
    let start = kept.len().saturating_sub(lines);
    kept[start..].join("\n")
}
