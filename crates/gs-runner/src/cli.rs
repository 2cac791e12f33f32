//! Command-line surface of the `gridsearch` binary.

use anyhow::Context;
use clap::Parser;
use gs_sweep::{FitRoutine, Sweep, SweepConfig, SweepReport};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::discover::resolve_experiments;
use crate::routine::{CommandRoutine, DryRunRoutine};

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "gridsearch")]
#[command(about = "Run a fitting routine over every point of a parameter grid")]
pub struct Cli {
    /// Sweep configuration (JSON)
    pub config: PathBuf,

    /// Debug-level logging (ignored when RUST_LOG is set)
    #[arg(short, long)]
    pub verbose: bool,

    /// Worker count; overrides the config file. 1 runs sequentially
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Render configs and log command lines without running the routine
    #[arg(long)]
    pub dry_run: bool,

    /// Write the sweep report as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Exit non-zero if any grid point failed or was not run
    #[arg(long)]
    pub fail_on_error: bool,
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut SweepConfig) {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }

    fn routine(&self, config: &SweepConfig) -> Box<dyn FitRoutine> {
        if self.dry_run {
            Box::new(DryRunRoutine::new(&config.command))
        } else {
            Box::new(CommandRoutine::new(&config.command))
        }
    }
}

/// Load, prepare and run the sweep described by `cli`.
///
/// Setup failures are returned as errors before any job runs. Per-job
/// failures are only visible in the returned report.
pub fn run(cli: &Cli) -> anyhow::Result<SweepReport> {
    let mut config = SweepConfig::from_file(&cli.config)
        .with_context(|| format!("loading sweep config {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);

    let discovered = resolve_experiments(&mut config)?;
    if discovered > 0 {
        info!(discovered, "added experiment files from directory");
    }

    let sweep = Sweep::prepare(&config).context("sweep setup failed")?;
    let routine = cli.routine(&config);
    info!(
        routine = routine.name(),
        points = sweep.grid_size(),
        "running sweep"
    );

    let report = sweep.run(&routine);

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
        info!(path = %path.display(), "report written");
    }
    Ok(report)
}

pub fn write_report(report: &SweepReport, path: &Path) -> anyhow::Result<()> {
    report
        .write_json(path)
        .with_context(|| format!("writing report {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "gridsearch",
            "sweep.json",
            "-v",
            "-j",
            "4",
            "--dry-run",
            "--report",
            "report.json",
        ]);
        assert_eq!(cli.config, PathBuf::from("sweep.json"));
        assert!(cli.verbose);
        assert_eq!(cli.workers, Some(4));
        assert!(cli.dry_run);
        assert_eq!(cli.report, Some(PathBuf::from("report.json")));
        assert!(!cli.fail_on_error);
    }

    #[test]
    fn config_path_is_required() {
        assert!(Cli::try_parse_from(["gridsearch"]).is_err());
    }

    #[test]
    fn workers_flag_overrides_config() {
        let mut config = SweepConfig::new(
            gs_sweep::ParameterSpace::new().add("pa", [0.9]),
            "params.template",
            "p_{pa}.cfg",
            "out_{pa}",
            "method.cfg",
            "3st.pb_kex",
        )
        .with_workers(2);

        let cli = Cli::parse_from(["gridsearch", "sweep.json"]);
        cli.apply_overrides(&mut config);
        assert_eq!(config.workers, 2);

        let cli = Cli::parse_from(["gridsearch", "sweep.json", "--workers", "8"]);
        cli.apply_overrides(&mut config);
        assert_eq!(config.workers, 8);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let cli = Cli::parse_from([OsStr::new("gridsearch"), path.as_os_str()]);
        let err = run(&cli).unwrap_err();
        assert!(err.to_string().contains("loading sweep config"));
    }
}
