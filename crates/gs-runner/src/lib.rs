//! # gs-runner
//!
//! The `gridsearch` command-line runner: argument parsing, logging setup,
//! experiment discovery and the process-backed fitting routines.

pub mod cli;
pub mod discover;
pub mod logging;
pub mod routine;

pub use cli::{run, Cli};
pub use discover::{discover_experiments, resolve_experiments};
pub use logging::init_logging;
pub use routine::{CommandRoutine, DryRunRoutine};
