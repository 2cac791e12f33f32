//! # gs-sweep
//!
//! Parameter sweeps over an external fitting routine.
//!
//! Provides the parameter space and its Cartesian grid expansion, placeholder
//! templates for rendered configs and derived names, per-point job
//! construction, sequential or pooled dispatch, and result collection that
//! keeps one failing grid point from aborting the rest of the sweep.

mod collect;
mod config;
mod dispatch;
mod job;
mod naming;
mod routine;
mod space;
mod sweep;
mod template;

pub use collect::{Completion, JobOutcome, JobResult, RenderFailure, ResultCollector, SweepReport};
pub use config::SweepConfig;
pub use dispatch::{ExecutionStrategy, JobBuilder, JobDispatcher};
pub use job::{FixedArgs, InvocationArgs, Job, JobRun, JobStatus};
pub use naming::{NamePattern, NameResolver, ResolvedNames};
pub use routine::{routine_fn, FitRoutine, FnRoutine};
pub use space::{AuxiliaryValues, GridIter, GridPoint, ParameterAxis, ParameterSpace};
pub use sweep::Sweep;
pub use template::Template;
