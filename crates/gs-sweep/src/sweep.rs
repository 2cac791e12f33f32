//! The sweep orchestrator: setup checks, then dispatch of every grid point.

use chrono::Utc;
use gs_types::ConfigurationError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collect::{ResultCollector, SweepReport};
use crate::config::SweepConfig;
use crate::dispatch::{ExecutionStrategy, JobBuilder, JobDispatcher};
use crate::job::FixedArgs;
use crate::naming::NameResolver;
use crate::routine::FitRoutine;
use crate::space::{AuxiliaryValues, ParameterSpace};
use crate::template::Template;

/// A validated, ready-to-run sweep.
#[derive(Debug, Clone)]
pub struct Sweep {
    id: Uuid,
    space: ParameterSpace,
    template: Template,
    names: NameResolver,
    aux: AuxiliaryValues,
    fixed: FixedArgs,
    strategy: ExecutionStrategy,
}

impl Sweep {
    /// Run every whole-sweep check. Any error here means no job could succeed,
    /// so nothing is attempted.
    pub fn prepare(config: &SweepConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let template = Template::from_file(&config.template)?;
        let names = NameResolver::from_patterns(&config.config_name, &config.output_name)?;
        let aux = config.auxiliary();

        for name in aux.shadowed_by(&config.parameters) {
            warn!(parameter = name, "fixed value is shadowed by a swept parameter");
        }

        if config.check_unique_names {
            let checked = names.check_unique(config.parameters.grid(), &aux)?;
            debug!(checked, "resolved names are unique");
        }

        let sweep = Self {
            id: Uuid::new_v4(),
            space: config.parameters.clone(),
            template,
            names,
            aux,
            fixed: config.fixed_args(),
            strategy: config.strategy(),
        };

        info!(
            sweep_id = %sweep.id,
            template = %config.template.display(),
            config_name = %config.config_name,
            output_name = %config.output_name,
            method = %config.method.display(),
            kinetics = %config.kinetics.display(),
            function = %config.function,
            experiments = config.experiments.len(),
            "sweep prepared"
        );

        Ok(sweep)
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    pub fn grid_size(&self) -> usize {
        self.space.grid_size().unwrap_or(usize::MAX)
    }

    /// Attempt every grid point and return once all have finished.
    pub fn run<R: FitRoutine + ?Sized>(&self, routine: &R) -> SweepReport {
        let started_at = Utc::now();
        info!(
            sweep_id = %self.id,
            points = self.grid_size(),
            swept = ?self.space.swept_names().collect::<Vec<_>>(),
            strategy = %self.strategy,
            "starting sweep"
        );

        let builder = JobBuilder::new(&self.template, &self.names, &self.aux, self.fixed.tokens());
        let dispatcher = JobDispatcher::new(builder, routine, self.strategy);
        let collector = ResultCollector::new();
        dispatcher.dispatch(self.space.grid(), &collector);

        let report = collector.finish(self.id, self.strategy.to_string(), started_at);
        info!(sweep_id = %self.id, "{}", report.summary());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::InvocationArgs;
    use crate::routine::routine_fn;
    use std::fs;
    use std::path::Path;

    fn write_inputs(dir: &Path) -> SweepConfig {
        fs::write(dir.join("params.template"), "pa = {pa}\npb = {pb}\npc = {pc}\n").unwrap();
        fs::write(dir.join("method.cfg"), "").unwrap();
        fs::write(dir.join("3st.pb_kex"), "").unwrap();
        fs::write(dir.join("exp.cfg"), "").unwrap();

        SweepConfig::new(
            ParameterSpace::new()
                .add("pa", [0.9, 0.95])
                .add("pb", [0.1, 0.2]),
            dir.join("params.template"),
            dir.join("params_A{pa:.2f}_B{pb:.2f}.cfg").display().to_string(),
            "Output_A{pa:.2f}_B{pb:.2f}",
            dir.join("method.cfg"),
            dir.join("3st.pb_kex"),
        )
        .with_experiments([dir.join("exp.cfg")])
        .with_link("pc", "pb")
    }

    #[test]
    fn prepare_and_run() {
        let dir = tempfile::tempdir().unwrap();
        let sweep = Sweep::prepare(&write_inputs(dir.path())).unwrap();
        assert_eq!(sweep.grid_size(), 4);
        assert_eq!(sweep.strategy(), ExecutionStrategy::Sequential);

        let routine = routine_fn("ok", |_: &InvocationArgs| Ok(serde_json::Value::Null));
        let report = sweep.run(&routine);
        assert_eq!(report.sweep_id, sweep.id());
        assert_eq!(report.succeeded(), 4);

        let rendered = fs::read_to_string(dir.path().join("params_A0.90_B0.20.cfg")).unwrap();
        assert_eq!(rendered, "pa = 0.9\npb = 0.2\npc = 0.2\n");
    }

    #[test]
    fn missing_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path());
        fs::remove_file(dir.path().join("params.template")).unwrap();

        assert!(matches!(
            Sweep::prepare(&config),
            Err(ConfigurationError::MissingFile { .. })
        ));
    }

    #[test]
    fn malformed_pattern_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path());
        config.output_name = "Output_{pa:.2f".to_string();

        assert!(matches!(
            Sweep::prepare(&config),
            Err(ConfigurationError::Pattern(_))
        ));
    }

    #[test]
    fn colliding_names_are_fatal_unless_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path());
        config.output_name = "Output_A{pa:.0f}".to_string();

        assert!(matches!(
            Sweep::prepare(&config),
            Err(ConfigurationError::NameCollision { .. })
        ));

        config.check_unique_names = false;
        assert!(Sweep::prepare(&config).is_ok());
    }
}
