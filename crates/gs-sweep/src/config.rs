//! Sweep configuration, loaded from JSON.

use gs_types::{ConfigurationError, ParameterValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::dispatch::ExecutionStrategy;
use crate::job::FixedArgs;
use crate::space::{AuxiliaryValues, ParameterSpace};

/// Everything needed to run a sweep.
///
/// Relative paths are resolved against the working directory of the process,
/// the same directory the fitting routine runs in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Candidate values per parameter, in declaration order. A scalar or a
    /// one-element list fixes the parameter.
    pub parameters: ParameterSpace,

    /// Values available to templates and names but not swept.
    #[serde(default)]
    pub fixed: BTreeMap<String, ParameterValue>,

    /// Derived parameters: `alias -> swept parameter` whose value it copies.
    #[serde(default)]
    pub links: BTreeMap<String, String>,

    /// Parameter file template.
    pub template: PathBuf,

    /// Naming pattern for rendered parameter files.
    pub config_name: String,

    /// Naming pattern for the routine's output identifier.
    pub output_name: String,

    /// Executable for the fitting routine.
    #[serde(default = "default_command")]
    pub command: String,

    /// Leading arguments before the fixed inputs.
    #[serde(default = "default_subcommand")]
    pub subcommand: Vec<String>,

    #[serde(default)]
    pub experiments: Vec<PathBuf>,

    /// Directory scanned for additional experiment files.
    #[serde(default)]
    pub experiment_dir: Option<PathBuf>,

    #[serde(default = "default_experiment_extension")]
    pub experiment_extension: String,

    pub method: PathBuf,

    pub kinetics: PathBuf,

    #[serde(default = "default_function")]
    pub function: String,

    /// Parallel workers; `1` (or `0`) runs sequentially.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Refuse to start when two grid points would share a file or output name.
    #[serde(default = "default_true")]
    pub check_unique_names: bool,
}

fn default_command() -> String {
    "chemex".to_string()
}

fn default_subcommand() -> Vec<String> {
    vec!["fit".to_string()]
}

fn default_experiment_extension() -> String {
    "cfg".to_string()
}

fn default_function() -> String {
    "powell".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl SweepConfig {
    pub fn new(
        parameters: ParameterSpace,
        template: impl Into<PathBuf>,
        config_name: impl Into<String>,
        output_name: impl Into<String>,
        method: impl Into<PathBuf>,
        kinetics: impl Into<PathBuf>,
    ) -> Self {
        Self {
            parameters,
            fixed: BTreeMap::new(),
            links: BTreeMap::new(),
            template: template.into(),
            config_name: config_name.into(),
            output_name: output_name.into(),
            command: default_command(),
            subcommand: default_subcommand(),
            experiments: Vec::new(),
            experiment_dir: None,
            experiment_extension: default_experiment_extension(),
            method: method.into(),
            kinetics: kinetics.into(),
            function: default_function(),
            workers: default_workers(),
            check_unique_names: true,
        }
    }

    pub fn with_experiments(mut self, experiments: impl IntoIterator<Item = PathBuf>) -> Self {
        self.experiments.extend(experiments);
        self
    }

    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    pub fn with_function(mut self, function: &str) -> Self {
        self.function = function.to_string();
        self
    }

    pub fn with_fixed(mut self, name: &str, value: impl Into<ParameterValue>) -> Self {
        self.fixed.insert(name.to_string(), value.into());
        self
    }

    pub fn with_link(mut self, alias: &str, target: &str) -> Self {
        self.links.insert(alias.to_string(), target.to_string());
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|e| ConfigurationError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Fatal checks that must pass before any job is attempted.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require_file("template", &self.template)?;
        require_file("method", &self.method)?;
        require_file("kinetics", &self.kinetics)?;

        if self.experiments.is_empty() {
            return Err(ConfigurationError::NoExperimentFiles);
        }
        for experiment in &self.experiments {
            require_file("experiment", experiment)?;
        }

        if self.command.trim().is_empty() {
            return Err(gs_types::config_error!("command must not be empty"));
        }

        self.auxiliary().validate(&self.parameters)
    }

    pub fn fixed_args(&self) -> FixedArgs {
        FixedArgs {
            subcommand: self.subcommand.clone(),
            experiments: self.experiments.clone(),
            method: self.method.clone(),
            kinetics: self.kinetics.clone(),
            function: self.function.clone(),
        }
    }

    pub fn auxiliary(&self) -> AuxiliaryValues {
        let aux = self
            .fixed
            .iter()
            .fold(AuxiliaryValues::new(), |aux, (name, value)| {
                aux.with_fixed(name.clone(), value.clone())
            });
        self.links
            .iter()
            .fold(aux, |aux, (alias, target)| aux.with_link(alias.clone(), target.clone()))
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::from_workers(self.workers)
    }
}

fn require_file(role: &str, path: &Path) -> Result<(), ConfigurationError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigurationError::MissingFile {
            role: role.to_string(),
            path: path.to_path_buf(),
        })
    }
}
