//! Derivation of per-grid-point file and output names.

use gs_types::{ConfigurationError, TemplateError};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::space::{AuxiliaryValues, GridPoint};
use crate::template::Template;

/// A naming pattern such as `Output_A{pa:.2f}_B{pb:.2f}`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamePattern {
    template: Template,
}

impl NamePattern {
    /// `role` identifies the pattern in error messages (e.g. `output_name`).
    pub fn parse(role: &str, pattern: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            template: Template::parse(format!("{role} '{pattern}'"), pattern)?,
        })
    }

    pub fn resolve(&self, point: &GridPoint, aux: &AuxiliaryValues) -> Result<String, TemplateError> {
        self.template.render(point, aux)
    }
}

/// Names derived for one grid point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNames {
    pub config_path: PathBuf,
    pub output: String,
}

/// Resolves the rendered-config path and the output identifier for each grid
/// point.
///
/// Distinct grid points must map to distinct names or concurrent jobs would
/// overwrite each other's files. [`NameResolver::check_unique`] verifies this
/// up front.
#[derive(Debug, Clone, PartialEq)]
pub struct NameResolver {
    config: NamePattern,
    output: NamePattern,
}

impl NameResolver {
    pub fn new(config: NamePattern, output: NamePattern) -> Self {
        Self { config, output }
    }

    pub fn from_patterns(config: &str, output: &str) -> Result<Self, TemplateError> {
        Ok(Self::new(
            NamePattern::parse("config_name", config)?,
            NamePattern::parse("output_name", output)?,
        ))
    }

    pub fn resolve(
        &self,
        point: &GridPoint,
        aux: &AuxiliaryValues,
    ) -> Result<ResolvedNames, TemplateError> {
        Ok(ResolvedNames {
            config_path: PathBuf::from(self.config.resolve(point, aux)?),
            output: self.output.resolve(point, aux)?,
        })
    }

    /// Resolve every point and fail on the first name produced twice.
    ///
    /// Points whose names cannot be resolved are skipped here; the dispatcher
    /// reports them individually. Returns the number of points checked.
    pub fn check_unique<I>(&self, points: I, aux: &AuxiliaryValues) -> Result<usize, ConfigurationError>
    where
        I: IntoIterator<Item = GridPoint>,
    {
        let mut configs: HashMap<String, String> = HashMap::new();
        let mut outputs: HashMap<String, String> = HashMap::new();
        let mut checked = 0;

        for point in points {
            let label = point.to_string();
            for (pattern, seen) in [(&self.config, &mut configs), (&self.output, &mut outputs)] {
                let Ok(name) = pattern.resolve(&point, aux) else {
                    continue;
                };
                if let Some(first) = seen.get(&name) {
                    return Err(ConfigurationError::NameCollision {
                        name,
                        first: first.clone(),
                        second: label,
                    });
                }
                seen.insert(name, label.clone());
            }
            checked += 1;
        }

        Ok(checked)
    }
}
