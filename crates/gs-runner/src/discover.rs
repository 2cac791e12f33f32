//! Experiment file discovery.

use gs_sweep::SweepConfig;
use gs_types::ConfigurationError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Regular files in `dir` with the given extension, sorted by path.
pub fn discover_experiments(
    dir: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, ConfigurationError> {
    let read_error = |source: std::io::Error| ConfigurationError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let extension = extension.trim_start_matches('.');

    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Append discovered experiment files to `config.experiments`, skipping
/// files already listed. Returns the number added.
pub fn resolve_experiments(config: &mut SweepConfig) -> Result<usize, ConfigurationError> {
    let Some(dir) = config.experiment_dir.clone() else {
        return Ok(0);
    };

    let mut added = 0;
    for path in discover_experiments(&dir, &config.experiment_extension)? {
        if !config.experiments.contains(&path) {
            debug!(experiment = %path.display(), "discovered experiment file");
            config.experiments.push(path);
            added += 1;
        }
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gs_sweep::ParameterSpace;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "").unwrap();
        path
    }

    #[test]
    fn finds_matching_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "cpmg_800.cfg");
        touch(dir.path(), "cpmg_600.cfg");
        touch(dir.path(), "notes.txt");
        fs::create_dir(dir.path().join("nested.cfg")).unwrap();

        let found = discover_experiments(dir.path(), ".cfg").unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cpmg_600.cfg", "cpmg_800.cfg"]);
    }

    #[test]
    fn missing_directory_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_experiments(&dir.path().join("Experiments"), "cfg"),
            Err(ConfigurationError::Read { .. })
        ));
    }

    #[test]
    fn resolve_skips_listed_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.cfg");
        touch(dir.path(), "b.cfg");

        let mut config = SweepConfig::new(
            ParameterSpace::new().add("pa", [0.9]),
            "params.template",
            "p_{pa}.cfg",
            "out_{pa}",
            "method.cfg",
            "3st.pb_kex",
        )
        .with_experiments([a]);
        assert_eq!(resolve_experiments(&mut config).unwrap(), 0);

        config.experiment_dir = Some(dir.path().to_path_buf());
        assert_eq!(resolve_experiments(&mut config).unwrap(), 1);
        assert_eq!(config.experiments.len(), 2);
        assert_eq!(resolve_experiments(&mut config).unwrap(), 0);
    }
}
