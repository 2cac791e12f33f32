use std::path::PathBuf;
use thiserror::Error;

/// Errors from whole-sweep file operations (writing reports).
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Placeholder substitution errors, raised by templates and naming patterns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Missing parameter definition for '{name}' in {source_label}")]
    MissingParameter { name: String, source_label: String },

    #[error("Malformed placeholder in {source_label} at offset {position}: {message}")]
    Syntax {
        source_label: String,
        position: usize,
        message: String,
    },

    #[error("Invalid format spec '{spec}' for '{name}': {message}")]
    InvalidFormatSpec {
        name: String,
        spec: String,
        message: String,
    },

    #[error("Cannot format '{name}' = {value} with spec '{spec}': {message}")]
    IncompatibleFormat {
        name: String,
        spec: String,
        value: String,
        message: String,
    },
}

impl TemplateError {
    /// Name of the unresolved placeholder, if this is a missing-parameter error.
    pub fn missing_parameter(&self) -> Option<&str> {
        match self {
            Self::MissingParameter { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Failures confined to a single grid point's job.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Rendering config failed: {0}")]
    Render(TemplateError),

    #[error("Resolving names failed: {0}")]
    Naming(TemplateError),

    #[error("Writing {path} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invocation failed: {message}")]
    Invocation { message: String },

    #[error("Job panicked: {message}")]
    Panicked { message: String },
}

impl JobError {
    pub fn invocation(message: impl Into<String>) -> Self {
        Self::Invocation {
            message: message.into(),
        }
    }

    /// Name of the unresolved placeholder behind a render or naming failure.
    pub fn missing_parameter(&self) -> Option<&str> {
        match self {
            Self::Render(e) | Self::Naming(e) => e.missing_parameter(),
            _ => None,
        }
    }

    /// True when the job was abandoned before the routine was called.
    pub fn is_pre_invocation(&self) -> bool {
        matches!(self, Self::Render(_) | Self::Naming(_) | Self::Write { .. })
    }
}

/// Whole-sweep setup errors. Any of these aborts the sweep before a job starts.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("{role} file not found: {path}")]
    MissingFile { role: String, path: PathBuf },

    #[error("No experiment files given")]
    NoExperimentFiles,

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] TemplateError),

    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Name collision: '{name}' is produced by both [{first}] and [{second}]")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("{0}")]
    Invalid(String),
}

/// Result type alias for sweep operations
pub type SweepResult<T> = Result<T, SweepError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::ConfigurationError::Invalid(format!($($arg)*))
    };
}
