use camino::Utf8PathBuf;
use thiserror::Error;

pub use anyhow::Error as RuntimeError;

#[derive(Debug, Error)]
pub enum KumitateError {
    #[error("Error while loading the build config:\n{0}")]
    Config(#[from] ConfigError),

    #[error("Error while assembling the pipeline:\n{0}")]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("Task '{0}' not found")]
    TaskNotFound(String),
}

/// Errors raised while reading or checking a build config. All of them are
/// reported before any task is constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't read config file '{0}'.\n{1}")]
    Read(Utf8PathBuf, std::io::Error),

    #[error("Couldn't parse JSON config.\n{0}")]
    Json(#[from] serde_json::Error),

    #[error("Couldn't parse TOML config.\n{0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported config format '{0}', expected a .json or .toml file")]
    Format(Utf8PathBuf),

    /// An `include` entry is missing a required field or holds an unusable
    /// value. `concern` is the dotted path, e.g. `include.copy.html`.
    #[error("{concern}: {reason}")]
    Shape { concern: String, reason: String },
}

impl ConfigError {
    pub(crate) fn shape(concern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Shape {
            concern: concern.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Task name '{name}' is produced by both {first} and {second}")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    #[error("Task name '{name}' from {owner} is reserved for a pipeline composition")]
    ReservedName { name: String, owner: String },
}

/// Failure of a task run. Leaf failures carry the name of the task that
/// failed, so a failure deep inside a composition still points at its origin.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task '{0}' failed: {1:#}")]
    Failed(String, anyhow::Error),

    #[error("{} parallel tasks failed:\n{}", .0.len(), format_failures(.0))]
    Parallel(Vec<TaskError>),
}

impl TaskError {
    /// Names of every leaf task that failed.
    pub fn failed_tasks(&self) -> Vec<&str> {
        match self {
            TaskError::Failed(name, _) => vec![name.as_str()],
            TaskError::Parallel(errors) => errors.iter().flat_map(TaskError::failed_tasks).collect(),
        }
    }
}

fn format_failures(errors: &[TaskError]) -> String {
    errors
        .iter()
        .map(|error| format!("  - {error}"))
        .collect::<Vec<_>>()
        .join("\n")
}
