//! The maintenance tasks: each builds a command line for an external tool and runs it.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::outcome::{EXIT_ABORTED, EXIT_CONFLICT, EXIT_FAILURE, EXIT_PRECONDITION};
use crate::process::ProcessError;
use crate::project::Project;
use crate::prompt::PromptError;
use crate::pyproject::ConfigError;

pub mod format;
pub mod icons;
pub mod lint;
pub mod pytest;
pub mod scaffold;
pub mod typecheck;
pub mod wheel;

/// Why a task could not do its work.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("The file {0} doesn't exist")]
    MissingFile(PathBuf),

    #[error("No '{0}' folder found.")]
    MissingDirectory(PathBuf),

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    Declined(String),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TaskError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            TaskError::MissingFile(_)
            | TaskError::MissingDirectory(_)
            | TaskError::Precondition(_) => EXIT_PRECONDITION,
            TaskError::Declined(_) | TaskError::Prompt(PromptError::NotInteractive(_)) => {
                EXIT_CONFLICT
            }
            TaskError::Prompt(PromptError::Cancelled) => EXIT_ABORTED,
            TaskError::Process(e) => e.exit_code(),
            TaskError::Config(e) => e.exit_code(),
            TaskError::Prompt(_) | TaskError::Io { .. } => EXIT_FAILURE,
        }
    }

    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> TaskError + '_ {
        move |source| TaskError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Render a path as a command-line argument.
pub(crate) fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Fail unless `dir` (relative to `root`) is an existing directory.
pub(crate) fn require_dir(root: &Path, dir: &Path) -> Result<(), TaskError> {
    if root.join(dir).is_dir() {
        Ok(())
    } else {
        Err(TaskError::MissingDirectory(dir.to_path_buf()))
    }
}

/// Fail unless `file` (relative to `root`) exists.
pub(crate) fn require_file(root: &Path, file: &Path) -> Result<(), TaskError> {
    if root.join(file).exists() {
        Ok(())
    } else {
        Err(TaskError::MissingFile(file.to_path_buf()))
    }
}

/// The source directory, plus the tests directory when present.
pub(crate) fn source_targets(project: &Project) -> Result<Vec<String>, TaskError> {
    let source = &project.settings.source_dir;
    let tests = &project.settings.tests_dir;
    require_dir(&project.root, source)?;
    let mut targets = vec![arg(source)];
    if project.root.join(tests).exists() {
        targets.push(arg(tests));
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_taxonomy() {
        assert_eq!(
            TaskError::MissingFile(PathBuf::from("pyproject.toml")).exit_code(),
            EXIT_PRECONDITION
        );
        assert_eq!(
            TaskError::Process(ProcessError::ExecutableNotFound {
                program: "ruff".into()
            })
            .exit_code(),
            EXIT_PRECONDITION
        );
        assert_eq!(
            TaskError::Prompt(PromptError::NotInteractive("replace?".into())).exit_code(),
            EXIT_CONFLICT
        );
        assert_eq!(
            TaskError::Prompt(PromptError::Cancelled).exit_code(),
            EXIT_ABORTED
        );
    }

    #[test]
    fn test_source_targets_include_existing_tests() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::at(dir.path());
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let targets = source_targets(&project).unwrap();
        assert_eq!(targets, vec!["src"]);

        std::fs::create_dir(dir.path().join("tests")).unwrap();
        let targets = source_targets(&project).unwrap();
        assert_eq!(targets, vec!["src", "tests"]);
    }

    #[test]
    fn test_missing_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = source_targets(&Project::at(dir.path())).unwrap_err();
        assert_eq!(err.to_string(), "No 'src' folder found.");
    }
}
