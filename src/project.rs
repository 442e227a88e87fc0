//! Project discovery and the `[tool.maestro]` settings table.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use crate::outcome::{EXIT_FAILURE, EXIT_PRECONDITION};

/// Conventional name of the project configuration file.
pub const PYPROJECT: &str = "pyproject.toml";

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Unknown working directory: {0}")]
    UnknownWorkingDirectory(String),
    #[error("Unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid [tool.maestro] settings in {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ProjectError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            ProjectError::Settings { .. } => EXIT_PRECONDITION,
            ProjectError::UnknownWorkingDirectory(_) | ProjectError::Read { .. } => EXIT_FAILURE,
        }
    }
}

/// Per-project overrides read from `[tool.maestro]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    pub source_dir: PathBuf,
    pub tests_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src"),
            tests_dir: PathBuf::from("tests"),
        }
    }
}

#[derive(Deserialize, Default)]
struct PyprojectTools {
    #[serde(default)]
    tool: ToolTable,
}

#[derive(Deserialize, Default)]
struct ToolTable {
    #[serde(default)]
    maestro: Option<Settings>,
}

/// The project an invocation operates on.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub settings: Settings,
}

impl Project {
    /// Locate the project starting at `start` (or the current directory).
    ///
    /// # Errors
    ///
    /// Returns `ProjectError::UnknownWorkingDirectory` if the cwd cannot be
    /// determined, or `ProjectError::Settings` if `[tool.maestro]` is malformed.
    pub fn discover(start: Option<&Path>) -> Result<Project, ProjectError> {
        let start = match start {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()
                .map_err(|e| ProjectError::UnknownWorkingDirectory(e.to_string()))?,
        };
        let root = find_root(&start).unwrap_or_else(|| {
            debug!(
                "No {PYPROJECT} found above {}, using it as project root",
                start.display()
            );
            start.clone()
        });
        let settings = Settings::load(&root)?;
        Ok(Project { root, settings })
    }

    /// Project rooted at `root` with default settings.
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Project {
        Project {
            root: root.into(),
            settings: Settings::default(),
        }
    }

    #[must_use]
    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.settings.source_dir)
    }

    #[must_use]
    pub fn tests_dir(&self) -> PathBuf {
        self.root.join(&self.settings.tests_dir)
    }

    #[must_use]
    pub fn pyproject(&self) -> PathBuf {
        self.root.join(PYPROJECT)
    }

    /// Resolve a user supplied path against the project root.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Walk from `start` through its parents to the first directory holding a `pyproject.toml`.
#[must_use]
pub fn find_root(start: &Path) -> Option<PathBuf> {
    debug!("Searching for {PYPROJECT} from {}", start.display());
    let found = start
        .ancestors()
        .find(|dir| dir.join(PYPROJECT).is_file())
        .map(Path::to_path_buf);
    if let Some(ref root) = found {
        info!("Found project root: {}", root.display());
    }
    found
}

impl Settings {
    /// Read `[tool.maestro]` from the project's `pyproject.toml`, if both exist.
    ///
    /// # Errors
    ///
    /// Returns `ProjectError` if the file cannot be read or the table does not
    /// have the expected shape.
    pub fn load(root: &Path) -> Result<Settings, ProjectError> {
        let path = root.join(PYPROJECT);
        if !path.is_file() {
            return Ok(Settings::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| ProjectError::Read {
            path: path.clone(),
            source,
        })?;
        let parsed: PyprojectTools =
            toml::from_str(&contents).map_err(|source| ProjectError::Settings { path, source })?;
        Ok(parsed.tool.maestro.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_root_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PYPROJECT), "").unwrap();
        let nested = dir.path().join("src").join("pkg");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_root(&nested).as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_discover_without_pyproject_uses_start() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::discover(Some(dir.path())).unwrap();
        assert_eq!(project.root, dir.path());
        assert_eq!(project.settings, Settings::default());
    }

    #[test]
    fn test_settings_override_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PYPROJECT),
            "[project]\nname = \"demo\"\n\n[tool.maestro]\nsource-dir = \"lib\"\n",
        )
        .unwrap();
        let project = Project::discover(Some(dir.path())).unwrap();
        assert_eq!(project.settings.source_dir, PathBuf::from("lib"));
        assert_eq!(project.settings.tests_dir, PathBuf::from("tests"));
        assert_eq!(project.source_dir(), dir.path().join("lib"));
    }

    #[test]
    fn test_unknown_setting_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PYPROJECT),
            "[tool.maestro]\nsrc = \"lib\"\n",
        )
        .unwrap();
        let result = Project::discover(Some(dir.path()));
        assert!(matches!(result, Err(ProjectError::Settings { .. })));
    }
}
