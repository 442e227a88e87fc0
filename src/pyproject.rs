//! Adding tool configuration to `pyproject.toml`.
//!
//! A section is applied in two passes over the document: the first only looks
//! for conflicting keys, the second writes. A conflict therefore leaves the
//! document exactly as it was.

use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;
use toml::{Table, Value};

use crate::operation::Context;
use crate::operation::param::{Arguments, Kind, Param};
use crate::operation::registry::Operation;
use crate::outcome::{EXIT_CONFLICT, EXIT_FAILURE, EXIT_PRECONDITION, Outcome};
use crate::project::PYPROJECT;
use crate::tasks::TaskError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("The file '{}' doesn't exist.", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "'{key}' in '{section}' is already configured. Add -f to overwrite the existing configuration."
    )]
    KeyConflict { section: String, key: String },

    #[error("'{key}' is not a table")]
    NotATable { key: String },
}

impl ConfigError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::FileNotFound(_) => EXIT_PRECONDITION,
            ConfigError::KeyConflict { .. } | ConfigError::NotATable { .. } => EXIT_CONFLICT,
            ConfigError::Read { .. }
            | ConfigError::Parse { .. }
            | ConfigError::Serialize(_)
            | ConfigError::Write { .. } => EXIT_FAILURE,
        }
    }
}

/// Set every key of `values` in the table at `path`, creating missing tables.
///
/// Unless `forced`, a key that already exists there is a conflict and nothing
/// is written.
///
/// # Errors
///
/// Returns `ConfigError::KeyConflict` on the first existing key, or
/// `ConfigError::NotATable` if something along `path` is not a table.
pub fn apply_section(
    doc: &mut Table,
    path: &[&str],
    values: Table,
    forced: bool,
) -> Result<(), ConfigError> {
    let section = path.join(".");

    let mut node = Some(&*doc);
    for (depth, key) in path.iter().enumerate() {
        node = match node.and_then(|table| table.get(*key)) {
            None => None,
            Some(Value::Table(table)) => Some(table),
            Some(_) => {
                return Err(ConfigError::NotATable {
                    key: path[..=depth].join("."),
                });
            }
        };
    }
    if !forced
        && let Some(existing) = node
        && let Some(key) = values.keys().find(|key| existing.contains_key(*key))
    {
        return Err(ConfigError::KeyConflict {
            section,
            key: key.clone(),
        });
    }

    let mut node = doc;
    for (depth, key) in path.iter().enumerate() {
        node = node
            .entry(*key)
            .or_insert_with(|| Value::Table(Table::new()))
            .as_table_mut()
            .ok_or_else(|| ConfigError::NotATable {
                key: path[..=depth].join("."),
            })?;
    }
    debug!("Setting {:?} in {section}", values.keys().collect::<Vec<_>>());
    node.extend(values);
    Ok(())
}

/// A `pyproject.toml` loaded for editing.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    pub path: PathBuf,
    pub table: Table,
}

impl ConfigDocument {
    /// # Errors
    ///
    /// Returns `ConfigError::FileNotFound` if `path` does not exist, or a read
    /// or parse error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            table,
        })
    }

    /// # Errors
    ///
    /// See [`apply_section`].
    pub fn apply_section(
        &mut self,
        path: &[&str],
        values: Table,
        forced: bool,
    ) -> Result<(), ConfigError> {
        apply_section(&mut self.table, path, values, forced)
    }

    /// Write the document back through a temporary file next to it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Serialize` or `ConfigError::Write`.
    pub fn save(&self) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(&self.table)?;
        let temp_path = self.path.with_extension("toml.tmp");
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        std::fs::write(&temp_path, content).map_err(write_err)?;
        if let Err(source) = std::fs::rename(&temp_path, &self.path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(write_err(source));
        }
        info!("Wrote {}", self.path.display());
        Ok(())
    }
}

/// A preset: the sections one `pyproject` command adds, in order.
pub type Preset = Vec<(&'static [&'static str], Table)>;

const TOOL_RUFF: &[&str] = &["tool", "ruff"];
const TOOL_RUFF_LINT: &[&str] = &["tool", "ruff", "lint"];
const TOOL_ISORT: &[&str] = &["tool", "isort"];
const TOOL_MYPY: &[&str] = &["tool", "mypy"];

fn table<const N: usize>(entries: [(&str, Value); N]) -> Table {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn strings(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| Value::String((*s).to_string())).collect())
}

const RUFF_SELECT: &[&str] = &[
    "F", "E", "W", "N", "UP", "YTT", "ANN", "BLE", "B", "A", "COM", "C4", "T10", "EM", "EXE",
    "ISC", "ICN", "LOG", "G", "INP", "PIE", "T20", "PYI", "PT", "Q", "RSE", "RET", "SLOT", "SLF",
    "SIM", "TID", "TCH", "INT", "ARG", "PTH", "TD", "PD", "PGH", "PL", "TRY", "FLY", "NPY",
    "PERF", "FURB", "RUF",
];

const RUFF_IGNORE: &[&str] = &[
    "ANN401", "ARG001", "ARG002", "COM812", "EM101", "PD011", "PLC1901", "PLR0911", "PLR0912",
    "PLR0913", "PLR0915", "PLR2004", "PTH123", "RET501", "RET505", "RET506", "SIM108", "SIM116",
    "TD002", "TD003", "TC001", "TC002", "TC003", "TRY002", "TRY003", "UP006", "UP007",
];

#[must_use]
pub fn ruff_preset() -> Preset {
    vec![
        (
            TOOL_RUFF,
            table([
                ("target-version", Value::String("py37".to_string())),
                ("line-length", Value::Integer(95)),
            ]),
        ),
        (
            TOOL_RUFF_LINT,
            table([("select", strings(RUFF_SELECT)), ("ignore", strings(RUFF_IGNORE))]),
        ),
    ]
}

#[must_use]
pub fn isort_preset() -> Preset {
    vec![(
        TOOL_ISORT,
        table([
            (
                "sections",
                Value::String("LOCALFOLDER,FIRSTPARTY,THIRDPARTY,STDLIB,FUTURE".to_string()),
            ),
            ("multi_line_output", Value::Integer(3)),
            ("line_length", Value::Integer(95)),
            ("use_parentheses", Value::Boolean(true)),
            ("include_trailing_comma", Value::Boolean(true)),
            ("force_grid_wrap", Value::Integer(0)),
            ("ensure_newline_before_comments", Value::Boolean(true)),
        ]),
    )]
}

#[must_use]
pub fn mypy_preset() -> Preset {
    let importlib_metadata = table([
        ("module", strings(&["importlib_metadata.*"])),
        ("ignore_missing_imports", Value::Boolean(true)),
    ]);
    vec![(
        TOOL_MYPY,
        table([(
            "overrides",
            Value::Array(vec![Value::Table(importlib_metadata)]),
        )]),
    )]
}

/// Apply every section of `preset` to the file, writing it only if all apply.
///
/// # Errors
///
/// Returns the first `ConfigError`; the file is then left untouched.
pub fn apply_preset(path: &Path, preset: Preset, forced: bool) -> Result<(), ConfigError> {
    let mut document = ConfigDocument::load(path)?;
    for (section, values) in preset {
        document.apply_section(section, values, forced)?;
    }
    document.save()
}

fn preset_operation(name: &'static str, summary: &str, preset: fn() -> Preset) -> Operation {
    Operation::task(
        &format!("pyproject {name}"),
        summary,
        vec![
            Param::flag("forced")
                .alias("-f")
                .help("Overwrite the existing configuration"),
            Param::option("parent_dir", Kind::Path)
                .help("Directory holding the pyproject.toml (default: the project root)"),
        ],
        move |ctx, args| run_preset(ctx, args, preset()),
    )
}

fn run_preset(ctx: &Context<'_>, args: &Arguments, preset: Preset) -> Result<Outcome, TaskError> {
    let dir = args
        .path("parent_dir")
        .map_or_else(|| ctx.project.root.clone(), |dir| ctx.project.resolve(dir));
    let path = dir.join(PYPROJECT);
    apply_preset(&path, preset, args.flag("forced"))?;
    ctx.console.success(format!("{} has been updated.", path.display()));
    Ok(Outcome::Success)
}

#[must_use]
pub fn ruff() -> Operation {
    preset_operation("ruff", "Add the ruff configuration to pyproject.toml.", ruff_preset)
}

#[must_use]
pub fn isort() -> Operation {
    preset_operation("isort", "Add the isort configuration to pyproject.toml.", isort_preset)
}

#[must_use]
pub fn mypy() -> Operation {
    preset_operation("mypy", "Add the mypy configuration to pyproject.toml.", mypy_preset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Table {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_apply_section_creates_intermediate_tables() {
        let mut doc = Table::new();
        apply_section(
            &mut doc,
            &["tool", "ruff"],
            table([("line-length", Value::Integer(95))]),
            false,
        )
        .unwrap();
        assert_eq!(doc, parse("[tool.ruff]\nline-length = 95\n"));
    }

    #[test]
    fn test_conflict_leaves_document_unchanged() {
        let original = parse("[tool.ruff]\nline-length = 80\n");
        let mut doc = original.clone();
        let err = apply_section(
            &mut doc,
            TOOL_RUFF,
            table([
                ("target-version", Value::String("py37".to_string())),
                ("line-length", Value::Integer(95)),
            ]),
            false,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "'line-length' in 'tool.ruff' is already configured. Add -f to overwrite the existing configuration."
        );
        assert_eq!(err.exit_code(), EXIT_CONFLICT);
        assert_eq!(doc, original);
    }

    #[test]
    fn test_forced_overwrites_and_keeps_other_keys() {
        let mut doc = parse("[tool.ruff]\nline-length = 80\nexclude = [\"build\"]\n");
        apply_section(
            &mut doc,
            &["tool", "ruff"],
            table([("line-length", Value::Integer(95))]),
            true,
        )
        .unwrap();
        assert_eq!(
            doc,
            parse("[tool.ruff]\nline-length = 95\nexclude = [\"build\"]\n")
        );
    }

    #[test]
    fn test_scalar_on_path_is_not_a_table() {
        let mut doc = parse("tool = 3\n");
        let err = apply_section(&mut doc, &["tool", "mypy"], Table::new(), true).unwrap_err();
        assert!(matches!(err, ConfigError::NotATable { key } if key == "tool"));
    }

    #[test]
    fn test_apply_preset_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = apply_preset(&dir.path().join(PYPROJECT), isort_preset(), false).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
        assert_eq!(err.exit_code(), EXIT_PRECONDITION);
    }

    #[test]
    fn test_failed_save_removes_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PYPROJECT);
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "").unwrap();
        let doc = ConfigDocument {
            path: path.clone(),
            table: Table::new(),
        };

        let err = doc.save().unwrap_err();
        assert!(matches!(err, ConfigError::Write { .. }));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_apply_ruff_preset_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PYPROJECT);
        std::fs::write(&path, "[project]\nname = \"demo\"\n").unwrap();

        apply_preset(&path, ruff_preset(), false).unwrap();

        let written = parse(&std::fs::read_to_string(&path).unwrap());
        assert_eq!(written["project"]["name"].as_str(), Some("demo"));
        assert_eq!(written["tool"]["ruff"]["target-version"].as_str(), Some("py37"));
        assert_eq!(written["tool"]["ruff"]["line-length"].as_integer(), Some(95));
        let select = written["tool"]["ruff"]["lint"]["select"].as_array().unwrap();
        assert_eq!(select.len(), RUFF_SELECT.len());
        assert!(!dir.path().join("pyproject.toml.tmp").exists());
    }

    #[test]
    fn test_second_section_conflict_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PYPROJECT);
        let original = "[tool.ruff.lint]\nselect = [\"E\"]\n";
        std::fs::write(&path, original).unwrap();

        let err = apply_preset(&path, ruff_preset(), false).unwrap_err();
        assert!(matches!(err, ConfigError::KeyConflict { ref key, .. } if key == "select"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_mypy_preset_overrides() {
        let mut doc = Table::new();
        for (section, values) in mypy_preset() {
            apply_section(&mut doc, section, values, false).unwrap();
        }
        assert_eq!(
            doc,
            parse(
                "[[tool.mypy.overrides]]\nmodule = [\"importlib_metadata.*\"]\nignore_missing_imports = true\n"
            )
        );
    }
}
