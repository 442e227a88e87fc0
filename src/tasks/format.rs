//! Formatters: black and isort.

use std::path::Path;

use crate::operation::Context;
use crate::operation::param::{Arguments, Kind, Param, Value};
use crate::operation::registry::Operation;
use crate::outcome::Outcome;
use crate::project::{PYPROJECT, Project};
use crate::tasks::{TaskError, arg, require_file, source_targets};

pub const DEFAULT_LINE_LENGTH: i64 = 95;

#[must_use]
pub fn black() -> Operation {
    Operation::task(
        "black",
        "Apply black.",
        vec![
            Param::flag("check").help("Don't write the files back, just report"),
            Param::option("line_length", Kind::Integer)
                .long("--line_length")
                .alias("-l")
                .default(Value::Integer(DEFAULT_LINE_LENGTH)),
        ],
        |ctx, args| ctx.run(&black_command(ctx.project, args)?),
    )
}

/// # Errors
///
/// Returns `TaskError::MissingDirectory` if the source directory is missing.
pub fn black_command(project: &Project, args: &Arguments) -> Result<Vec<String>, TaskError> {
    let line_length = args.integer("line_length").unwrap_or(DEFAULT_LINE_LENGTH);
    let mut cmd = vec!["black".to_string(), "-l".to_string(), line_length.to_string()];
    if args.flag("check") {
        cmd.push("--check".to_string());
    }
    cmd.extend(source_targets(project)?);
    Ok(cmd)
}

#[must_use]
pub fn isort() -> Operation {
    Operation::task(
        "isort",
        "Apply isort.",
        vec![
            Param::flag("check").help("Only check the import order"),
            Param::option("config", Kind::Path)
                .alias("-c")
                .help("Replace the default config file"),
            Param::flag("show_config").alias("-s"),
        ],
        run_isort,
    )
}

/// # Errors
///
/// Returns `TaskError::MissingFile` if the settings file is missing, or
/// `TaskError::MissingDirectory` if the source directory is missing.
pub fn isort_command(project: &Project, args: &Arguments) -> Result<Vec<String>, TaskError> {
    let config = args.path("config").unwrap_or(Path::new(PYPROJECT));
    require_file(&project.root, config)?;
    let mut cmd = vec![
        "isort".to_string(),
        "--settings-file".to_string(),
        arg(config),
    ];
    if args.flag("check") {
        cmd.push("--check".to_string());
    }
    cmd.extend(source_targets(project)?);
    Ok(cmd)
}

fn run_isort(ctx: &Context<'_>, args: &Arguments) -> Result<Outcome, TaskError> {
    let cmd = isort_command(ctx.project, args)?;
    if args.flag("show_config") {
        return show_default_config(ctx);
    }
    let outcome = ctx.run(&cmd)?;
    if outcome.is_success() {
        ctx.console.println("Isort done.");
    }
    Ok(outcome)
}

/// Print the project's `pyproject.toml` instead of running a tool.
pub(crate) fn show_default_config(ctx: &Context<'_>) -> Result<Outcome, TaskError> {
    let path = ctx.project.pyproject();
    let contents = std::fs::read_to_string(&path).map_err(TaskError::io(&path))?;
    ctx.console.println(contents.trim_end());
    Ok(Outcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::invoker::resolve_arguments;

    fn project_with(dirs: &[&str], files: &[&str]) -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        for d in dirs {
            std::fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        for f in files {
            std::fs::write(dir.path().join(f), "").unwrap();
        }
        let project = Project::at(dir.path());
        (dir, project)
    }

    fn args_for(operation: &Operation, tokens: &[&str]) -> Arguments {
        let tokens: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        resolve_arguments(operation, &tokens).unwrap()
    }

    #[test]
    fn test_black_defaults() {
        let (_dir, project) = project_with(&["src", "tests"], &[]);
        let cmd = black_command(&project, &args_for(&black(), &[])).unwrap();
        insta::assert_snapshot!(cmd.join(" "), @"black -l 95 src tests");
    }

    #[test]
    fn test_black_check_with_line_length() {
        let (_dir, project) = project_with(&["src"], &[]);
        let cmd = black_command(&project, &args_for(&black(), &["--check", "-l", "120"])).unwrap();
        insta::assert_snapshot!(cmd.join(" "), @"black -l 120 --check src");
    }

    #[test]
    fn test_black_without_src() {
        let (_dir, project) = project_with(&["tests"], &[]);
        let err = black_command(&project, &args_for(&black(), &[])).unwrap_err();
        assert!(matches!(err, TaskError::MissingDirectory(_)));
    }

    #[test]
    fn test_isort_requires_settings_file() {
        let (_dir, project) = project_with(&["src"], &[]);
        let err = isort_command(&project, &args_for(&isort(), &[])).unwrap_err();
        assert_eq!(err.to_string(), "The file pyproject.toml doesn't exist");
    }

    #[test]
    fn test_isort_custom_config() {
        let (_dir, project) = project_with(&["src"], &["isort.cfg"]);
        let cmd =
            isort_command(&project, &args_for(&isort(), &["-c", "isort.cfg", "--check"])).unwrap();
        insta::assert_snapshot!(cmd.join(" "), @"isort --settings-file isort.cfg --check src");
    }
}
