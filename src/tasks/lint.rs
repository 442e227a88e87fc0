//! Style linters: ruff, and flake8 for projects that cannot run ruff.

use std::io::Write;
use std::path::Path;

use crate::operation::Context;
use crate::operation::param::{Arguments, Kind, Param};
use crate::operation::registry::Operation;
use crate::outcome::Outcome;
use crate::project::{PYPROJECT, Project};
use crate::tasks::format::show_default_config;
use crate::tasks::{TaskError, arg, require_dir, require_file, source_targets};

/// Default flake8 settings shipped with maestro.
pub const FLAKE8_DEFAULT_CONFIG: &str = include_str!("../../templates/cfg/flake8");

#[must_use]
pub fn ruff() -> Operation {
    Operation::task(
        "ruff",
        "Run the ruff linter.",
        vec![
            Param::flag("fix").help("Apply the safe fixes"),
            Param::option("config", Kind::Path)
                .alias("-c")
                .help("Replace the default config file"),
            Param::flag("show_config").alias("-s"),
        ],
        |ctx, args| {
            let cmd = ruff_command(ctx.project, args)?;
            if args.flag("show_config") {
                return show_default_config(ctx);
            }
            ctx.run(&cmd)
        },
    )
}

/// # Errors
///
/// Returns `TaskError::MissingFile` if the config file is missing, or
/// `TaskError::MissingDirectory` if the source directory is missing.
pub fn ruff_command(project: &Project, args: &Arguments) -> Result<Vec<String>, TaskError> {
    let config = args.path("config").unwrap_or(Path::new(PYPROJECT));
    require_file(&project.root, config)?;
    let mut cmd = vec![
        "ruff".to_string(),
        "check".to_string(),
        "--config".to_string(),
        arg(config),
    ];
    if args.flag("fix") {
        cmd.push("--fix".to_string());
    }
    cmd.extend(source_targets(project)?);
    Ok(cmd)
}

#[must_use]
pub fn flake8() -> Operation {
    Operation::task(
        "flake8",
        "Run the flake8 linter.",
        vec![
            Param::option("config", Kind::Path)
                .alias("-c")
                .help("Replace the default config file"),
            Param::option("append_config", Kind::Path)
                .alias("-a")
                .help("Append the default config file"),
            Param::flag("show_default_config").alias("-d"),
        ],
        run_flake8,
    )
}

/// Build the flake8 command line. `default_config` is where the bundled
/// settings were written, used when no `--config` is given.
///
/// # Errors
///
/// Returns `TaskError::MissingFile` if a config file is missing, or
/// `TaskError::MissingDirectory` if the source or tests directory is missing.
pub fn flake8_command(
    project: &Project,
    args: &Arguments,
    default_config: &Path,
) -> Result<Vec<String>, TaskError> {
    let config = args.path("config").unwrap_or(default_config);
    require_file(&project.root, config)?;
    let append = args.path("append_config").unwrap_or(Path::new("setup.cfg"));
    require_file(&project.root, append)?;

    let source = &project.settings.source_dir;
    let tests = &project.settings.tests_dir;
    require_dir(&project.root, source)?;
    require_dir(&project.root, tests)?;

    Ok(vec![
        "flake8".to_string(),
        "--config".to_string(),
        arg(config),
        "--append-config".to_string(),
        arg(append),
        arg(source),
        arg(tests),
    ])
}

fn run_flake8(ctx: &Context<'_>, args: &Arguments) -> Result<Outcome, TaskError> {
    if args.flag("show_default_config") {
        ctx.console.println(FLAKE8_DEFAULT_CONFIG.trim_end());
        return Ok(Outcome::Success);
    }

    let mut default_config = tempfile::Builder::new()
        .prefix("maestro-flake8-")
        .suffix(".cfg")
        .tempfile()
        .map_err(TaskError::io(Path::new("flake8 config")))?;
    default_config
        .write_all(FLAKE8_DEFAULT_CONFIG.as_bytes())
        .map_err(TaskError::io(default_config.path()))?;

    let cmd = flake8_command(ctx.project, args, default_config.path())?;
    ctx.run(&cmd)
}
