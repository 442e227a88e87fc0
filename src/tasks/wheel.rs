use std::path::Path;

use log::info;

use crate::operation::Context;
use crate::operation::param::{Arguments, Kind, Param};
use crate::operation::registry::Operation;
use crate::outcome::Outcome;
use crate::tasks::{TaskError, arg};

const ALL_DEPS_HERE: &str = "All the wheels of the dependencies will be created in the project \
                             root. Are you sure?";

#[must_use]
pub fn wheel() -> Operation {
    Operation::task(
        "wheel",
        "Build a wheel of the package.",
        vec![
            Param::positional("wheel_dir", Kind::Path)
                .required()
                .help("Build wheel(s) into DIR"),
            Param::flag("all_deps")
                .alias("--all")
                .help("Build wheel of the package dependencies"),
        ],
        run_wheel,
    )
}

#[must_use]
pub fn wheel_command(wheel_dir: &Path, all_deps: bool) -> Vec<String> {
    let mut cmd: Vec<String> = ["python", "-m", "pip", "wheel"]
        .into_iter()
        .map(String::from)
        .collect();
    if !all_deps {
        cmd.push("--no-deps".to_string());
    }
    cmd.push("--wheel-dir".to_string());
    cmd.push(arg(wheel_dir));
    cmd.push(".".to_string());
    cmd
}

fn run_wheel(ctx: &Context<'_>, args: &Arguments) -> Result<Outcome, TaskError> {
    let Some(wheel_dir) = args.path("wheel_dir") else {
        return Err(TaskError::Precondition("No wheel directory given".to_string()));
    };
    let all_deps = args.flag("all_deps");
    let target = ctx.project.resolve(wheel_dir);

    if !target.exists() {
        info!("Creating {}", target.display());
        std::fs::create_dir_all(&target).map_err(TaskError::io(&target))?;
    }
    if !target.is_dir() {
        return Err(TaskError::Precondition(format!(
            "{} is not a directory",
            wheel_dir.display()
        )));
    }

    if all_deps
        && is_project_root(ctx, &target)
        && !ctx.prompter.confirm(ALL_DEPS_HERE, false)?
    {
        return Err(TaskError::Declined("Aborted.".to_string()));
    }

    ctx.run(&wheel_command(wheel_dir, all_deps))
}

fn is_project_root(ctx: &Context<'_>, dir: &Path) -> bool {
    match (dir.canonicalize(), ctx.project.root.canonicalize()) {
        (Ok(dir), Ok(root)) => dir == root,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_without_deps() {
        let cmd = wheel_command(Path::new("dist"), false);
        insta::assert_snapshot!(cmd.join(" "), @"python -m pip wheel --no-deps --wheel-dir dist .");
    }

    #[test]
    fn test_wheel_with_deps() {
        let cmd = wheel_command(Path::new("wheels"), true);
        insta::assert_snapshot!(cmd.join(" "), @"python -m pip wheel --wheel-dir wheels .");
    }

    #[test]
    fn test_wheel_dir_is_required() {
        assert!(wheel().params[0].is_required());
        assert!(wheel().accepts_positionals());
    }
}
