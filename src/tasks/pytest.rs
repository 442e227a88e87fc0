//! The pytest runner.

use std::path::{Component, Path};

use crate::operation::param::{Arguments, Kind, Param};
use crate::operation::registry::Operation;
use crate::project::Project;
use crate::tasks::{TaskError, arg};

pub const COVERAGE_REPORTS: &[&str] = &["xml", "html"];
const TERM_REPORT: &str = "--cov-report=term-missing:skip-covered";

#[must_use]
pub fn test() -> Operation {
    Operation::task(
        "test",
        "Run the tests.",
        vec![
            Param::positional("file_or_dir", Kind::Text)
                .repeated()
                .help("Path to the test file or directory"),
            Param::flag("parallel")
                .alias("-p")
                .help("Run in parallel grouped by file"),
            Param::flag("only_failed")
                .alias("-lf")
                .help("Run only the tests that failed at the last run"),
            Param::flag("coverage").alias("--cov").help("Add coverage"),
            Param::option("coverage_report", Kind::Choice(COVERAGE_REPORTS))
                .alias("--cov-report")
                .repeated()
                .help("Add coverage and generate an xml and/or html report"),
            Param::option("coverage_only", Kind::Path)
                .alias("--cov-only")
                .repeated()
                .help("Add coverage only for the given files"),
        ],
        |ctx, args| ctx.run(&pytest_command(ctx.project, args)),
    )
}

#[must_use]
pub fn pytest_command(project: &Project, args: &Arguments) -> Vec<String> {
    let mut cmd = vec!["pytest".to_string(), "-vv".to_string()];
    if args.flag("parallel") {
        cmd.extend(["-n", "auto", "--dist", "loadfile"].map(String::from));
    }
    if args.flag("only_failed") {
        cmd.push("--lf".to_string());
    }

    let reports = args.texts("coverage_report");
    let only = args.paths("coverage_only");
    if args.flag("coverage") || !reports.is_empty() {
        cmd.push(format!("--cov={}", arg(&project.settings.source_dir)));
        cmd.push(TERM_REPORT.to_string());
    } else if !only.is_empty() {
        for path in only {
            if project.resolve(path).is_file() {
                cmd.push(format!("--cov={}", module_name(path)));
            } else {
                cmd.push(format!("--cov={}", arg(path)));
            }
        }
        cmd.push(TERM_REPORT.to_string());
    }
    if reports.contains(&"xml") {
        cmd.push("--cov-report=xml".to_string());
        cmd.push("--junitxml=report.xml".to_string());
    }
    if reports.contains(&"html") {
        cmd.push("--cov-report=html".to_string());
    }

    let targets = args.texts("file_or_dir");
    if targets.is_empty() {
        cmd.push(arg(&project.settings.tests_dir));
    } else {
        cmd.extend(targets.into_iter().map(ToString::to_string));
    }
    cmd
}

/// Dotted import path of a source file: `src/pkg/mod.py` becomes `pkg.mod`.
fn module_name(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .skip(1)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let dotted = parts.join(".");
    dotted
        .strip_suffix(".py")
        .map_or_else(|| dotted.clone(), ToString::to_string)
}
