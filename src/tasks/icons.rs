//! Compiling a package's Qt resource file into `icons.py`.

use std::path::{Path, PathBuf};

use log::debug;

use crate::operation::Context;
use crate::operation::param::{Arguments, Kind, Param, Value};
use crate::operation::registry::Operation;
use crate::outcome::Outcome;
use crate::project::Project;
use crate::prompt::PromptError;
use crate::tasks::{TaskError, arg, require_dir};

const QT_APIS: &[&str] = &["pyqt5", "pyside6"];

#[must_use]
pub fn icons() -> Operation {
    Operation::task(
        "icons",
        "Generate the icons.py file from the qrc file.",
        vec![
            Param::option("qt", Kind::Choice(QT_APIS))
                .default(Value::Text("pyqt5".to_string()))
                .help("Specify the Qt binding version. By default PyQt5 is used"),
        ],
        run_icons,
    )
}

/// Python packages directly under the source directory, sorted by name.
///
/// # Errors
///
/// Returns `TaskError::MissingDirectory` if the source directory is missing.
pub fn find_packages(project: &Project) -> Result<Vec<String>, TaskError> {
    require_dir(&project.root, &project.settings.source_dir)?;
    let source = project.source_dir();
    let entries = std::fs::read_dir(&source).map_err(TaskError::io(&source))?;
    let mut packages: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && path.join("__init__.py").exists())
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    packages.sort();
    Ok(packages)
}

/// `qrc` is relative to the project root.
#[must_use]
pub fn rcc_command(qt: &str, qrc: &Path) -> Vec<String> {
    let program = if qt == "pyside6" { "pyside6-rcc" } else { "pyrcc5" };
    let output = qrc.parent().unwrap_or(Path::new("")).join("icons.py");
    vec![
        program.to_string(),
        arg(qrc),
        "-o".to_string(),
        arg(&output),
    ]
}

fn run_icons(ctx: &Context<'_>, args: &Arguments) -> Result<Outcome, TaskError> {
    let packages = find_packages(ctx.project)?;
    if packages.is_empty() {
        return Err(TaskError::Precondition(format!(
            "No python package found in '{}'",
            ctx.project.settings.source_dir.display()
        )));
    }
    let package = ctx.prompter.select("Select a package", &packages, 0)?;
    debug!("Generating icons for package {package}");

    let mut qrc: PathBuf = ctx
        .project
        .settings
        .source_dir
        .join(&package)
        .join("icons")
        .join("icons.qrc");
    if !ctx.project.resolve(&qrc).exists() {
        ctx.console.println(format!("'{}' doesn't exist", qrc.display()));
        qrc = match ctx.prompter.text("Enter the qrc file path") {
            Ok(path) => PathBuf::from(path.trim()),
            Err(PromptError::NotInteractive(_)) => return Err(TaskError::MissingFile(qrc)),
            Err(e) => return Err(e.into()),
        };
    }
    let resolved = ctx.project.resolve(&qrc);
    if !resolved.exists() {
        return Err(TaskError::MissingFile(qrc));
    }
    if !resolved.is_file() {
        return Err(TaskError::Precondition(format!(
            "'{}' is not a file.",
            qrc.display()
        )));
    }

    let qt = args.text("qt").unwrap_or("pyqt5");
    ctx.run(&rcc_command(qt, &qrc))
}
