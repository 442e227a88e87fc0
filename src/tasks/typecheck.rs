use std::path::Path;

use log::debug;

use crate::operation::param::{Arguments, Kind, Param, Value};
use crate::operation::registry::Operation;
use crate::project::{PYPROJECT, Project};
use crate::tasks::{TaskError, arg, require_dir, require_file};

/// Qt bindings mypy can be told about, in the order their flags are checked.
const QT_BINDINGS: [&str; 4] = ["PYQT5", "PYQT6", "PYSIDE2", "PYSIDE6"];

#[must_use]
pub fn mypy() -> Operation {
    Operation::task(
        "mypy",
        "Run the mypy type checker.",
        vec![
            Param::option("config_file", Kind::Path)
                .long("--config_file")
                .alias("-c"),
            Param::flag("strict").alias("-s"),
            Param::flag("pyqt5")
                .default(Value::Bool(true))
                .help("Use PyQt5 from QtPy"),
            Param::flag("pyqt6").help("Use PyQt6 from QtPy"),
            Param::flag("pyside2").help("Use PySide2 from QtPy"),
            Param::flag("pyside6").help("Use PySide6 from QtPy"),
            Param::positional("file_or_dir", Kind::Text)
                .repeated()
                .help("Path to a file or directory"),
        ],
        |ctx, args| ctx.run(&mypy_command(ctx.project, args)?),
    )
}

/// # Errors
///
/// Returns `TaskError::MissingFile` if the config file is missing, or
/// `TaskError::MissingDirectory` if no targets are given and the source
/// directory is missing.
pub fn mypy_command(project: &Project, args: &Arguments) -> Result<Vec<String>, TaskError> {
    let config = args.path("config_file").unwrap_or(Path::new(PYPROJECT));
    require_file(&project.root, config)?;

    let mut cmd = vec![
        "mypy".to_string(),
        "--config-file".to_string(),
        arg(config),
        "--pretty".to_string(),
        "--warn-unused-configs".to_string(),
    ];
    if args.flag("strict") {
        cmd.push("--strict".to_string());
    }

    let selected = if args.flag("pyqt6") {
        "PYQT6"
    } else if args.flag("pyside2") {
        "PYSIDE2"
    } else if args.flag("pyside6") {
        "PYSIDE6"
    } else {
        "PYQT5"
    };
    for binding in QT_BINDINGS {
        let state = if binding == selected { "true" } else { "false" };
        cmd.push(format!("--always-{state}={binding}"));
    }

    let targets = args.texts("file_or_dir");
    if targets.is_empty() {
        let source = &project.settings.source_dir;
        let tests = &project.settings.tests_dir;
        require_dir(&project.root, source)?;
        cmd.push(arg(source));
        if contains_python_files(&project.root.join(tests)) {
            cmd.push(arg(tests));
        } else {
            debug!("No python files under {}, not type checking it", tests.display());
        }
    } else {
        cmd.extend(targets.into_iter().map(ToString::to_string));
    }
    Ok(cmd)
}

fn contains_python_files(dir: &Path) -> bool {
    let pattern = format!(
        "{}/**/*.py",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    glob::glob(&pattern)
        .is_ok_and(|mut paths| paths.any(|entry| entry.is_ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::invoker::resolve_arguments;

    fn args_for(tokens: &[&str]) -> Arguments {
        let tokens: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        resolve_arguments(&mypy(), &tokens).unwrap()
    }

    fn project() -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join(PYPROJECT), "").unwrap();
        let project = Project::at(dir.path());
        (dir, project)
    }

    #[test]
    fn test_default_binding_is_pyqt5() {
        let (_dir, project) = project();
        let cmd = mypy_command(&project, &args_for(&[])).unwrap();
        insta::assert_snapshot!(cmd.join(" "), @"mypy --config-file pyproject.toml --pretty --warn-unused-configs --always-true=PYQT5 --always-false=PYQT6 --always-false=PYSIDE2 --always-false=PYSIDE6 src");
    }

    #[test]
    fn test_pyside6_and_strict() {
        let (_dir, project) = project();
        let cmd = mypy_command(&project, &args_for(&["--pyside6", "-s"])).unwrap();
        assert!(cmd.contains(&"--strict".to_string()));
        assert!(cmd.contains(&"--always-true=PYSIDE6".to_string()));
        assert!(cmd.contains(&"--always-false=PYQT5".to_string()));
    }

    #[test]
    fn test_tests_included_only_with_python_files() {
        let (dir, project) = project();
        std::fs::create_dir_all(dir.path().join("tests").join("unit")).unwrap();
        let cmd = mypy_command(&project, &args_for(&[])).unwrap();
        assert_eq!(cmd.last().map(String::as_str), Some("src"));

        std::fs::write(dir.path().join("tests").join("unit").join("test_a.py"), "").unwrap();
        let cmd = mypy_command(&project, &args_for(&[])).unwrap();
        assert_eq!(cmd.last().map(String::as_str), Some("tests"));
    }

    #[test]
    fn test_glob_characters_in_project_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("proj[1]*");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("tests")).unwrap();
        std::fs::write(root.join("tests").join("test_a.py"), "").unwrap();
        let project = Project::at(&root);

        let cmd = mypy_command(&project, &args_for(&[])).unwrap();
        assert_eq!(cmd.last().map(String::as_str), Some("tests"));
    }

    #[test]
    fn test_explicit_targets() {
        let (_dir, project) = project();
        let cmd = mypy_command(&project, &args_for(&["src/pkg/a.py", "src/pkg/b.py"])).unwrap();
        assert_eq!(cmd[cmd.len() - 2..], ["src/pkg/a.py", "src/pkg/b.py"]);
    }
}
