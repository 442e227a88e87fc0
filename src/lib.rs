//! Core implementation of maestro, the Python project maintenance runner
//!
//! maestro wraps the usual tools of a Python project (formatters, linters, the type checker,
//! the test runner, wheel building) behind one command line. Every task is an operation in a
//! static registry; operations are resolved and invoked by name, and a sequence operation
//! runs several of them in order, stopping at the first failure.

use crate::operation::registry::{Operation, Registry, RegistryError};

pub mod composite;
pub mod console;
pub mod logger;
pub mod operation;
pub mod outcome;
pub mod process;
pub mod project;
pub mod prompt;
pub mod pyproject;
pub mod tasks;

/// Build the registry of every operation, in listing order.
///
/// # Errors
///
/// Returns `RegistryError` if two operations share a name or a sequence refers
/// to an operation registered after it.
pub fn build_registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    let operations = [
        tasks::format::black(),
        tasks::format::isort(),
        tasks::lint::ruff(),
        tasks::lint::flake8(),
        tasks::typecheck::mypy(),
        Operation::sequence(
            "linting",
            "Apply black, isort, linting with ruff and check types with mypy.",
            &["black", "isort", "ruff", "mypy"],
        ),
        tasks::pytest::test(),
        tasks::wheel::wheel(),
        tasks::icons::icons(),
        tasks::scaffold::vscode(),
        tasks::scaffold::gitlab(),
        pyproject::ruff(),
        pyproject::isort(),
        pyproject::mypy(),
    ];
    for operation in operations {
        registry.register(operation)?;
    }
    Ok(registry)
}
