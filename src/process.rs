//! Spawning external tools.

use std::io;
use std::path::Path;
use std::process::{Command as ProcessCommand, ExitStatus};

use log::debug;
use thiserror::Error;

use crate::console::Console;
use crate::outcome::{EXIT_FAILURE, EXIT_PRECONDITION, Outcome};

/// A tool that could not be started at all, as opposed to one that ran and failed.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("executable `{program}` not found, is it installed and on PATH?")]
    ExecutableNotFound { program: String },

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("empty command line")]
    EmptyCommand,
}

impl ProcessError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            ProcessError::ExecutableNotFound { .. } => EXIT_PRECONDITION,
            ProcessError::Spawn { .. } | ProcessError::EmptyCommand => EXIT_FAILURE,
        }
    }
}

pub trait ProcessRunner {
    /// Run `argv` in `cwd`, block until it exits and return its status unmodified.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError` if the process could not be started.
    fn run(&self, argv: &[String], cwd: &Path, console: &Console) -> Result<Outcome, ProcessError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, argv: &[String], cwd: &Path, console: &Console) -> Result<Outcome, ProcessError> {
        let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;
        debug!("Running `{}` in {}", argv.join(" "), cwd.display());

        let mut command = ProcessCommand::new(program);
        command.args(args).current_dir(cwd);

        let spawn_error = |source: io::Error| {
            if source.kind() == io::ErrorKind::NotFound {
                ProcessError::ExecutableNotFound {
                    program: program.clone(),
                }
            } else {
                ProcessError::Spawn {
                    program: program.clone(),
                    source,
                }
            }
        };

        let status = if console.inherits_stdio() {
            command.status().map_err(spawn_error)?
        } else {
            let output = command.output().map_err(spawn_error)?;
            console.write_raw(&output.stdout);
            console.write_raw(&output.stderr);
            output.status
        };

        let code = exit_code(status);
        debug!("`{program}` exited with {code}");
        Ok(Outcome::from_code(code))
    }
}

/// Exit code of a finished child. A child killed by a signal reports `128 + signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    EXIT_FAILURE
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_success_status() {
        let (console, _) = Console::buffered();
        let dir = tempfile::tempdir().unwrap();
        let outcome = SystemRunner.run(&argv(&["true"]), dir.path(), &console).unwrap();
        assert_eq!(outcome, Outcome::Success);
    }

    #[test]
    fn test_exit_code_propagated_verbatim() {
        let (console, _) = Console::buffered();
        let dir = tempfile::tempdir().unwrap();
        let outcome = SystemRunner
            .run(&argv(&["sh", "-c", "exit 7"]), dir.path(), &console)
            .unwrap();
        assert_eq!(outcome, Outcome::Failed { code: 7 });
    }

    #[test]
    fn test_output_copied_into_buffered_console() {
        let (console, buffer) = Console::buffered();
        let dir = tempfile::tempdir().unwrap();
        SystemRunner
            .run(&argv(&["sh", "-c", "echo hello"]), dir.path(), &console)
            .unwrap();
        assert_eq!(buffer.contents(), "hello\n");
    }

    #[test]
    fn test_missing_executable_is_distinct_error() {
        let (console, _) = Console::buffered();
        let dir = tempfile::tempdir().unwrap();
        let result = SystemRunner.run(
            &argv(&["maestro-test-no-such-tool"]),
            dir.path(),
            &console,
        );
        match result {
            Err(ProcessError::ExecutableNotFound { program }) => {
                assert_eq!(program, "maestro-test-no-such-tool");
            }
            other => panic!("Expected ExecutableNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn test_empty_command_rejected() {
        let (console, _) = Console::buffered();
        let dir = tempfile::tempdir().unwrap();
        let result = SystemRunner.run(&[], dir.path(), &console);
        assert!(matches!(result, Err(ProcessError::EmptyCommand)));
    }
}
