//! Operation results and the process exit codes they map to.

/// Exit code for a failure that has no more specific code (I/O, serialization).
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for an unknown operation or an argument that could not be resolved.
pub const EXIT_USAGE: i32 = 2;
/// Exit code for a missing file, directory or executable.
pub const EXIT_PRECONDITION: i32 = 3;
/// Exit code for an overwrite that was refused or could not be confirmed.
pub const EXIT_CONFLICT: i32 = 4;
/// Exit code when the user cancels a prompt.
pub const EXIT_ABORTED: i32 = 130;

/// Result of an operation that ran to completion.
///
/// Errors that prevent an operation from running at all are reported through
/// the error types instead; `Failed` means the work ran and reported failure,
/// usually an external tool exiting non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed { code: i32 },
}

impl Outcome {
    /// Build an outcome from a raw exit status. Zero is success.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            Outcome::Success
        } else {
            Outcome::Failed { code }
        }
    }

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::Failed { code } => code,
        }
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}
