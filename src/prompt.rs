//! Interactive prompts.
//!
//! Prompts are only shown when stdin is a terminal. Without one, a
//! confirmation cannot be given and the caller has to treat the pending
//! overwrite as refused.

use std::io::IsTerminal;

use inquire::InquireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("confirmation required but not running in an interactive terminal: {0}")]
    NotInteractive(String),

    #[error("no options to choose from")]
    NoOptions,

    #[error("prompt failed: {0}")]
    Io(String),
}

impl From<InquireError> for PromptError {
    fn from(err: InquireError) -> Self {
        match err {
            InquireError::OperationCanceled | InquireError::OperationInterrupted => {
                PromptError::Cancelled
            }
            other => PromptError::Io(other.to_string()),
        }
    }
}

pub trait Prompter {
    /// Ask a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns `PromptError` if the question cannot be asked or is cancelled.
    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError>;

    /// Pick one of `options`, with `default` preselected.
    ///
    /// # Errors
    ///
    /// Returns `PromptError` if the question cannot be asked or is cancelled.
    fn select(&self, message: &str, options: &[String], default: usize)
    -> Result<String, PromptError>;

    /// Ask for free text.
    ///
    /// # Errors
    ///
    /// Returns `PromptError` if the question cannot be asked or is cancelled.
    fn text(&self, message: &str) -> Result<String, PromptError>;
}

/// Terminal prompts backed by `inquire`.
#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        Ok(inquire::Confirm::new(message).with_default(default).prompt()?)
    }

    fn select(
        &self,
        message: &str,
        options: &[String],
        default: usize,
    ) -> Result<String, PromptError> {
        if options.is_empty() {
            return Err(PromptError::NoOptions);
        }
        Ok(inquire::Select::new(message, options.to_vec())
            .with_starting_cursor(default.min(options.len() - 1))
            .prompt()?)
    }

    fn text(&self, message: &str) -> Result<String, PromptError> {
        Ok(inquire::Text::new(message).prompt()?)
    }
}

/// Prompter used when no terminal is attached.
///
/// Selections fall back to their default; confirmations and free text cannot
/// be answered.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool, PromptError> {
        Err(PromptError::NotInteractive(message.to_string()))
    }

    fn select(
        &self,
        _message: &str,
        options: &[String],
        default: usize,
    ) -> Result<String, PromptError> {
        options
            .get(default)
            .or_else(|| options.first())
            .cloned()
            .ok_or(PromptError::NoOptions)
    }

    fn text(&self, message: &str) -> Result<String, PromptError> {
        Err(PromptError::NotInteractive(message.to_string()))
    }
}

/// Pick the prompter matching the current stdin.
#[must_use]
pub fn for_stdin() -> Box<dyn Prompter> {
    if std::io::stdin().is_terminal() {
        Box::new(InquirePrompter)
    } else {
        Box::new(NonInteractive)
    }
}
