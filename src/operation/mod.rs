use crate::console::Console;
use crate::outcome::Outcome;
use crate::process::ProcessRunner;
use crate::project::Project;
use crate::prompt::Prompter;
use crate::tasks::TaskError;

pub mod help;
pub mod invoker;
pub mod param;
pub mod registry;

/// Everything an operation body may touch, scoped to one top-level invocation.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub project: &'a Project,
    pub console: &'a Console,
    pub runner: &'a dyn ProcessRunner,
    pub prompter: &'a dyn Prompter,
}

impl Context<'_> {
    /// Run an external tool in the project root.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Process` if the tool could not be started.
    pub fn run(&self, argv: &[String]) -> Result<Outcome, TaskError> {
        Ok(self.runner.run(argv, &self.project.root, self.console)?)
    }
}
