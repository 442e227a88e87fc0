use std::collections::HashMap;
use std::fmt;

use log::debug;
use thiserror::Error;

use crate::operation::Context;
use crate::operation::param::{Arguments, Param};
use crate::outcome::Outcome;
use crate::tasks::TaskError;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operation `{0}` is already registered")]
    DuplicateOperation(String),
    #[error("unknown operation `{0}` (run `maestro list` to see the available operations)")]
    UnknownOperation(String),
    #[error("sequence `{sequence}` refers to unregistered operation `{step}`")]
    UnknownStep { sequence: String, step: String },
}

/// Body of a task operation.
pub type TaskFn = dyn Fn(&Context<'_>, &Arguments) -> Result<Outcome, TaskError>;

pub enum Body {
    /// Does its own work.
    Task(Box<TaskFn>),
    /// Runs other operations, in order, stopping at the first failure.
    Sequence(Vec<String>),
}

/// A named, independently invokable unit of work.
pub struct Operation {
    pub name: String,
    pub summary: String,
    pub params: Vec<Param>,
    body: Body,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("summary", &self.summary)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Operation {
    pub fn task<F>(name: &str, summary: &str, params: Vec<Param>, body: F) -> Self
    where
        F: Fn(&Context<'_>, &Arguments) -> Result<Outcome, TaskError> + 'static,
    {
        Self {
            name: name.to_string(),
            summary: summary.to_string(),
            params,
            body: Body::Task(Box::new(body)),
        }
    }

    #[must_use]
    pub fn sequence(name: &str, summary: &str, steps: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            summary: summary.to_string(),
            params: Vec::new(),
            body: Body::Sequence(steps.iter().map(ToString::to_string).collect()),
        }
    }

    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Parameter spelled `spelling` on the command line, if any.
    #[must_use]
    pub fn find_alias(&self, spelling: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.matches(spelling))
    }

    #[must_use]
    pub fn accepts_positionals(&self) -> bool {
        self.params.iter().any(|p| p.positional)
    }
}

/// All operations, in registration order. Built once at startup and only read afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    operations: Vec<Operation>,
    index: HashMap<String, usize>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation. Sequence steps must already be registered.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateOperation` if the name is taken, or
    /// `RegistryError::UnknownStep` if a sequence names an unknown operation.
    pub fn register(&mut self, operation: Operation) -> Result<(), RegistryError> {
        if self.index.contains_key(&operation.name) {
            return Err(RegistryError::DuplicateOperation(operation.name));
        }
        if let Body::Sequence(steps) = &operation.body
            && let Some(step) = steps.iter().find(|s| !self.index.contains_key(s.as_str()))
        {
            return Err(RegistryError::UnknownStep {
                sequence: operation.name.clone(),
                step: step.clone(),
            });
        }
        debug!("Registered operation '{}'", operation.name);
        self.index
            .insert(operation.name.clone(), self.operations.len());
        self.operations.push(operation);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RegistryError::UnknownOperation` if no operation has this name.
    pub fn resolve(&self, name: &str) -> Result<&Operation, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.operations[i])
            .ok_or_else(|| RegistryError::UnknownOperation(name.to_string()))
    }

    /// Resolve the operation named by the leading command-line tokens.
    ///
    /// Grouped operations such as `pyproject ruff` take two tokens; the longest
    /// registered match wins. Returns the operation and the remaining tokens.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownOperation` if the tokens name no operation.
    pub fn resolve_tokens<'t>(
        &self,
        tokens: &'t [String],
    ) -> Result<(&Operation, &'t [String]), RegistryError> {
        let Some(first) = tokens.first() else {
            return Err(RegistryError::UnknownOperation(String::new()));
        };
        if let Some(second) = tokens.get(1)
            && let Ok(operation) = self.resolve(&format!("{first} {second}"))
        {
            return Ok((operation, &tokens[2..]));
        }
        Ok((self.resolve(first)?, &tokens[1..]))
    }

    /// Steps of a sequence, resolved.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownOperation` if a step is not registered.
    pub fn steps(&self, names: &[String]) -> Result<Vec<&Operation>, RegistryError> {
        names.iter().map(|n| self.resolve(n)).collect()
    }

    /// Parameters an operation accepts. For a sequence, the union of its steps'.
    #[must_use]
    pub fn schema<'a>(&'a self, operation: &'a Operation) -> Vec<&'a Param> {
        match &operation.body {
            Body::Task(_) => operation.params.iter().collect(),
            Body::Sequence(names) => {
                let mut params: Vec<&Param> = Vec::new();
                for step in names.iter().filter_map(|n| self.resolve(n).ok()) {
                    for param in &step.params {
                        if !params.iter().any(|p| p.name == param.name) {
                            params.push(param);
                        }
                    }
                }
                params
            }
        }
    }

    #[must_use]
    pub fn list(&self) -> &[Operation] {
        &self.operations
    }
}
