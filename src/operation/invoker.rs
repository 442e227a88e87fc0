//! Resolving raw command-line tokens against an operation's schema and calling it.
//!
//! Tokens follow the usual conventions: `--name value`, `--name=value`, short
//! aliases such as `-l 95`, bare flags, positional values, and `--` to end
//! option parsing. A flag is true as soon as it is present, whatever value is
//! attached to it.

use log::debug;
use thiserror::Error;

use crate::composite::CompositeRunner;
use crate::operation::Context;
use crate::operation::param::{Arguments, Param, Value};
use crate::operation::registry::{Body, Operation, Registry, RegistryError};
use crate::outcome::{EXIT_USAGE, Outcome};
use crate::tasks::TaskError;

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("missing required argument `{parameter}` for `{operation}`")]
    MissingRequiredArgument { operation: String, parameter: String },

    #[error("invalid value `{value}` for `{parameter}`: expected {expected}")]
    ArgumentType {
        parameter: String,
        value: String,
        expected: String,
    },

    #[error("unexpected argument `{token}` for `{operation}`")]
    UnexpectedArgument { operation: String, token: String },

    #[error("option `{option}` expects a value")]
    MissingValue { option: String },

    #[error("{operation}: {source}")]
    Execution {
        operation: String,
        #[source]
        source: TaskError,
    },
}

impl InvokeError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            InvokeError::Execution { source, .. } => source.exit_code(),
            _ => EXIT_USAGE,
        }
    }
}

/// An operation name plus the raw tokens it was called with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub operation: String,
    pub args: Vec<String>,
}

impl InvocationRequest {
    pub fn new<I, S>(operation: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operation: operation.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// A token after splitting, before type coercion.
#[derive(Debug, Clone)]
pub(crate) enum RawArg<'p> {
    Known {
        spelling: String,
        param: &'p Param,
        value: Option<String>,
    },
    /// An option no schema in scope declares.
    Unknown(String),
    Positional(String),
}

impl RawArg<'_> {
    /// Tokens reproducing this argument.
    pub(crate) fn to_tokens(&self) -> Vec<String> {
        match self {
            RawArg::Known {
                spelling, value, ..
            } => match value {
                Some(v) => vec![spelling.clone(), v.clone()],
                None => vec![spelling.clone()],
            },
            RawArg::Unknown(token) | RawArg::Positional(token) => vec![token.clone()],
        }
    }
}

/// Split tokens into options and positionals. `lookup` maps a spelling to its parameter.
pub(crate) fn lex<'p>(
    tokens: &[String],
    lookup: impl Fn(&str) -> Option<&'p Param>,
) -> Result<Vec<RawArg<'p>>, InvokeError> {
    let mut raw = Vec::with_capacity(tokens.len());
    let mut options_done = false;
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        if options_done || !looks_like_option(token) {
            raw.push(RawArg::Positional(token.clone()));
            continue;
        }
        if token == "--" {
            options_done = true;
            continue;
        }

        let (spelling, attached) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (token.as_str(), None),
        };
        let Some(param) = lookup(spelling) else {
            // An unknown option may carry a value; it is never a positional.
            if attached.is_none() {
                iter.next_if(|next| !looks_like_option(next));
            }
            raw.push(RawArg::Unknown(token.clone()));
            continue;
        };

        let value = if !param.takes_value() {
            None
        } else if attached.is_some() {
            attached
        } else {
            Some(iter.next().cloned().ok_or_else(|| InvokeError::MissingValue {
                option: spelling.to_string(),
            })?)
        };
        raw.push(RawArg::Known {
            spelling: spelling.to_string(),
            param,
            value,
        });
    }
    Ok(raw)
}

fn looks_like_option(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}

fn coerce(param: &Param, raw: &str) -> Result<Value, InvokeError> {
    param
        .kind
        .coerce(raw)
        .map_err(|value| InvokeError::ArgumentType {
            parameter: param.name.to_string(),
            value,
            expected: param.kind.to_string(),
        })
}

/// Resolve raw tokens against `operation`'s schema, filling in defaults.
///
/// # Errors
///
/// Returns `InvokeError::ArgumentType` when a value cannot be coerced,
/// `InvokeError::UnexpectedArgument` for tokens the schema does not declare, and
/// `InvokeError::MissingRequiredArgument` when a mandatory parameter is absent.
pub fn resolve_arguments(
    operation: &Operation,
    tokens: &[String],
) -> Result<Arguments, InvokeError> {
    let raw = lex(tokens, |spelling| operation.find_alias(spelling))?;
    let mut args = Arguments::new();
    let mut positionals = Vec::new();

    for arg in raw {
        match arg {
            RawArg::Known { param, value, .. } => {
                let value = match value {
                    Some(v) => coerce(param, &v)?,
                    None => Value::Bool(true),
                };
                if param.repeated {
                    args.push(param.name, value);
                } else {
                    args.set(param.name, value);
                }
            }
            RawArg::Unknown(token) => {
                return Err(InvokeError::UnexpectedArgument {
                    operation: operation.name.clone(),
                    token,
                });
            }
            RawArg::Positional(token) => positionals.push(token),
        }
    }

    let mut positionals = positionals.into_iter();
    for param in operation.params.iter().filter(|p| p.positional) {
        if param.repeated {
            for token in positionals.by_ref() {
                args.push(param.name, coerce(param, &token)?);
            }
        } else if let Some(token) = positionals.next() {
            args.set(param.name, coerce(param, &token)?);
        }
    }
    if let Some(token) = positionals.next() {
        return Err(InvokeError::UnexpectedArgument {
            operation: operation.name.clone(),
            token,
        });
    }

    for param in &operation.params {
        if args.contains(param.name) {
            continue;
        }
        match &param.default {
            Some(default) => args.set(param.name, default.clone()),
            None => {
                return Err(InvokeError::MissingRequiredArgument {
                    operation: operation.name.clone(),
                    parameter: param.name.to_string(),
                });
            }
        }
    }
    Ok(args)
}

/// Dispatches requests to registered operations.
pub struct Invoker<'a> {
    registry: &'a Registry,
    context: Context<'a>,
}

impl<'a> Invoker<'a> {
    #[must_use]
    pub fn new(registry: &'a Registry, context: Context<'a>) -> Self {
        Self { registry, context }
    }

    #[must_use]
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    #[must_use]
    pub fn context(&self) -> &Context<'a> {
        &self.context
    }

    /// Look up the requested operation and run it.
    ///
    /// # Errors
    ///
    /// Returns `InvokeError::Registry` for an unknown name, an argument error when
    /// the tokens do not fit the schema (the body is not called), or
    /// `InvokeError::Execution` wrapping whatever the body failed with.
    pub fn invoke(&self, request: &InvocationRequest) -> Result<Outcome, InvokeError> {
        let operation = self.registry.resolve(&request.operation)?;
        self.invoke_operation(operation, &request.args)
    }

    /// Run an already resolved operation with raw tokens.
    ///
    /// # Errors
    ///
    /// See [`Invoker::invoke`].
    pub fn invoke_operation(
        &self,
        operation: &Operation,
        tokens: &[String],
    ) -> Result<Outcome, InvokeError> {
        match operation.body() {
            Body::Task(_) => {
                let args = resolve_arguments(operation, tokens)?;
                self.invoke_resolved(operation, &args)
            }
            Body::Sequence(names) => {
                let steps = self.registry.steps(names)?;
                CompositeRunner::new(self).run_sequence(&operation.name, &steps, tokens)
            }
        }
    }

    /// Call a task's body with arguments already resolved against its schema.
    /// A sequence has no arguments of its own and runs with no shared tokens.
    ///
    /// # Errors
    ///
    /// Returns `InvokeError::Execution` wrapping whatever the body failed with.
    pub fn invoke_resolved(
        &self,
        operation: &Operation,
        args: &Arguments,
    ) -> Result<Outcome, InvokeError> {
        let Body::Task(body) = operation.body() else {
            return self.invoke_operation(operation, &[]);
        };
        debug!("Invoking '{}' with {args:?}", operation.name);
        body(&self.context, args).map_err(|source| InvokeError::Execution {
            operation: operation.name.clone(),
            source,
        })
    }
}
