//! Listing operations and describing their parameters.

use std::fmt::Write;

use serde::Serialize;

use crate::operation::param::{Kind, Param, Value};
use crate::operation::registry::{Body, Operation, Registry};

/// Machine readable description of one operation, as printed by `maestro list --json`.
#[derive(Debug, Serialize)]
pub struct OperationInfo<'a> {
    pub name: &'a str,
    pub summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<&'a [String]>,
    pub params: Vec<&'a Param>,
}

#[must_use]
pub fn describe(registry: &Registry) -> Vec<OperationInfo<'_>> {
    registry
        .list()
        .iter()
        .map(|operation| OperationInfo {
            name: &operation.name,
            summary: &operation.summary,
            steps: match operation.body() {
                Body::Sequence(steps) => Some(steps.as_slice()),
                Body::Task(_) => None,
            },
            params: registry.schema(operation),
        })
        .collect()
}

/// One line per operation: name and summary, names aligned.
#[must_use]
pub fn listing(registry: &Registry) -> String {
    let width = registry
        .list()
        .iter()
        .map(|op| op.name.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for operation in registry.list() {
        let _ = writeln!(out, "  {:<width$}  {}", operation.name, operation.summary);
    }
    out
}

/// Usage text for `maestro <operation> --help`.
#[must_use]
pub fn usage(registry: &Registry, operation: &Operation) -> String {
    let params = registry.schema(operation);
    let (positionals, options): (Vec<&Param>, Vec<&Param>) =
        params.into_iter().partition(|p| p.positional);

    let mut out = format!("Usage: maestro {}", operation.name);
    if !options.is_empty() {
        out.push_str(" [OPTIONS]");
    }
    for param in &positionals {
        if param.is_required() {
            let _ = write!(out, " <{}>", param.display_name());
        } else {
            let _ = write!(out, " [{}]", param.display_name());
        }
    }
    let _ = write!(out, "\n\n{}\n", operation.summary);

    if let Body::Sequence(steps) = operation.body() {
        let _ = write!(out, "\nRuns, in order: {}\n", steps.join(", "));
    }

    let rows: Vec<(String, String)> = positionals
        .iter()
        .chain(&options)
        .map(|param| (spelling(param), description(param)))
        .collect();
    if !rows.is_empty() {
        let width = rows.iter().map(|(s, _)| s.len()).max().unwrap_or(0);
        out.push_str("\nArguments:\n");
        for (spelling, description) in rows {
            let _ = writeln!(out, "  {spelling:<width$}  {description}");
        }
    }
    out
}

fn spelling(param: &Param) -> String {
    let name = param.display_name();
    if param.positional {
        return name;
    }
    match param.kind {
        Kind::Flag => name,
        Kind::Choice(choices) => format!("{name} <{}>", choices.join("|")),
        Kind::Integer => format!("{name} <INT>"),
        Kind::Path => format!("{name} <PATH>"),
        Kind::Text => format!("{name} <TEXT>"),
    }
}

fn description(param: &Param) -> String {
    let mut text = param.help.to_string();
    let default = match &param.default {
        Some(Value::Integer(n)) => Some(n.to_string()),
        Some(Value::Text(s)) => Some(s.clone()),
        Some(Value::Bool(true)) => Some("true".to_string()),
        _ => None,
    };
    if let Some(default) = default {
        if !text.is_empty() {
            text.push(' ');
        }
        let _ = write!(text, "[default: {default}]");
    }
    if param.repeated && !param.positional {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str("[repeatable]");
    }
    text
}
