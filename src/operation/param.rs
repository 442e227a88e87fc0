use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "choices", rename_all = "kebab-case")]
pub enum Kind {
    Text,
    Integer,
    /// Presence sets it to true, whatever value is attached.
    Flag,
    Path,
    Choice(&'static [&'static str]),
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Text => write!(f, "text"),
            Kind::Integer => write!(f, "an integer"),
            Kind::Flag => write!(f, "a flag"),
            Kind::Path => write!(f, "a path"),
            Kind::Choice(choices) => write!(f, "one of {}", choices.join(", ")),
        }
    }
}

/// A resolved argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Optional parameter that was not supplied.
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    Path(PathBuf),
    List(Vec<Value>),
}

impl Kind {
    /// Convert a raw token to a value of this kind.
    ///
    /// # Errors
    ///
    /// Returns the rejected token when it does not fit the kind.
    pub fn coerce(self, raw: &str) -> Result<Value, String> {
        match self {
            Kind::Flag => Ok(Value::Bool(true)),
            Kind::Text => Ok(Value::Text(raw.to_string())),
            Kind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| raw.to_string()),
            Kind::Path if raw.is_empty() => Err(raw.to_string()),
            Kind::Path => Ok(Value::Path(PathBuf::from(raw))),
            Kind::Choice(choices) => {
                if choices.contains(&raw) {
                    Ok(Value::Text(raw.to_string()))
                } else {
                    Err(raw.to_string())
                }
            }
        }
    }
}

/// One entry of an operation's parameter schema.
///
/// A parameter without a default is mandatory. Options default to `Value::Null`
/// and flags to `false` unless told otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct Param {
    pub name: &'static str,
    pub kind: Kind,
    pub help: &'static str,
    pub default: Option<Value>,
    /// External spellings, e.g. `--only-failed` and `-lf`. Empty for positionals.
    pub aliases: Vec<String>,
    pub positional: bool,
    /// Collects every occurrence into a list.
    pub repeated: bool,
}

impl Param {
    fn new(name: &'static str, kind: Kind, default: Option<Value>) -> Self {
        Self {
            name,
            kind,
            help: "",
            default,
            aliases: vec![format!("--{}", name.replace('_', "-"))],
            positional: false,
            repeated: false,
        }
    }

    #[must_use]
    pub fn flag(name: &'static str) -> Self {
        Self::new(name, Kind::Flag, Some(Value::Bool(false)))
    }

    #[must_use]
    pub fn option(name: &'static str, kind: Kind) -> Self {
        Self::new(name, kind, Some(Value::Null))
    }

    #[must_use]
    pub fn positional(name: &'static str, kind: Kind) -> Self {
        Self {
            aliases: Vec::new(),
            positional: true,
            ..Self::new(name, kind, Some(Value::Null))
        }
    }

    /// Replace the primary spelling.
    #[must_use]
    pub fn long(mut self, spelling: &str) -> Self {
        if self.aliases.is_empty() {
            self.aliases.push(spelling.to_string());
        } else {
            self.aliases[0] = spelling.to_string();
        }
        self
    }

    #[must_use]
    pub fn alias(mut self, spelling: &str) -> Self {
        self.aliases.push(spelling.to_string());
        self
    }

    #[must_use]
    pub fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }

    #[must_use]
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.default = None;
        self
    }

    #[must_use]
    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    #[must_use]
    pub fn takes_value(&self) -> bool {
        self.kind != Kind::Flag
    }

    #[must_use]
    pub fn matches(&self, spelling: &str) -> bool {
        self.aliases.iter().any(|a| a == spelling)
    }

    /// Name shown in usage lines.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.positional {
            let name = self.name.to_uppercase();
            if self.repeated { format!("{name}...") } else { name }
        } else {
            self.aliases.join(", ")
        }
    }
}

/// Values resolved against a schema, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    values: BTreeMap<String, Value>,
}

impl Arguments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used when calling an operation body directly.
    #[must_use]
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Append to a repeated parameter.
    pub(crate) fn push(&mut self, name: &str, value: Value) {
        match self.values.get_mut(name) {
            Some(Value::List(items)) => items.push(value),
            _ => {
                self.values
                    .insert(name.to_string(), Value::List(vec![value]));
            }
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Value::Bool(true)))
    }

    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn path(&self, name: &str) -> Option<&Path> {
        match self.get(name) {
            Some(Value::Path(p)) => Some(p),
            _ => None,
        }
    }

    /// Text items of a repeated parameter; empty when not supplied.
    #[must_use]
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.items(name)
            .filter_map(|v| match v {
                Value::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Path items of a repeated parameter; empty when not supplied.
    #[must_use]
    pub fn paths(&self, name: &str) -> Vec<&Path> {
        self.items(name)
            .filter_map(|v| match v {
                Value::Path(p) => Some(p.as_path()),
                _ => None,
            })
            .collect()
    }

    fn items(&self, name: &str) -> impl Iterator<Item = &Value> {
        let items: &[Value] = match self.get(name) {
            Some(Value::List(items)) => items,
            _ => &[],
        };
        items.iter()
    }
}
