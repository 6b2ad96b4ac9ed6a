use crate::value::Value;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt;

/// One declared parameter of a [`Callable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// Value used when the caller supplies nothing for this parameter.
    pub default: Option<Value>,
}

impl Param {
    /// A parameter that must be supplied.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// A parameter that falls back to `default` when omitted.
    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Object-safe trait for anything a bang-command can resolve to.
///
/// The dispatcher reads [`Callable::params`] to decide how to split the raw
/// argument string, then calls [`Callable::call`] with exactly one value per
/// parameter.
pub trait Callable {
    /// Name the command is registered under.
    fn name(&self) -> &str;

    /// Ordered parameter list. The last entry receives the unsplit remainder.
    fn params(&self) -> &[Param];

    /// Invokes the command with resolved positional arguments.
    fn call(&self, args: Vec<Value>) -> Result<Value>;
}

type CommandFn = dyn Fn(Vec<Value>) -> Result<Value>;

/// A [`Callable`] backed by a closure.
pub struct FnCommand {
    name: String,
    params: Vec<Param>,
    body: Box<CommandFn>,
}

impl FnCommand {
    pub fn new<F>(name: impl Into<String>, params: Vec<Param>, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value> + 'static,
    {
        Self {
            name: name.into(),
            params,
            body: Box::new(body),
        }
    }
}

impl fmt::Debug for FnCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCommand")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Callable for FnCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[Param] {
        &self.params
    }

    fn call(&self, args: Vec<Value>) -> Result<Value> {
        (self.body)(args)
    }
}

/// Lookup of callables by name.
///
/// Implemented by whatever environment owns the set of available commands.
pub trait Registry {
    /// Returns the callable registered as `name`, if any.
    fn callable(&self, name: &str) -> Option<&dyn Callable>;
}

/// A simple in-memory [`Registry`].
#[derive(Default)]
pub struct CommandTable {
    commands: HashMap<String, Box<dyn Callable>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `command` under its own name, replacing any previous entry.
    pub fn register(&mut self, command: impl Callable + 'static) {
        self.commands
            .insert(command.name().to_string(), Box::new(command));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Registry for CommandTable {
    fn callable(&self, name: &str) -> Option<&dyn Callable> {
        self.commands.get(name).map(|c| c.as_ref())
    }
}
