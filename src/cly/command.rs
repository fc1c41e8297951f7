//! # Commands
//!
//! A command is registered from a [`CommandSpec`] plus something to run. The spec
//! comes in three shapes, all normalized the same way:
//!
//! - a single name: `"greet"`
//! - a list whose head is the primary name and whose tail are aliases: `["bye", "farewell"]`
//! - a spec with a description: `CommandSpec::new(["joke", "tell-joke"]).description("...")`
//!
//! Handlers are stored uniformly as functions from `&ParsedArgs` to a boxed local
//! future. Sync handlers run eagerly and hand back a ready future; async handlers get
//! their own copy of the arguments so their futures can outlive the call.

use crate::args::ParsedArgs;
use crate::error::HandlerResult;
use futures::future::{self, FutureExt, LocalBoxFuture};
use std::fmt;
use std::future::Future;

/// Names and description of a command, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Primary name first, aliases after.
    pub names: Vec<String>,
    pub description: Option<String>,
}

impl CommandSpec {
    pub fn new(command: impl Into<CommandSpec>) -> Self {
        command.into()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    pub fn aliases(&self) -> &[String] {
        self.names.get(1..).unwrap_or(&[])
    }
}

impl From<&str> for CommandSpec {
    fn from(name: &str) -> Self {
        Self {
            names: vec![name.to_string()],
            description: None,
        }
    }
}

impl From<String> for CommandSpec {
    fn from(name: String) -> Self {
        Self {
            names: vec![name],
            description: None,
        }
    }
}

impl From<Vec<String>> for CommandSpec {
    fn from(names: Vec<String>) -> Self {
        Self {
            names,
            description: None,
        }
    }
}

impl From<Vec<&str>> for CommandSpec {
    fn from(names: Vec<&str>) -> Self {
        names.as_slice().into()
    }
}

impl From<&[&str]> for CommandSpec {
    fn from(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            description: None,
        }
    }
}

impl<const N: usize> From<[&str; N]> for CommandSpec {
    fn from(names: [&str; N]) -> Self {
        names.as_slice().into()
    }
}

type BoxedHandler = Box<dyn Fn(&ParsedArgs) -> LocalBoxFuture<'static, HandlerResult>>;

/// A command body, sync or async, behind one calling convention.
pub struct Handler(BoxedHandler);

impl Handler {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&ParsedArgs) -> HandlerResult + 'static,
    {
        Self(Box::new(move |args: &ParsedArgs| {
            future::ready(f(args)).boxed_local()
        }))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(ParsedArgs) -> Fut + 'static,
        Fut: Future<Output = HandlerResult> + 'static,
    {
        Self(Box::new(move |args: &ParsedArgs| {
            f(args.clone()).boxed_local()
        }))
    }

    pub fn call(&self, args: &ParsedArgs) -> LocalBoxFuture<'static, HandlerResult> {
        (self.0)(args)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// What a registered command does when selected.
#[derive(Debug)]
pub(crate) enum Action {
    Run(Handler),
    /// Built-in help: describe the command named by the second positional, or show help.
    Help,
}

/// A validated, registered command.
#[derive(Debug)]
pub struct CommandEntry {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    action: Action,
}

impl CommandEntry {
    pub(crate) fn new(
        name: String,
        aliases: Vec<String>,
        description: Option<String>,
        action: Action,
    ) -> Self {
        Self {
            name,
            aliases,
            description,
            action,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The description, if one was given and it is not empty.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    pub fn is_help(&self) -> bool {
        matches!(self.action, Action::Help)
    }

    /// Whether `token` is the primary name or one of the aliases.
    pub fn answers_to(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|a| a == token)
    }

    pub(crate) fn action(&self) -> &Action {
        &self.action
    }
}
