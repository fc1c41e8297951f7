//! # Command Registry
//!
//! Maps primary names to [`CommandEntry`] values, in registration order (help
//! lists commands in that order).
//!
//! Registration validates before touching anything, so a rejected command leaves
//! the registry exactly as it was. The checks run in this order:
//!
//! 1. the primary name is present and non-empty ([`ClyError::NoCommandName`])
//! 2. the primary name has no whitespace ([`ClyError::InvalidCommandName`])
//! 3. every alias is non-empty and has no whitespace ([`ClyError::InvalidAlias`])
//! 4. the primary name is not registered yet ([`ClyError::DuplicateCommand`])
//!
//! Aliases are not checked against other commands unless strict aliases are on, in
//! which case any overlap between the new names and existing names or aliases is an
//! [`ClyError::AliasConflict`]. Without it, alias lookup takes the first command
//! (in registration order) that lists the token.

use crate::command::{Action, CommandEntry, CommandSpec};
use crate::error::{ClyError, Result};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
    strict_aliases: bool,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict_aliases(mut self, strict: bool) -> Self {
        self.strict_aliases = strict;
        self
    }

    pub(crate) fn register(&mut self, spec: CommandSpec, action: Action) -> Result<()> {
        if let Err(e) = self.validate(&spec) {
            warn!(error = %e, "command registration rejected");
            return Err(e);
        }

        let CommandSpec {
            mut names,
            description,
        } = spec;
        let name = names.remove(0);
        debug!(command = %name, aliases = ?names, "registered command");
        self.entries
            .push(CommandEntry::new(name, names, description, action));
        Ok(())
    }

    fn validate(&self, spec: &CommandSpec) -> Result<()> {
        let name = match spec.name() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ClyError::NoCommandName),
        };
        if has_whitespace(name) {
            return Err(ClyError::InvalidCommandName(name.to_string()));
        }
        for alias in spec.aliases() {
            if alias.is_empty() || has_whitespace(alias) {
                return Err(ClyError::InvalidAlias {
                    command: name.to_string(),
                    alias: alias.clone(),
                });
            }
        }
        if self.contains(name) {
            return Err(ClyError::DuplicateCommand(name.to_string()));
        }
        if self.strict_aliases {
            self.check_conflicts(&spec.names)?;
        }
        Ok(())
    }

    fn check_conflicts(&self, names: &[String]) -> Result<()> {
        for (i, token) in names.iter().enumerate() {
            if let Some(existing) = self.entries.iter().find(|e| e.answers_to(token)) {
                return Err(ClyError::AliasConflict {
                    name: token.clone(),
                    existing: existing.name().to_string(),
                });
            }
            if names[..i].contains(token) {
                return Err(ClyError::AliasConflict {
                    name: token.clone(),
                    existing: names[0].clone(),
                });
            }
        }
        Ok(())
    }

    /// Looks up a command by primary name only.
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The primary name of the first command listing `token` as an alias.
    pub fn resolve_alias(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.aliases().iter().any(|a| a == token))
            .map(CommandEntry::name)
    }

    /// Looks up a command the way dispatch does: alias first, then primary name.
    pub fn find(&self, token: &str) -> Option<&CommandEntry> {
        let name = self.resolve_alias(token).unwrap_or(token);
        self.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(CommandEntry::name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn has_whitespace(s: &str) -> bool {
    s.chars().any(char::is_whitespace)
}
