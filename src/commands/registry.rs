//! Command Registry
//!
//! Maps invocation aliases to command descriptors. Built once at startup,
//! then frozen behind an `Arc` and shared read-only with the dispatcher.

use super::error::RegistryError;
use super::types::{CommandDescriptor, CommandSummary};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Alias → descriptor table, preserving registration order
pub struct CommandRegistry<C: ?Sized + Sync> {
    commands: Vec<Arc<CommandDescriptor<C>>>,
    aliases: HashMap<String, usize>,
}

impl<C: ?Sized + Sync> CommandRegistry<C> {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            aliases: HashMap::new(),
        }
    }

    /// Register a command, one table entry per alias.
    ///
    /// The whole descriptor is validated before anything is inserted, so a
    /// rejected registration leaves the table untouched.
    pub fn register(&mut self, mut descriptor: CommandDescriptor<C>) -> Result<(), RegistryError> {
        descriptor.normalize();

        let name = descriptor.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if descriptor.alias_list().is_empty() {
            return Err(RegistryError::NoAliases { name });
        }
        if self.commands.iter().any(|c| c.name() == name) {
            return Err(RegistryError::DuplicateName(name));
        }

        let mut seen = HashSet::new();
        for alias in descriptor.alias_list() {
            if alias.is_empty() || alias.contains(char::is_whitespace) {
                return Err(RegistryError::InvalidAlias {
                    name,
                    alias: alias.clone(),
                });
            }
            if let Some(&idx) = self.aliases.get(alias) {
                return Err(RegistryError::DuplicateAlias {
                    alias: alias.clone(),
                    name,
                    existing: self.commands[idx].name().to_string(),
                });
            }
            if !seen.insert(alias.as_str()) {
                return Err(RegistryError::DuplicateAlias {
                    alias: alias.clone(),
                    name: name.clone(),
                    existing: name,
                });
            }
        }

        let idx = self.commands.len();
        for alias in descriptor.alias_list() {
            self.aliases.insert(alias.clone(), idx);
        }
        tracing::debug!(
            "Registered command '{}' (aliases: {}, tags: {}, prefix: {})",
            name,
            descriptor.alias_list().join(", "),
            descriptor.tag(),
            descriptor.is_prefix_required(),
        );
        self.commands.push(Arc::new(descriptor));
        Ok(())
    }

    /// Resolve a command token.
    ///
    /// `prefixed` says whether the message carried a configured prefix;
    /// prefix-only commands never match without one.
    pub fn lookup(&self, token: &str, prefixed: bool) -> Option<&Arc<CommandDescriptor<C>>> {
        let idx = *self.aliases.get(&token.to_lowercase())?;
        let descriptor = &self.commands[idx];
        if descriptor.is_prefix_required() && !prefixed {
            return None;
        }
        Some(descriptor)
    }

    /// Find a command by its unique name
    pub fn get(&self, name: &str) -> Option<&Arc<CommandDescriptor<C>>> {
        self.commands.iter().find(|c| c.name() == name)
    }

    /// Commands in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandDescriptor<C>>> {
        self.commands.iter()
    }

    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Arc<CommandDescriptor<C>>> {
        self.commands.iter().filter(move |c| c.tag() == tag)
    }

    /// Distinct tags in the order they first appeared
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        for command in &self.commands {
            if !tags.contains(&command.tag()) {
                tags.push(command.tag());
            }
        }
        tags
    }

    pub fn summaries(&self) -> Vec<CommandSummary> {
        self.commands.iter().map(|c| CommandSummary::from(c.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<C: ?Sized + Sync> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
