use super::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// An incoming chat message as seen by command handlers.
///
/// Implemented by each chat backend; handlers only read the text and reply.
#[async_trait]
pub trait ChatMessage: Send + Sync {
    /// Raw message text
    fn text(&self) -> &str;

    /// Display form of the sender (phone number or JID)
    fn sender(&self) -> &str;

    /// Send a text reply into the chat the message came from
    async fn reply(&self, text: &str) -> Result<()>;
}

/// Executes one command.
///
/// `C` is the live client handle; it is passed through untouched so handlers
/// can make their own protocol calls. Returning `Ok(false)` tells the
/// dispatcher the command declined to run.
#[async_trait]
pub trait CommandHandler<C: ?Sized + Sync>: Send + Sync {
    async fn execute(&self, client: &C, message: &dyn ChatMessage) -> Result<bool>;
}

/// Registered metadata and handler for one command
pub struct CommandDescriptor<C: ?Sized + Sync> {
    name: String,
    aliases: Vec<String>,
    tags: String,
    requires_prefix: bool,
    handler: Arc<dyn CommandHandler<C>>,
}

impl<C: ?Sized + Sync> CommandDescriptor<C> {
    /// New descriptor with no aliases, no tag, and the prefix required.
    pub fn new(name: impl Into<String>, handler: impl CommandHandler<C> + 'static) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            tags: String::new(),
            requires_prefix: true,
            handler: Arc::new(handler),
        }
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn requires_prefix(mut self, requires_prefix: bool) -> Self {
        self.requires_prefix = requires_prefix;
        self
    }
}

impl<C: ?Sized + Sync> CommandDescriptor<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias_list(&self) -> &[String] {
        &self.aliases
    }

    pub fn tag(&self) -> &str {
        &self.tags
    }

    pub fn is_prefix_required(&self) -> bool {
        self.requires_prefix
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler<C>> {
        &self.handler
    }

    /// Trim the name and lowercase the aliases into their stored form
    pub(super) fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        for alias in &mut self.aliases {
            *alias = alias.trim().to_lowercase();
        }
    }
}

impl<C: ?Sized + Sync> fmt::Debug for CommandDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("tags", &self.tags)
            .field("requires_prefix", &self.requires_prefix)
            .finish_non_exhaustive()
    }
}

/// Serializable summary of a command, used by the `commands` CLI listing
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommandSummary {
    pub name: String,
    pub aliases: Vec<String>,
    pub tags: String,
    pub requires_prefix: bool,
}

impl<C: ?Sized + Sync> From<&CommandDescriptor<C>> for CommandSummary {
    fn from(descriptor: &CommandDescriptor<C>) -> Self {
        Self {
            name: descriptor.name.clone(),
            aliases: descriptor.aliases.clone(),
            tags: descriptor.tags.clone(),
            requires_prefix: descriptor.requires_prefix,
        }
    }
}
