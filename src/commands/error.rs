//! Command Errors
//!
//! Registration errors are fatal at startup. Command errors are raised by
//! handlers and reply capabilities and stop at the dispatcher.

use thiserror::Error;

/// Result alias for handler and reply calls
pub type Result<T> = std::result::Result<T, CommandError>;

/// Failure while running a command handler
#[derive(Debug, Error)]
pub enum CommandError {
    /// The reply could not be delivered through the chat client
    #[error("failed to send reply: {0}")]
    Reply(String),

    /// The handler gave up with a message of its own
    #[error("{0}")]
    Handler(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CommandError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

/// Rejected command registration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command name must not be empty")]
    EmptyName,

    #[error("command '{name}' has no aliases")]
    NoAliases { name: String },

    #[error("command '{name}' has an invalid alias '{alias}'")]
    InvalidAlias { name: String, alias: String },

    #[error("command '{0}' is already registered")]
    DuplicateName(String),

    /// An alias is already owned by `existing` (or repeated within `name`)
    #[error("alias '{alias}' of command '{name}' is already taken by '{existing}'")]
    DuplicateAlias {
        alias: String,
        name: String,
        existing: String,
    },
}
