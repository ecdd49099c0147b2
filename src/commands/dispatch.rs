//! Command Dispatcher
//!
//! Turns one incoming message into at most one handler call. Handler failures
//! (errors, `false` returns, panics) are logged here and never propagate.

use super::registry::CommandRegistry;
use super::types::ChatMessage;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// A message split into prefix, command token and arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The configured prefix the message started with, if any
    pub prefix: Option<String>,
    /// Lowercased command token
    pub command: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn is_prefixed(&self) -> bool {
        self.prefix.is_some()
    }
}

/// What happened to a dispatched message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command
    NoMatch,
    Handled { command: String },
    /// The handler returned `false`
    Declined { command: String },
    /// The handler returned an error or panicked
    Failed { command: String, error: String },
}

/// Routes messages to handlers in a frozen registry
pub struct Dispatcher<C: ?Sized + Sync> {
    registry: Arc<CommandRegistry<C>>,
    /// Longest first, so "!!" wins over "!"
    prefixes: Vec<String>,
}

impl<C: ?Sized + Sync> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            prefixes: self.prefixes.clone(),
        }
    }
}

impl<C: ?Sized + Sync> Dispatcher<C> {
    pub fn new<I, S>(registry: Arc<CommandRegistry<C>>, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefixes: Vec<String> = prefixes
            .into_iter()
            .map(Into::into)
            .filter(|p| !p.is_empty())
            .collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        prefixes.dedup();

        Self { registry, prefixes }
    }

    pub fn registry(&self) -> &CommandRegistry<C> {
        &self.registry
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Split message text into an invocation.
    ///
    /// Returns `None` for empty text and for a prefix with nothing after it.
    pub fn parse(&self, text: &str) -> Option<Invocation> {
        let text = text.trim_start();

        let (prefix, rest) = match self.prefixes.iter().find(|p| text.starts_with(p.as_str())) {
            Some(p) => (Some(p.clone()), &text[p.len()..]),
            None => (None, text),
        };

        // "! ping" is not a command: the token must follow the prefix directly
        if prefix.is_some() && rest.starts_with(char::is_whitespace) {
            return None;
        }
        let mut words = rest.split_whitespace();
        let command = words.next()?.to_lowercase();
        let args = words.map(str::to_string).collect();

        Some(Invocation {
            prefix,
            command,
            args,
        })
    }

    /// Run the command a message asks for, if any.
    ///
    /// The handler is awaited on the caller's task.
    pub async fn dispatch(&self, client: &C, message: &dyn ChatMessage) -> DispatchOutcome {
        let Some(invocation) = self.parse(message.text()) else {
            return DispatchOutcome::NoMatch;
        };
        let Some(descriptor) = self
            .registry
            .lookup(&invocation.command, invocation.is_prefixed())
        else {
            return DispatchOutcome::NoMatch;
        };

        let command = descriptor.name().to_string();
        tracing::info!(
            "Command '{}' from {} (args: {})",
            command,
            message.sender(),
            invocation.args.len()
        );

        let result = AssertUnwindSafe(descriptor.handler().execute(client, message))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(true)) => DispatchOutcome::Handled { command },
            Ok(Ok(false)) => {
                tracing::warn!("Command '{}' reported failure", command);
                DispatchOutcome::Declined { command }
            }
            Ok(Err(e)) => {
                tracing::error!("Command '{}' failed: {}", command, e);
                DispatchOutcome::Failed {
                    command,
                    error: e.to_string(),
                }
            }
            Err(panic) => {
                let error = panic_message(panic.as_ref());
                tracing::error!("Command '{}' panicked: {}", command, error);
                DispatchOutcome::Failed { command, error }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
