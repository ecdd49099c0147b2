//! Dispatch Flow Tests
//!
//! Built-in registry wired to a dispatcher, driven with recorded messages.

use crate::commands::{
    self, ChatMessage, CommandDescriptor, CommandError, CommandHandler, CommandRegistry,
    DispatchOutcome, Dispatcher, RegistryError, Result,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Client handle stand-in that counts how often handlers touched it
#[derive(Default)]
struct FakeClient {
    uses: AtomicUsize,
}

struct RecordedMessage {
    text: String,
    replies: Mutex<Vec<String>>,
}

impl RecordedMessage {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            replies: Mutex::new(Vec::new()),
        }
    }

    fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatMessage for RecordedMessage {
    fn text(&self) -> &str {
        &self.text
    }

    fn sender(&self) -> &str {
        "628123456789"
    }

    async fn reply(&self, text: &str) -> Result<()> {
        self.replies.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Fails every time it runs
struct Broken;

#[async_trait]
impl CommandHandler<FakeClient> for Broken {
    async fn execute(&self, client: &FakeClient, _message: &dyn ChatMessage) -> Result<bool> {
        client.uses.fetch_add(1, Ordering::SeqCst);
        Err(CommandError::handler("database unavailable"))
    }
}

/// Reply fails, as when the socket drops mid-command
struct Unreachable;

#[async_trait]
impl ChatMessage for Unreachable {
    fn text(&self) -> &str {
        ".ping"
    }

    fn sender(&self) -> &str {
        "628123456789"
    }

    async fn reply(&self, _text: &str) -> Result<()> {
        Err(CommandError::Reply("not connected".to_string()))
    }
}

fn builtin_dispatcher() -> Dispatcher<FakeClient> {
    let registry = commands::builtin_registry().unwrap();
    Dispatcher::new(Arc::new(registry), [".", "!", "/"])
}

#[tokio::test]
async fn test_ping_replies_pong_then_latency() {
    let dispatcher = builtin_dispatcher();
    let message = RecordedMessage::new(".ping");

    let outcome = dispatcher.dispatch(&FakeClient::default(), &message).await;
    assert_eq!(
        outcome,
        DispatchOutcome::Handled {
            command: "ping".to_string()
        }
    );

    let replies = message.replies();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0], "Pong!");
    let millis = replies[1]
        .strip_prefix("Ping: ")
        .and_then(|rest| rest.strip_suffix(" ms"))
        .unwrap();
    assert!(millis.parse::<u128>().is_ok());
}

#[tokio::test]
async fn test_ping_without_prefix_is_ignored() {
    let dispatcher = builtin_dispatcher();
    let message = RecordedMessage::new("ping");

    let outcome = dispatcher.dispatch(&FakeClient::default(), &message).await;
    assert_eq!(outcome, DispatchOutcome::NoMatch);
    assert!(message.replies().is_empty());
}

#[tokio::test]
async fn test_pingpong_is_not_ping() {
    let dispatcher = builtin_dispatcher();
    let message = RecordedMessage::new(".pingpong");

    let outcome = dispatcher.dispatch(&FakeClient::default(), &message).await;
    assert_eq!(outcome, DispatchOutcome::NoMatch);
    assert!(message.replies().is_empty());
}

#[tokio::test]
async fn test_reply_failure_is_reported_not_raised() {
    let dispatcher = builtin_dispatcher();
    let outcome = dispatcher.dispatch(&FakeClient::default(), &Unreachable).await;
    assert_eq!(
        outcome,
        DispatchOutcome::Failed {
            command: "ping".to_string(),
            error: "failed to send reply: not connected".to_string()
        }
    );
}

#[tokio::test]
async fn test_failing_command_does_not_affect_next_message() {
    let mut registry = CommandRegistry::new();
    commands::register_builtin(&mut registry).unwrap();
    registry
        .register(
            CommandDescriptor::new("broken", Broken)
                .aliases(["broken", "br"])
                .tags("tools"),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(Arc::new(registry), ["."]);
    let client = FakeClient::default();

    let failed = dispatcher.dispatch(&client, &RecordedMessage::new(".br")).await;
    assert!(matches!(failed, DispatchOutcome::Failed { ref command, .. } if command == "broken"));
    assert_eq!(client.uses.load(Ordering::SeqCst), 1);

    let message = RecordedMessage::new(".ping");
    let outcome = dispatcher.dispatch(&client, &message).await;
    assert_eq!(
        outcome,
        DispatchOutcome::Handled {
            command: "ping".to_string()
        }
    );
    assert_eq!(message.replies()[0], "Pong!");
}

#[tokio::test]
async fn test_concurrent_dispatch_shares_registry() {
    let dispatcher = builtin_dispatcher();
    let client = Arc::new(FakeClient::default());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            let client = client.clone();
            tokio::spawn(async move {
                let message = RecordedMessage::new("!ping");
                dispatcher.dispatch(client.as_ref(), &message).await;
                message.replies().len()
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), 2);
    }
}

#[test]
fn test_builtin_conflict_fails_fast() {
    let mut registry: CommandRegistry<FakeClient> = CommandRegistry::new();
    commands::register_builtin(&mut registry).unwrap();

    let err = commands::register_builtin(&mut registry).unwrap_err();
    assert_eq!(err, RegistryError::DuplicateName("ping".to_string()));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_builtin_table() {
    let registry: CommandRegistry<FakeClient> = commands::builtin_registry().unwrap();
    let ping = registry.get("ping").unwrap();
    assert_eq!(ping.alias_list(), ["ping"]);
    assert_eq!(ping.tag(), "main");
    assert!(ping.is_prefix_required());
}
