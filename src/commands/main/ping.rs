use crate::commands::error::Result;
use crate::commands::types::{ChatMessage, CommandDescriptor, CommandHandler};
use async_trait::async_trait;
use std::time::Instant;

/// Replies "Pong!" and then the time the first reply took to send
pub struct Ping;

#[async_trait]
impl<C: ?Sized + Sync> CommandHandler<C> for Ping {
    async fn execute(&self, _client: &C, message: &dyn ChatMessage) -> Result<bool> {
        let start = Instant::now();
        message.reply("Pong!").await?;

        let elapsed = start.elapsed();
        message
            .reply(&format!("Ping: {} ms", elapsed.as_millis()))
            .await?;

        Ok(true)
    }
}

pub(super) fn descriptor<C: ?Sized + Sync>() -> CommandDescriptor<C> {
    CommandDescriptor::new("ping", Ping)
        .aliases(["ping"])
        .tags("main")
        .requires_prefix(true)
}
