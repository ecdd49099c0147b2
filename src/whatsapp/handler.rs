//! WhatsApp Message Handler
//!
//! Turns message events into [`WhatsAppMessage`]s, enforces the allowlist,
//! and hands them to the command dispatcher.

use crate::commands::{ChatMessage, CommandError, DispatchOutcome, Dispatcher, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use wacore::types::message::MessageInfo;
use wacore_binary::jid::Jid;
use waproto::whatsapp as wa;
use whatsapp_rust::client::Client;

/// An incoming text message with a reply path back to its chat
pub struct WhatsAppMessage {
    client: Arc<Client>,
    chat: Jid,
    sender: String,
    text: String,
}

impl WhatsAppMessage {
    pub fn new(client: Arc<Client>, chat: Jid, sender: String, text: String) -> Self {
        Self {
            client,
            chat,
            sender,
            text,
        }
    }

    pub fn chat(&self) -> &Jid {
        &self.chat
    }
}

#[async_trait]
impl ChatMessage for WhatsAppMessage {
    fn text(&self) -> &str {
        &self.text
    }

    fn sender(&self) -> &str {
        &self.sender
    }

    async fn reply(&self, text: &str) -> Result<()> {
        let message = wa::Message {
            conversation: Some(text.to_string()),
            ..Default::default()
        };
        self.client
            .send_message(self.chat.clone(), message)
            .await
            .map_err(|e| CommandError::Reply(e.to_string()))?;
        Ok(())
    }
}

/// Plain or extended text body; other message kinds carry no command
pub fn extract_text(msg: &wa::Message) -> Option<&str> {
    msg.conversation
        .as_deref()
        .or_else(|| {
            msg.extended_text_message
                .as_ref()
                .and_then(|ext| ext.text.as_deref())
        })
        .filter(|text| !text.trim().is_empty())
}

/// Allowlist check; an empty list accepts everyone
pub fn is_allowed(allowed: &HashSet<String>, phone: &str) -> bool {
    allowed.is_empty() || allowed.contains(phone)
}

pub(crate) async fn handle_message(
    msg: wa::Message,
    info: MessageInfo,
    client: Arc<Client>,
    dispatcher: Dispatcher<Client>,
    allowed: Arc<HashSet<String>>,
) {
    let Some(text) = extract_text(&msg) else {
        return;
    };

    let phone = info.source.sender.user.clone();
    if !is_allowed(&allowed, &phone) {
        tracing::debug!("WhatsApp: ignoring message from non-allowed number {}", phone);
        return;
    }

    tracing::debug!(
        "WhatsApp: message from {} in {}: {}",
        phone,
        info.source.chat,
        text.chars().take(50).collect::<String>()
    );

    let message = WhatsAppMessage::new(
        client.clone(),
        info.source.chat.clone(),
        phone,
        text.to_string(),
    );

    if let DispatchOutcome::Failed { command, .. } =
        dispatcher.dispatch(client.as_ref(), &message).await
    {
        tracing::debug!("WhatsApp: '{}' failed for {}", command, message.chat());
    }
}
