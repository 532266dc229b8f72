//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::debug;

use super::classifier::{Inbound, InboundKind};
use super::dispatcher::UpdateDispatcher;

/// Convert a Telegram message into a transport-neutral update
pub fn inbound_from_message(msg: &Message) -> Option<Inbound> {
    let sender = msg.from.as_ref()?;

    let kind = if let Some(text) = msg.text() {
        InboundKind::Text(text.to_string())
    } else if let Some(photos) = msg.photo() {
        // Largest size comes last
        match photos.last() {
            Some(photo) => InboundKind::Photo {
                reference: photo.file.id.0.clone(),
                caption: msg.caption().map(str::to_string),
            },
            None => InboundKind::Other,
        }
    } else {
        InboundKind::Other
    };

    Some(Inbound {
        sender_id: sender.id.0,
        chat_id: msg.chat.id.0,
        kind,
    })
}

pub async fn message_handler(msg: Message, dispatcher: Arc<UpdateDispatcher>) -> Result<()> {
    let Some(inbound) = inbound_from_message(&msg) else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };

    dispatcher.handle(inbound).await;
    Ok(())
}
