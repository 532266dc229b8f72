//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, warn};

use super::classifier::{Inbound, InboundKind};
use super::dispatcher::UpdateDispatcher;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dispatcher: Arc<UpdateDispatcher>,
) -> Result<()> {
    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query from user");

    let chat_id = q.message.as_ref().map(|m| m.chat().id.0);
    let inbound = match (chat_id, q.data.clone()) {
        (Some(chat_id), Some(data)) => Some(Inbound {
            sender_id: q.from.id.0,
            chat_id,
            kind: InboundKind::Callback { data },
        }),
        _ => None,
    };

    // Acknowledge first so the client stops its loading spinner
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
    }

    match inbound {
        Some(inbound) => dispatcher.handle(inbound).await,
        None => debug!(user_id = %q.from.id, "Callback query without message or data"),
    }
    Ok(())
}
