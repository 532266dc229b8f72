//! Outbound chat operations behind a trait so handlers can run without Telegram

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::debug;

use super::ui_builder::{reply_markup, Keyboard};

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) -> Result<()>;

    /// Send a photo hosted at `url`
    async fn send_photo(&self, chat_id: i64, url: &str) -> Result<()>;
}

/// Sends through the Telegram Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) -> Result<()> {
        let request = self.bot.send_message(ChatId(chat_id), text);
        match keyboard {
            Some(keyboard) => {
                request.reply_markup(reply_markup(keyboard)).await?;
            }
            None => {
                request.await?;
            }
        }
        debug!(chat_id, "Message sent");
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, url: &str) -> Result<()> {
        let url = reqwest::Url::parse(url).with_context(|| format!("Invalid image URL: {url}"))?;
        self.bot
            .send_photo(ChatId(chat_id), InputFile::url(url))
            .await?;
        Ok(())
    }
}
