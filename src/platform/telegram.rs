use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::info;

use super::ChannelSender;

/// Telegram rejects messages over 4096 chars; stay below it
const MAX_CHUNK_LEN: usize = 4000;

/// Split long messages for Telegram's 4096 char limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Delivers outbound messages through the Telegram Bot API
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot_token: &str) -> Self {
        info!("Starting Telegram sender...");
        Self {
            bot: Bot::new(bot_token),
        }
    }
}

#[async_trait]
impl ChannelSender for TelegramSender {
    async fn send(&self, chat_id: &str, content: &str) -> Result<()> {
        let id: i64 = chat_id
            .parse()
            .with_context(|| format!("Invalid Telegram chat_id: {}", chat_id))?;

        for chunk in split_message(content, MAX_CHUNK_LEN) {
            self.bot
                .send_message(ChatId(id), chunk)
                .await
                .with_context(|| format!("Failed to send Telegram message to {}", chat_id))?;
        }
        Ok(())
    }
}
