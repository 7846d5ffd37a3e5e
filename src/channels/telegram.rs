use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MaybeInaccessibleMessage};
use tracing::{info, warn};

use crate::callback::Button;
use crate::commands;
use crate::interaction::{self, CallbackEvent, CallbackOutcome, OriginalMessage};
use crate::traits::{BirthdayStore, Gateway};

/// Outbound side of the bot, kept behind [`Gateway`] so the notifier
/// and the handlers stay independent of teloxide.
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn inline_keyboard(buttons: &[Button]) -> InlineKeyboardMarkup {
    // One button per row, as the lists are short.
    InlineKeyboardMarkup::new(
        buttons
            .iter()
            .map(|b| vec![InlineKeyboardButton::callback(b.title.clone(), b.data.encode())]),
    )
}

#[async_trait]
impl Gateway for TelegramGateway {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&[Button]>,
    ) -> anyhow::Result<i32> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(buttons) = keyboard {
            request = request.reply_markup(inline_keyboard(buttons));
        }
        let message = request.await?;
        Ok(message.id.0)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<&[Button]>,
    ) -> anyhow::Result<()> {
        let mut request =
            self.bot
                .edit_message_text(ChatId(chat_id), teloxide::types::MessageId(message_id), text);
        if let Some(buttons) = keyboard {
            request = request.reply_markup(inline_keyboard(buttons));
        }
        request.await?;
        Ok(())
    }
}

/// Inbound side: long polling dispatcher for messages and button presses.
pub struct TelegramChannel {
    bot: Bot,
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn BirthdayStore>,
    timezone: Tz,
    upcoming_limit: usize,
}

impl TelegramChannel {
    pub fn new(
        bot: Bot,
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn BirthdayStore>,
        timezone: Tz,
        upcoming_limit: usize,
    ) -> Self {
        Self {
            bot,
            gateway,
            store,
            timezone,
            upcoming_limit,
        }
    }

    /// Run the dispatcher and restart it if it ever returns.
    /// Exponential backoff, reset after a stable run.
    pub async fn start_with_retry(self: Arc<Self>) {
        let initial_backoff = std::time::Duration::from_secs(5);
        let max_backoff = std::time::Duration::from_secs(60);
        let stable_threshold = std::time::Duration::from_secs(60);
        let mut backoff = initial_backoff;

        loop {
            let started = tokio::time::Instant::now();
            self.clone().start().await;
            let ran_for = started.elapsed();

            if ran_for >= stable_threshold {
                backoff = initial_backoff;
            }

            warn!(
                backoff_secs = backoff.as_secs(),
                ran_for_secs = ran_for.as_secs(),
                "Telegram dispatcher stopped, restarting"
            );
            tokio::time::sleep(backoff).await;
            backoff = std::cmp::min(backoff * 2, max_backoff);
        }
    }

    pub async fn start(self: Arc<Self>) {
        match self.bot.get_me().await {
            Ok(me) => info!(username = ?me.username, "Starting Telegram channel"),
            Err(e) => warn!("Failed to fetch bot identity: {}", e),
        }

        // A leftover webhook makes getUpdates return 409.
        if let Err(e) = self.bot.delete_webhook().await {
            warn!("Failed to delete webhook: {}", e);
        }

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint({
                let channel = Arc::clone(&self);
                move |msg: Message| {
                    let channel = Arc::clone(&channel);
                    async move {
                        channel.handle_message(msg).await;
                        respond(())
                    }
                }
            }))
            .branch(Update::filter_callback_query().endpoint({
                let channel = Arc::clone(&self);
                move |q: CallbackQuery| {
                    let channel = Arc::clone(&channel);
                    async move {
                        channel.handle_callback(q).await;
                        respond(())
                    }
                }
            }));

        Dispatcher::builder(self.bot.clone(), handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn handle_message(&self, msg: Message) {
        let Some(text) = msg.text() else {
            return;
        };
        let chat_id = msg.chat.id.0;
        let today = Utc::now().with_timezone(&self.timezone).date_naive();

        let reply = match commands::handle_command(
            self.store.as_ref(),
            self.upcoming_limit,
            chat_id,
            text,
            today,
        )
        .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(chat_id, "Command failed: {}", e);
                return;
            }
        };

        if let Err(e) = self
            .gateway
            .send_message(chat_id, &reply.text, reply.keyboard.as_deref())
            .await
        {
            warn!(chat_id, "Failed to send reply: {}", e);
        }
    }

    async fn handle_callback(&self, q: CallbackQuery) {
        // Telegram requires an answer even when nothing else happens,
        // otherwise the client keeps the button spinner going.
        if let Err(e) = self.bot.answer_callback_query(q.id.clone()).await {
            warn!("Failed to answer callback query: {}", e);
        }

        let message = q.message.as_ref().and_then(|m| match m {
            MaybeInaccessibleMessage::Regular(m) => Some(OriginalMessage {
                chat_id: m.chat.id.0,
                message_id: m.id.0,
            }),
            MaybeInaccessibleMessage::Inaccessible(_) => None,
        });
        let event = CallbackEvent {
            sender_chat: q.from.id.0 as i64,
            message,
            data: q.data.clone(),
        };

        match interaction::handle_callback(self.store.as_ref(), &event).await {
            Ok(CallbackOutcome::AckOnly) => {}
            Ok(CallbackOutcome::Edit {
                chat_id,
                message_id,
                text,
                keyboard,
            }) => {
                if let Err(e) = self
                    .gateway
                    .edit_message(chat_id, message_id, &text, keyboard.as_deref())
                    .await
                {
                    warn!(chat_id, message_id, "Failed to edit message: {}", e);
                }
            }
            Err(e) => warn!("Callback handling failed: {}", e),
        }
    }
}
