//! Messaging gateway abstraction.
//!
//! Activities and message boards never talk to Telegram directly. They go
//! through [`MessagingGateway`], which keeps the engine transport-agnostic and
//! lets tests swap in [`memory::InMemoryGateway`].

pub mod memory;
pub mod telegram;

use async_trait::async_trait;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId};

use crate::error::GatewayError;

pub use memory::InMemoryGateway;
pub use telegram::TelegramGateway;

/// Identity of a physical message: the key every activity is indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostKey {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl HostKey {
    pub fn new(chat_id: ChatId, message_id: MessageId) -> Self {
        Self { chat_id, message_id }
    }
}

/// Text plus an optional inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageContent {
    pub text: String,
    pub markup: Option<InlineKeyboardMarkup>,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
        }
    }

    /// Attaches button rows. Empty rows are skipped and no rows at all means no keyboard.
    pub fn with_buttons(mut self, rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        let rows: Vec<_> = rows.into_iter().filter(|row| !row.is_empty()).collect();
        self.markup = if rows.is_empty() {
            None
        } else {
            Some(InlineKeyboardMarkup::new(rows))
        };
        self
    }

    pub fn has_buttons(&self) -> bool {
        self.markup.is_some()
    }

    /// Same text, keyboard removed.
    pub fn without_buttons(&self) -> Self {
        Self::text(self.text.clone())
    }
}

/// Shorthand for a callback button.
pub fn button(label: impl Into<String>, token: impl Into<String>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label.into(), token.into())
}

/// Outcome of an operation on an existing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Done,
    NotFound,
}

/// The capability set the engine consumes from the bot transport.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_message(
        &self,
        chat_id: ChatId,
        content: &MessageContent,
    ) -> Result<MessageId, GatewayError>;

    /// Replaces text and keyboard. A `None` keyboard clears any existing one.
    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        content: &MessageContent,
    ) -> Result<Delivery, GatewayError>;

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Delivery, GatewayError>;

    async fn pin_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Delivery, GatewayError>;
}
