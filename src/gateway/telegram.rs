use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use teloxide::{ApiError, RequestError};

use super::{Delivery, MessageContent, MessagingGateway};
use crate::error::GatewayError;

/// [`MessagingGateway`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn classify(result: Result<(), RequestError>) -> Result<Delivery, GatewayError> {
    match result {
        Ok(()) => Ok(Delivery::Done),
        // Re-rendering identical content is not a failure.
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(Delivery::Done),
        Err(RequestError::Api(
            ApiError::MessageToEditNotFound
            | ApiError::MessageToDeleteNotFound
            | ApiError::MessageIdInvalid,
        )) => Ok(Delivery::NotFound),
        Err(e) => Err(GatewayError::Request(e)),
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_message(
        &self,
        chat_id: ChatId,
        content: &MessageContent,
    ) -> Result<MessageId, GatewayError> {
        let request = self.bot.send_message(chat_id, content.text.clone());
        let sent = match &content.markup {
            Some(markup) => request.reply_markup(markup.clone()).await?,
            None => request.await?,
        };
        tracing::debug!("Sent message {} to chat {}", sent.id.0, chat_id.0);
        Ok(sent.id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        content: &MessageContent,
    ) -> Result<Delivery, GatewayError> {
        let markup = content.markup.clone().unwrap_or_default();
        let result = self
            .bot
            .edit_message_text(chat_id, message_id, content.text.clone())
            .reply_markup(markup)
            .await
            .map(|_| ());
        classify(result)
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Delivery, GatewayError> {
        let result = self
            .bot
            .delete_message(chat_id, message_id)
            .await
            .map(|_| ());
        classify(result)
    }

    async fn pin_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Delivery, GatewayError> {
        let result = self
            .bot
            .pin_chat_message(chat_id, message_id)
            .disable_notification(true)
            .await
            .map(|_| ());
        classify(result)
    }
}
