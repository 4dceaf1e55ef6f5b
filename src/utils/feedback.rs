use std::sync::Arc;

use teloxide::types::{ChatId, MessageId};

use crate::error::GatewayError;
use crate::gateway::{MessageContent, MessagingGateway};

/// Feedback types for different command outcomes
#[derive(Debug, Clone)]
pub enum FeedbackType {
    Success,
    Warning,
    Error,
    Info,
}

impl FeedbackType {
    fn emoji(&self) -> &'static str {
        match self {
            FeedbackType::Success => "✅",
            FeedbackType::Warning => "⚠️",
            FeedbackType::Error => "❌",
            FeedbackType::Info => "ℹ️",
        }
    }
}

/// Short one-off replies to commands, sent through the messaging gateway.
pub struct CommandFeedback {
    gateway: Arc<dyn MessagingGateway>,
    chat_id: ChatId,
}

impl CommandFeedback {
    pub fn new(gateway: Arc<dyn MessagingGateway>, chat_id: ChatId) -> Self {
        Self { gateway, chat_id }
    }

    pub fn format(feedback_type: &FeedbackType, message: &str) -> String {
        format!("{} {}", feedback_type.emoji(), message)
    }

    pub async fn send(
        &self,
        feedback_type: FeedbackType,
        message: &str,
    ) -> Result<MessageId, GatewayError> {
        let content = MessageContent::text(Self::format(&feedback_type, message));
        self.gateway.send_message(self.chat_id, &content).await
    }

    pub async fn success(&self, message: &str) -> Result<MessageId, GatewayError> {
        self.send(FeedbackType::Success, message).await
    }

    pub async fn error(&self, message: &str) -> Result<MessageId, GatewayError> {
        self.send(FeedbackType::Error, message).await
    }

    pub async fn warning(&self, message: &str) -> Result<MessageId, GatewayError> {
        self.send(FeedbackType::Warning, message).await
    }

    pub async fn info(&self, message: &str) -> Result<MessageId, GatewayError> {
        self.send(FeedbackType::Info, message).await
    }

    /// Validation error with a hint on how to fix the input
    pub async fn validation_error(
        &self,
        error: &str,
        suggestion: &str,
    ) -> Result<MessageId, GatewayError> {
        let message = format!("{error}\n\n💡 {suggestion}");
        self.send(FeedbackType::Error, &message).await
    }
}
