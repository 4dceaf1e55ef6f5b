use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use teloxide::types::{ChatId, Message, MessageId, UserId};

use super::timer::Timers;
use crate::database::DatabaseManager;
use crate::error::{ActivityError, GatewayError};
use crate::gateway::{Delivery, HostKey, MessageContent, MessagingGateway};
use crate::utils::datetime::today_in;

/// Collaborators shared by every activity of the process.
#[derive(Clone)]
pub struct ActivityEnv {
    pub gateway: Arc<dyn MessagingGateway>,
    pub db: DatabaseManager,
    /// Chat that receives operational warnings and error reports.
    pub operator_chat: Option<ChatId>,
    pub timezone: Tz,
}

impl ActivityEnv {
    pub fn new(gateway: Arc<dyn MessagingGateway>, db: DatabaseManager) -> Self {
        Self {
            gateway,
            db,
            operator_chat: None,
            timezone: chrono_tz::Europe::Helsinki,
        }
    }

    pub fn with_operator_chat(mut self, chat_id: Option<ChatId>) -> Self {
        self.operator_chat = chat_id;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Sends `text` to the operator chat. Returns `false` when none is configured.
    pub async fn notify_operators(&self, text: &str) -> Result<bool, GatewayError> {
        match self.operator_chat {
            Some(chat_id) => {
                self.gateway
                    .send_message(chat_id, &MessageContent::text(text))
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Where and by whom an activity was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerContext {
    pub chat_id: ChatId,
    pub user_id: Option<UserId>,
    pub message_id: Option<MessageId>,
    pub text: Option<String>,
}

impl TriggerContext {
    pub fn in_chat(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            user_id: None,
            message_id: None,
            text: None,
        }
    }

    pub fn from_message(msg: &Message) -> Self {
        Self {
            chat_id: msg.chat.id,
            user_id: msg.from().map(|u| u.id),
            message_id: Some(msg.id),
            text: msg.text().map(str::to_string),
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// The single physical message an activity edits in place.
pub(crate) struct HostMessage {
    pub(crate) chat_id: ChatId,
    pub(crate) message_id: Option<MessageId>,
    pub(crate) rendered: Option<MessageContent>,
}

impl HostMessage {
    pub(crate) fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            message_id: None,
            rendered: None,
        }
    }

    pub(crate) fn key(&self) -> Option<HostKey> {
        self.message_id.map(|id| HostKey::new(self.chat_id, id))
    }

    /// Creates the message on first use, edits it afterwards. Identical content is not resent.
    pub(crate) async fn show(
        &mut self,
        gateway: &dyn MessagingGateway,
        content: MessageContent,
    ) -> Result<(), ActivityError> {
        if self.rendered.as_ref() == Some(&content) {
            return Ok(());
        }

        match self.message_id {
            None => {
                let message_id = gateway.send_message(self.chat_id, &content).await?;
                self.message_id = Some(message_id);
            }
            Some(message_id) => {
                let delivery = gateway
                    .edit_message(self.chat_id, message_id, &content)
                    .await?;
                if delivery == Delivery::NotFound {
                    return Err(ActivityError::HostMessageGone {
                        chat_id: self.chat_id.0,
                        message_id: message_id.0,
                    });
                }
            }
        }

        self.rendered = Some(content);
        Ok(())
    }
}

/// Capabilities a state may use while it runs.
pub struct ActivityContext<'a> {
    pub(crate) env: &'a ActivityEnv,
    pub(crate) trigger: &'a TriggerContext,
    pub(crate) host: &'a mut HostMessage,
    pub(crate) timers: &'a mut Timers,
}

impl ActivityContext<'_> {
    pub fn chat_id(&self) -> ChatId {
        self.host.chat_id
    }

    pub fn trigger(&self) -> &TriggerContext {
        self.trigger
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.env.db
    }

    /// Current date in the bot's configured timezone.
    pub fn today(&self) -> NaiveDate {
        today_in(self.env.timezone)
    }

    pub fn host_message(&self) -> Option<MessageId> {
        self.host.message_id
    }

    /// Creates or edits the host message.
    pub async fn update_host(&mut self, content: MessageContent) -> Result<(), ActivityError> {
        self.host.show(self.env.gateway.as_ref(), content).await
    }

    /// Arms a named timer; an existing timer with the same name is replaced.
    /// When it fires the current state receives [`super::Response::Timer`].
    pub fn schedule_timer(&mut self, name: &str, delay: Duration) {
        self.timers.schedule(name, delay);
    }

    /// Returns whether a timer with that name was armed.
    pub fn cancel_timer(&mut self, name: &str) -> bool {
        self.timers.cancel(name)
    }

    pub async fn notify_operators(&self, text: &str) -> Result<bool, ActivityError> {
        Ok(self.env.notify_operators(text).await?)
    }
}
