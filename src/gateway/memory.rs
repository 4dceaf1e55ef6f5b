use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use teloxide::types::{ChatId, MessageId};

use super::{Delivery, HostKey, MessageContent, MessagingGateway};
use crate::error::GatewayError;

/// Gateway operation as seen by [`InMemoryGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Send(HostKey, MessageContent),
    Edit(HostKey, MessageContent),
    Delete(HostKey),
    Pin(HostKey),
}

#[derive(Default)]
struct Inner {
    next_id: i32,
    messages: HashMap<HostKey, MessageContent>,
    pinned: Vec<HostKey>,
    calls: Vec<GatewayCall>,
    fail_sends: bool,
    fail_edits: bool,
}

/// Gateway that keeps messages in memory and records every call.
///
/// Used by the test suite and handy for dry runs without a bot token.
#[derive(Default)]
pub struct InMemoryGateway {
    inner: Mutex<Inner>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means another test thread panicked mid-call.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current content of a message, `None` once deleted.
    pub fn message(&self, key: HostKey) -> Option<MessageContent> {
        self.lock().messages.get(&key).cloned()
    }

    /// Latest message sent to a chat that still exists.
    pub fn last_message_in(&self, chat_id: ChatId) -> Option<(HostKey, MessageContent)> {
        self.lock()
            .messages
            .iter()
            .filter(|(key, _)| key.chat_id == chat_id)
            .max_by_key(|(key, _)| key.message_id.0)
            .map(|(key, content)| (*key, content.clone()))
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn edit_count(&self, key: HostKey) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, GatewayCall::Edit(k, _) if *k == key))
            .count()
    }

    pub fn is_pinned(&self, key: HostKey) -> bool {
        self.lock().pinned.contains(&key)
    }

    /// Simulates a user deleting a message behind the bot's back.
    pub fn forget(&self, key: HostKey) {
        self.lock().messages.remove(&key);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    pub fn fail_edits(&self, fail: bool) {
        self.lock().fail_edits = fail;
    }
}

#[async_trait]
impl MessagingGateway for InMemoryGateway {
    async fn send_message(
        &self,
        chat_id: ChatId,
        content: &MessageContent,
    ) -> Result<MessageId, GatewayError> {
        let mut inner = self.lock();
        if inner.fail_sends {
            return Err(GatewayError::Rejected("send refused".to_string()));
        }
        inner.next_id += 1;
        let key = HostKey::new(chat_id, MessageId(inner.next_id));
        inner.messages.insert(key, content.clone());
        inner.calls.push(GatewayCall::Send(key, content.clone()));
        Ok(key.message_id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        content: &MessageContent,
    ) -> Result<Delivery, GatewayError> {
        let mut inner = self.lock();
        if inner.fail_edits {
            return Err(GatewayError::Rejected("edit refused".to_string()));
        }
        let key = HostKey::new(chat_id, message_id);
        inner.calls.push(GatewayCall::Edit(key, content.clone()));
        match inner.messages.get_mut(&key) {
            Some(existing) => {
                *existing = content.clone();
                Ok(Delivery::Done)
            }
            None => Ok(Delivery::NotFound),
        }
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Delivery, GatewayError> {
        let mut inner = self.lock();
        let key = HostKey::new(chat_id, message_id);
        inner.calls.push(GatewayCall::Delete(key));
        inner.pinned.retain(|pinned| *pinned != key);
        match inner.messages.remove(&key) {
            Some(_) => Ok(Delivery::Done),
            None => Ok(Delivery::NotFound),
        }
    }

    async fn pin_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Delivery, GatewayError> {
        let mut inner = self.lock();
        let key = HostKey::new(chat_id, message_id);
        inner.calls.push(GatewayCall::Pin(key));
        if !inner.messages.contains_key(&key) {
            return Ok(Delivery::NotFound);
        }
        inner.pinned.push(key);
        Ok(Delivery::Done)
    }
}
