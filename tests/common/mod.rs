#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use activity_board_bot::activity::{
    ActivityEnv, ActivityRegistry, ActivityState, InboundEvent, RouteOutcome, StartOutcome,
    TriggerContext,
};
use activity_board_bot::database::DatabaseManager;
use activity_board_bot::gateway::{HostKey, InMemoryGateway, MessageContent};
use teloxide::types::{ChatId, InlineKeyboardButtonKind, UserId};
use tempfile::{tempdir, TempDir};

pub const CHAT: ChatId = ChatId(-100_123);
pub const OPERATORS: ChatId = ChatId(-100_999);
pub const USER: UserId = UserId(4242);

pub struct TestBot {
    pub gateway: Arc<InMemoryGateway>,
    pub registry: ActivityRegistry,
    pub db: DatabaseManager,
    _temp_dir: TempDir,
}

pub async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

pub async fn setup() -> Result<TestBot> {
    setup_with_operators(None).await
}

pub async fn setup_with_operators(operators: Option<ChatId>) -> Result<TestBot> {
    let (db, temp_dir) = setup_test_db().await?;
    let gateway = Arc::new(InMemoryGateway::new());
    let env = ActivityEnv::new(gateway.clone(), db.clone()).with_operator_chat(operators);

    Ok(TestBot {
        gateway,
        registry: ActivityRegistry::new(env),
        db,
        _temp_dir: temp_dir,
    })
}

impl TestBot {
    /// Starts `state` in [`CHAT`] and returns the key of its host message.
    pub async fn start(&self, state: impl ActivityState + 'static) -> Result<HostKey> {
        let trigger = TriggerContext::in_chat(CHAT).with_user(USER);
        match self.registry.start_activity(trigger, Box::new(state)).await? {
            StartOutcome::Registered(key) => Ok(key),
            other => anyhow::bail!("activity was not registered: {:?}", other),
        }
    }

    pub async fn press(&self, key: HostKey, token: &str) -> Result<RouteOutcome> {
        Ok(self
            .registry
            .route(InboundEvent::ButtonPressed {
                chat_id: key.chat_id,
                message_id: key.message_id,
                token: token.to_string(),
                user_id: USER,
            })
            .await?)
    }

    pub async fn reply(&self, key: HostKey, text: &str) -> Result<RouteOutcome> {
        Ok(self
            .registry
            .route(InboundEvent::ReplyReceived {
                chat_id: key.chat_id,
                replied_to: key.message_id,
                text: text.to_string(),
                user_id: USER,
            })
            .await?)
    }

    pub fn content(&self, key: HostKey) -> MessageContent {
        self.gateway.message(key).unwrap_or_default()
    }

    pub fn text(&self, key: HostKey) -> String {
        self.content(key).text
    }
}

/// Callback tokens of every button on the message, row by row.
pub fn tokens(content: &MessageContent) -> Vec<String> {
    content
        .markup
        .iter()
        .flat_map(|markup| markup.inline_keyboard.iter().flatten())
        .filter_map(|button| match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
            _ => None,
        })
        .collect()
}

/// Polls `condition` until it holds or `timeout` passes.
pub async fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
