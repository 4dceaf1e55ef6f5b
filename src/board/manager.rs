use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use teloxide::types::{ChatId, MessageId};

use super::{BoardEvent, BoardLayout, BoardSchedule, MessageBoard, Publish};
use crate::error::BoardError;
use crate::gateway::{Delivery, MessagingGateway};
use crate::utils::logging::{log_board_error, log_board_render};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;
type BoardHandle = Arc<tokio::sync::Mutex<MessageBoard>>;

/// Point-in-time view of a board, for commands and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardSnapshot {
    pub message_id: Option<i32>,
    pub displayed: Option<String>,
    pub rendered: Option<String>,
    pub event_ids: Vec<String>,
    pub event_only: bool,
}

struct ManagerInner {
    gateway: Arc<dyn MessagingGateway>,
    schedule: BoardSchedule,
    layout: BoardLayout,
    update_interval: Duration,
    boards: Mutex<HashMap<ChatId, BoardHandle>>,
    clock: Clock,
}

/// Owns every chat's board. Each board has its own lock, so a slow edit in one
/// chat never holds up another.
#[derive(Clone)]
pub struct BoardManager {
    inner: Arc<ManagerInner>,
}

impl BoardManager {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        schedule: BoardSchedule,
        update_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                gateway,
                schedule,
                layout: BoardLayout::default(),
                update_interval,
                boards: Mutex::new(HashMap::new()),
                clock: Arc::new(Utc::now),
            }),
        }
    }

    /// Replaces the wall clock. Only meaningful before the manager is shared.
    pub fn with_clock(self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.rebuild(|inner| inner.clock = Arc::new(clock))
    }

    pub fn with_layout(self, layout: BoardLayout) -> Self {
        self.rebuild(|inner| inner.layout = layout)
    }

    fn rebuild(self, change: impl FnOnce(&mut ManagerInner)) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => ManagerInner {
                gateway: shared.gateway.clone(),
                schedule: shared.schedule.clone(),
                layout: shared.layout.clone(),
                update_interval: shared.update_interval,
                boards: Mutex::new(HashMap::new()),
                clock: shared.clock.clone(),
            },
        };
        change(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.inner.clock)()
    }

    fn boards(&self) -> MutexGuard<'_, HashMap<ChatId, BoardHandle>> {
        self.inner
            .boards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, chat_id: ChatId) -> Option<BoardHandle> {
        self.boards().get(&chat_id).cloned()
    }

    fn handle_or_create(&self, chat_id: ChatId, scheduled: bool) -> BoardHandle {
        self.boards()
            .entry(chat_id)
            .or_insert_with(|| {
                let schedule = scheduled.then(|| self.inner.schedule.clone());
                let board = MessageBoard::new(chat_id, self.inner.layout.clone(), schedule)
                    .with_update_interval(self.inner.update_interval);
                Arc::new(tokio::sync::Mutex::new(board))
            })
            .clone()
    }

    /// Whether `handle` is still the registered board of the chat. A board can be
    /// forgotten while someone waits for its lock.
    fn is_current(&self, chat_id: ChatId, handle: &BoardHandle) -> bool {
        self.boards()
            .get(&chat_id)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
    }

    fn forget(&self, chat_id: ChatId, handle: &BoardHandle) {
        let mut boards = self.boards();
        if boards
            .get(&chat_id)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
        {
            boards.remove(&chat_id);
        }
    }

    pub fn board_count(&self) -> usize {
        self.boards().len()
    }

    pub fn has_board(&self, chat_id: ChatId) -> bool {
        self.boards().contains_key(&chat_id)
    }

    /// Creates the chat's scheduled board and its pinned message if missing.
    /// An event-only board is upgraded to a scheduled one.
    pub async fn ensure_board(&self, chat_id: ChatId) -> Result<MessageId, BoardError> {
        loop {
            let handle = self.handle_or_create(chat_id, true);
            let mut board = handle.lock().await;
            if !self.is_current(chat_id, &handle) {
                continue;
            }

            let upgraded = board.is_event_only();
            if upgraded {
                board.set_schedule(self.inner.schedule.clone());
            }
            let now = self.now();
            board.drop_expired(now);
            board.refresh_default(now).await;

            let mut outcome = board.publish(self.inner.gateway.as_ref()).await?;
            if outcome == Publish::Gone {
                // the old message was deleted by someone; start over with a fresh one
                outcome = board.publish(self.inner.gateway.as_ref()).await?;
            }
            board.mark_ticked(now);
            log_render(&board, outcome);

            match (outcome, board.message_id()) {
                (Publish::Sent(message_id), _) => self.pin(chat_id, message_id).await,
                (_, Some(message_id)) if upgraded => self.pin(chat_id, message_id).await,
                _ => {}
            }
            return board.message_id().ok_or_else(|| {
                BoardError::Content(format!("board of chat {} has no message", chat_id.0))
            });
        }
    }

    /// Inserts or updates an event and re-renders at once. Chats without a board
    /// get an event-only board, and a board whose message was deleted gets a new
    /// one. Returns whether the event is now displayed.
    pub async fn add_event(&self, chat_id: ChatId, event: BoardEvent) -> Result<bool, BoardError> {
        loop {
            let handle = self.handle_or_create(chat_id, false);
            let mut board = handle.lock().await;
            if !self.is_current(chat_id, &handle) {
                continue;
            }

            board.drop_expired(self.now());
            let displayed = board.upsert_event(event);
            let mut outcome = board.publish(self.inner.gateway.as_ref()).await?;
            if outcome == Publish::Gone {
                tracing::warn!("Board message of chat {} is gone, sending a new one", chat_id.0);
                outcome = board.publish(self.inner.gateway.as_ref()).await?;
            }
            log_render(&board, outcome);
            if let Publish::Sent(message_id) = outcome {
                if !board.is_event_only() {
                    self.pin(chat_id, message_id).await;
                }
            }
            return Ok(displayed);
        }
    }

    /// Removes an event and re-renders at once. The last event of an event-only
    /// board takes the board with it. Returns whether the event existed.
    pub async fn remove_event(&self, chat_id: ChatId, event_id: &str) -> Result<bool, BoardError> {
        let Some(handle) = self.handle(chat_id) else {
            return Ok(false);
        };
        let mut board = handle.lock().await;
        if !self.is_current(chat_id, &handle) || board.take_event(event_id).is_none() {
            return Ok(false);
        }

        if board.is_event_only() && !board.has_events() {
            self.teardown(chat_id, &handle, &mut board).await?;
            return Ok(true);
        }

        let now = self.now();
        board.drop_expired(now);
        board.refresh_default(now).await;
        let outcome = board.publish(self.inner.gateway.as_ref()).await?;
        log_render(&board, outcome);
        if outcome == Publish::Gone {
            self.forget(chat_id, &handle);
        }
        Ok(true)
    }

    /// Periodic refresh of one board: expires events, recomputes the default and
    /// edits the message only if the rendered text changed.
    pub async fn tick(&self, chat_id: ChatId) -> Result<Option<Publish>, BoardError> {
        let Some(handle) = self.handle(chat_id) else {
            return Ok(None);
        };
        self.tick_board(chat_id, &handle, self.now()).await
    }

    /// Ticks every board whose update interval has elapsed. Failures are logged
    /// per board and never stop the others. Returns the number of boards ticked.
    pub async fn tick_due(&self, now: DateTime<Utc>) -> usize {
        let handles: Vec<(ChatId, BoardHandle)> = self
            .boards()
            .iter()
            .map(|(chat_id, handle)| (*chat_id, handle.clone()))
            .collect();

        let mut ticked = 0;
        for (chat_id, handle) in handles {
            let due = handle.lock().await.is_due(now);
            if !due {
                continue;
            }
            match self.tick_board(chat_id, &handle, now).await {
                Ok(Some(_)) => ticked += 1,
                Ok(None) => {}
                Err(e) => log_board_error(chat_id.0, "tick", &e.to_string()),
            }
        }
        ticked
    }

    async fn tick_board(
        &self,
        chat_id: ChatId,
        handle: &BoardHandle,
        now: DateTime<Utc>,
    ) -> Result<Option<Publish>, BoardError> {
        let mut board = handle.lock().await;
        if !self.is_current(chat_id, handle) {
            return Ok(None);
        }

        let expired = board.drop_expired(now);
        if expired > 0 {
            tracing::debug!("Expired {} events on the board of chat {}", expired, chat_id.0);
        }
        if board.is_event_only() && !board.has_events() {
            self.teardown(chat_id, handle, &mut board).await?;
            return Ok(None);
        }

        board.refresh_default(now).await;
        let outcome = board.publish(self.inner.gateway.as_ref()).await?;
        board.mark_ticked(now);
        log_render(&board, outcome);
        if outcome == Publish::Gone {
            tracing::warn!("Board message of chat {} is gone, dropping board", chat_id.0);
            self.forget(chat_id, handle);
        }
        Ok(Some(outcome))
    }

    /// Deletes the board message and forgets the board. Returns whether a board existed.
    pub async fn remove_board(&self, chat_id: ChatId) -> Result<bool, BoardError> {
        let Some(handle) = self.handle(chat_id) else {
            return Ok(false);
        };
        let mut board = handle.lock().await;
        if !self.is_current(chat_id, &handle) {
            return Ok(false);
        }
        self.teardown(chat_id, &handle, &mut board).await?;
        Ok(true)
    }

    async fn teardown(
        &self,
        chat_id: ChatId,
        handle: &BoardHandle,
        board: &mut MessageBoard,
    ) -> Result<(), BoardError> {
        self.forget(chat_id, handle);
        if let Some(message_id) = board.detach() {
            if self.inner.gateway.delete_message(chat_id, message_id).await? == Delivery::NotFound {
                tracing::debug!("Board message of chat {} was already deleted", chat_id.0);
            }
        }
        log_board_render(chat_id.0, "-", "removed");
        Ok(())
    }

    pub async fn snapshot(&self, chat_id: ChatId) -> Option<BoardSnapshot> {
        let handle = self.handle(chat_id)?;
        let board = handle.lock().await;
        Some(BoardSnapshot {
            message_id: board.message_id().map(|id| id.0),
            displayed: board.displayed().map(str::to_string),
            rendered: board.rendered().map(str::to_string),
            event_ids: board.event_ids(),
            event_only: board.is_event_only(),
        })
    }

    async fn pin(&self, chat_id: ChatId, message_id: MessageId) {
        if let Err(e) = self.inner.gateway.pin_message(chat_id, message_id).await {
            log_board_error(chat_id.0, "pin", &e.to_string());
        }
    }
}

fn log_render(board: &MessageBoard, outcome: Publish) {
    log_board_render(
        board.chat_id().0,
        board.displayed().unwrap_or("default"),
        outcome.describe(),
    );
}
