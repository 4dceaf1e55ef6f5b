use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use teloxide::types::{ChatId, MessageId, UserId};
use uuid::Uuid;

use super::command::CommandActivity;
use super::context::{ActivityEnv, TriggerContext};
use super::state::{ActivityState, Response};
use crate::error::ActivityError;
use crate::gateway::{HostKey, MessageContent};
use crate::utils::logging::{
    log_activity_done, log_activity_error, log_activity_expired, log_activity_start,
};

/// Shown on a message whose buttons no longer lead anywhere.
pub const EXPIRED_NOTICE: &str = "⌛ Toiminto on vanhentunut. Aloita uudelleen.";

/// Shown on the host message of an activity that failed unexpectedly.
pub const FAILURE_NOTICE: &str = "❌ Jotain meni pieleen, ja toiminto keskeytettiin.";

/// Inbound interaction aimed at some message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    ButtonPressed {
        chat_id: ChatId,
        message_id: MessageId,
        token: String,
        user_id: UserId,
    },
    ReplyReceived {
        chat_id: ChatId,
        replied_to: MessageId,
        text: String,
        user_id: UserId,
    },
}

impl InboundEvent {
    /// The message this event should be routed to.
    pub fn target(&self) -> HostKey {
        match self {
            InboundEvent::ButtonPressed {
                chat_id, message_id, ..
            } => HostKey::new(*chat_id, *message_id),
            InboundEvent::ReplyReceived {
                chat_id, replied_to, ..
            } => HostKey::new(*chat_id, *replied_to),
        }
    }

    fn into_response(self) -> Response {
        match self {
            InboundEvent::ButtonPressed { token, user_id, .. } => Response::Button { token, user_id },
            InboundEvent::ReplyReceived { text, user_id, .. } => Response::Reply { text, user_id },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A live activity processed the event.
    Handled,
    /// Button press on an untracked message; its keyboard was cleared.
    Expired,
    /// No activity owns the target message. Callers may try other dispatch paths.
    Unmatched,
    /// The activity's host message was gone, so the activity was dropped.
    Dropped,
}

impl RouteOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, RouteOutcome::Handled | RouteOutcome::Dropped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The activity is live and indexed under its host message.
    Registered(HostKey),
    /// The activity completed during its first render and was never indexed.
    Finished,
    /// The initial state created no host message; nothing was registered.
    NoHostMessage,
}

/// Counters for the health endpoint. Activities that end on their first render
/// count as both started and finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub live: usize,
    pub started: u64,
    pub finished: u64,
    pub expired_interactions: u64,
}

type ActivityHandle = Arc<tokio::sync::Mutex<CommandActivity>>;

struct Entry {
    id: Uuid,
    activity: ActivityHandle,
}

struct RegistryInner {
    env: ActivityEnv,
    activities: Mutex<HashMap<HostKey, Entry>>,
    started: AtomicU64,
    finished: AtomicU64,
    expired: AtomicU64,
}

/// Index of live activities keyed by host message.
///
/// The map lock is held only for lookups and updates, never across an await.
/// Each activity sits behind its own async mutex, so events for one activity
/// are handled one at a time while unrelated activities proceed in parallel.
#[derive(Clone)]
pub struct ActivityRegistry {
    inner: Arc<RegistryInner>,
}

impl ActivityRegistry {
    pub fn new(env: ActivityEnv) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                env,
                activities: Mutex::new(HashMap::new()),
                started: AtomicU64::new(0),
                finished: AtomicU64::new(0),
                expired: AtomicU64::new(0),
            }),
        }
    }

    pub fn env(&self) -> &ActivityEnv {
        &self.inner.env
    }

    fn activities(&self) -> MutexGuard<'_, HashMap<HostKey, Entry>> {
        self.inner
            .activities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, key: &HostKey) -> Option<(Uuid, ActivityHandle)> {
        self.activities()
            .get(key)
            .map(|entry| (entry.id, entry.activity.clone()))
    }

    pub fn contains(&self, key: HostKey) -> bool {
        self.activities().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.activities().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            live: self.len(),
            started: self.inner.started.load(Ordering::Relaxed),
            finished: self.inner.finished.load(Ordering::Relaxed),
            expired_interactions: self.inner.expired.load(Ordering::Relaxed),
        }
    }

    /// Runs `initial` inside a fresh activity and indexes it if it produced a host message.
    pub async fn start_activity(
        &self,
        trigger: TriggerContext,
        initial: Box<dyn ActivityState>,
    ) -> Result<StartOutcome, ActivityError> {
        let state_name = initial.name();
        let mut activity = CommandActivity::new(trigger, self.inner.env.clone());

        if let Err(e) = activity.start(initial).await {
            activity.fail(FAILURE_NOTICE).await;
            return Err(e);
        }

        let Some(key) = activity.host_key() else {
            let warning = format!(
                "Activity {} in chat {} produced no host message and was discarded",
                state_name,
                activity.trigger().chat_id.0
            );
            tracing::warn!("{}", warning);
            if let Err(e) = self.inner.env.notify_operators(&format!("⚠️ {warning}")).await {
                tracing::warn!("Could not notify operators: {}", e);
            }
            self.count_short_lived();
            return Ok(StartOutcome::NoHostMessage);
        };

        if !activity.is_live() {
            log_activity_done(key.chat_id.0, key.message_id.0, "finished on first render");
            self.count_short_lived();
            return Ok(StartOutcome::Finished);
        }

        let key = self.register(activity).await?;
        log_activity_start(state_name, key.chat_id.0, key.message_id.0);
        Ok(StartOutcome::Registered(key))
    }

    /// An activity that ended before it could be registered.
    fn count_short_lived(&self) {
        self.inner.started.fetch_add(1, Ordering::Relaxed);
        self.inner.finished.fetch_add(1, Ordering::Relaxed);
    }

    /// Indexes a live activity under its host message and arms its pending timers.
    /// Two live activities can never share a host message.
    pub async fn register(&self, activity: CommandActivity) -> Result<HostKey, ActivityError> {
        let key = match activity.host_key() {
            Some(key) if activity.is_live() => key,
            _ => {
                return Err(ActivityError::Unexpected(
                    "cannot register an activity without a live host message".to_string(),
                ))
            }
        };

        let id = activity.id();
        let handle = Arc::new(tokio::sync::Mutex::new(activity));
        {
            let mut activities = self.activities();
            if activities.contains_key(&key) {
                return Err(ActivityError::DuplicateHost {
                    chat_id: key.chat_id.0,
                    message_id: key.message_id.0,
                });
            }
            activities.insert(
                key,
                Entry {
                    id,
                    activity: handle.clone(),
                },
            );
        }
        self.inner.started.fetch_add(1, Ordering::Relaxed);

        let mut activity = handle.lock().await;
        self.arm_timers(key, &mut activity);
        Ok(key)
    }

    /// Removes the activity `id` from `key`. Removing something absent is a no-op.
    /// Returns whether this call removed it.
    pub fn unregister(&self, key: HostKey, id: Uuid) -> bool {
        let removed = {
            let mut activities = self.activities();
            match activities.get(&key) {
                Some(entry) if entry.id == id => activities.remove(&key).is_some(),
                _ => false,
            }
        };
        if removed {
            self.inner.finished.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Delivers a button press or reply to the activity owning the target message.
    ///
    /// A button press on an untracked message is treated as expired: the message
    /// is edited to a short notice without buttons. A reply to an untracked
    /// message is left alone. Neither touches any activity.
    pub async fn route(&self, event: InboundEvent) -> Result<RouteOutcome, ActivityError> {
        let key = event.target();

        let Some((id, handle)) = self.lookup(&key) else {
            return match event {
                InboundEvent::ButtonPressed { .. } => {
                    self.expire_stale(key).await;
                    Ok(RouteOutcome::Expired)
                }
                InboundEvent::ReplyReceived { .. } => Ok(RouteOutcome::Unmatched),
            };
        };

        let mut activity = handle.lock().await;
        // Lost a race with a teardown that happened while we waited for the lock.
        if activity.id() != id || !activity.is_live() {
            return Ok(RouteOutcome::Unmatched);
        }

        let result = activity.delegate_response(event.into_response()).await;
        self.settle(key, &mut activity, result).await
    }

    /// Ends every activity that has seen no input for `max_idle`.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let entries: Vec<(HostKey, Uuid, ActivityHandle)> = self
            .activities()
            .iter()
            .map(|(key, entry)| (*key, entry.id, entry.activity.clone()))
            .collect();

        let mut evicted = 0;
        for (key, id, handle) in entries {
            let mut activity = handle.lock().await;
            if activity.is_live() && activity.idle_for() < max_idle {
                continue;
            }
            activity.done().await;
            if self.unregister(key, id) {
                log_activity_done(key.chat_id.0, key.message_id.0, "idle");
                evicted += 1;
            }
        }
        evicted
    }

    async fn expire_stale(&self, key: HostKey) {
        self.inner.expired.fetch_add(1, Ordering::Relaxed);
        log_activity_expired(key.chat_id.0, key.message_id.0);
        let notice = MessageContent::text(EXPIRED_NOTICE);
        if let Err(e) = self
            .inner
            .env
            .gateway
            .edit_message(key.chat_id, key.message_id, &notice)
            .await
        {
            tracing::warn!(
                "Could not mark message {} in chat {} as expired: {}",
                key.message_id.0,
                key.chat_id.0,
                e
            );
        }
    }

    /// Bookkeeping after an activity processed an event or timer.
    async fn settle(
        &self,
        key: HostKey,
        activity: &mut CommandActivity,
        result: Result<(), ActivityError>,
    ) -> Result<RouteOutcome, ActivityError> {
        match result {
            Ok(()) if activity.is_live() => {
                self.arm_timers(key, activity);
                Ok(RouteOutcome::Handled)
            }
            Ok(()) => {
                if self.unregister(key, activity.id()) {
                    log_activity_done(key.chat_id.0, key.message_id.0, "done");
                }
                Ok(RouteOutcome::Handled)
            }
            Err(e) if e.is_transport_not_found() => {
                tracing::warn!("Dropping activity {}: {}", activity.id(), e);
                activity.abandon();
                if self.unregister(key, activity.id()) {
                    log_activity_done(key.chat_id.0, key.message_id.0, "host message gone");
                }
                Ok(RouteOutcome::Dropped)
            }
            Err(e) => {
                log_activity_error(key.chat_id.0, key.message_id.0, &e.to_string());
                activity.fail(FAILURE_NOTICE).await;
                if self.unregister(key, activity.id()) {
                    log_activity_done(key.chat_id.0, key.message_id.0, "failed");
                }
                Err(e)
            }
        }
    }

    fn arm_timers(&self, key: HostKey, activity: &mut CommandActivity) {
        let id = activity.id();
        for request in activity.take_timer_requests() {
            let registry = self.clone();
            let task_request = request.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(task_request.delay).await;
                registry
                    .fire_timer(key, id, &task_request.name, task_request.generation)
                    .await;
            });
            activity.attach_timer(&request, handle);
        }
    }

    async fn fire_timer(&self, key: HostKey, id: Uuid, name: &str, generation: u64) {
        let Some((entry_id, handle)) = self.lookup(&key) else {
            tracing::debug!("Timer {} fired for an activity that is already gone", name);
            return;
        };
        if entry_id != id {
            return;
        }

        let mut activity = handle.lock().await;
        if !activity.is_live() || !activity.claim_timer(name, generation) {
            tracing::debug!("Timer {} of activity {} lost a race, ignoring", name, id);
            return;
        }

        let result = activity
            .delegate_response(Response::Timer {
                name: name.to_string(),
            })
            .await;
        if let Err(e) = self.settle(key, &mut activity, result).await {
            tracing::error!("Timer {} of activity {} failed: {}", name, id, e);
        }
    }
}
