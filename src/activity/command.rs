use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::context::{ActivityContext, ActivityEnv, HostMessage, TriggerContext};
use super::state::{ActivityState, Response, Transition};
use super::timer::{TimerRequest, Timers};
use crate::error::ActivityError;
use crate::gateway::{HostKey, MessageContent};

/// Deepest "back" history an activity keeps; older entries are forgotten.
pub const MAX_HISTORY_DEPTH: usize = 8;

/// Consecutive transitions one event may cause before the activity is considered stuck.
const MAX_TRANSITIONS_PER_EVENT: usize = 16;

/// One interactive conversation bound to a single host message.
pub struct CommandActivity {
    id: Uuid,
    trigger: TriggerContext,
    env: ActivityEnv,
    host: HostMessage,
    state: Option<Box<dyn ActivityState>>,
    history: Vec<Box<dyn ActivityState>>,
    timers: Timers,
    torn_down: bool,
    last_event: Instant,
}

impl CommandActivity {
    pub fn new(trigger: TriggerContext, env: ActivityEnv) -> Self {
        Self {
            id: Uuid::new_v4(),
            host: HostMessage::new(trigger.chat_id),
            trigger,
            env,
            state: None,
            history: Vec::new(),
            timers: Timers::default(),
            torn_down: false,
            last_event: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn trigger(&self) -> &TriggerContext {
        &self.trigger
    }

    pub fn host_key(&self) -> Option<HostKey> {
        self.host.key()
    }

    /// Content last written to the host message.
    pub fn rendered(&self) -> Option<&MessageContent> {
        self.host.rendered.as_ref()
    }

    /// Live means a host message exists and the activity has not been torn down.
    pub fn is_live(&self) -> bool {
        !self.torn_down && self.host.message_id.is_some()
    }

    pub fn current_state(&self) -> Option<&'static str> {
        self.state.as_ref().map(|state| state.name())
    }

    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    pub fn idle_for(&self) -> Duration {
        self.last_event.elapsed()
    }

    pub fn has_timer(&self, name: &str) -> bool {
        self.timers.is_armed(name)
    }

    /// Enters the first state. The activity is live afterwards only if a host message was created.
    pub async fn start(&mut self, initial: Box<dyn ActivityState>) -> Result<(), ActivityError> {
        self.last_event = Instant::now();
        self.change_state(initial).await
    }

    /// Replaces the current state and executes the new one. The host message
    /// identity never changes here: edits go to the same message.
    pub async fn change_state(&mut self, next: Box<dyn ActivityState>) -> Result<(), ActivityError> {
        self.apply(Transition::Replace(next)).await
    }

    /// Forwards a button press, reply or timer to the current state.
    pub async fn delegate_response(&mut self, response: Response) -> Result<(), ActivityError> {
        if !self.is_live() {
            return Ok(());
        }
        let Some(mut state) = self.state.take() else {
            return Ok(());
        };
        self.last_event = Instant::now();

        let result = {
            let mut ctx = self.context();
            state.handle_response(&mut ctx, &response).await
        };
        self.state = Some(state);

        let transition = result?;
        self.apply(transition).await
    }

    /// Tears the activity down: timers are cancelled first, then the state
    /// history is dropped and the host message loses its buttons.
    pub async fn done(&mut self) {
        if self.torn_down {
            return;
        }
        self.abandon();

        let (Some(message_id), Some(rendered)) = (self.host.message_id, self.host.rendered.as_ref())
        else {
            return;
        };
        if !rendered.has_buttons() {
            return;
        }

        let stripped = rendered.without_buttons();
        match self
            .env
            .gateway
            .edit_message(self.host.chat_id, message_id, &stripped)
            .await
        {
            Ok(_) => self.host.rendered = Some(stripped),
            Err(e) => tracing::warn!(
                "Could not strip buttons from message {} in chat {}: {}",
                message_id.0,
                self.host.chat_id.0,
                e
            ),
        }
    }

    /// Tears down without touching the host message.
    pub(crate) fn abandon(&mut self) {
        self.torn_down = true;
        self.timers.cancel_all();
        self.state = None;
        self.history.clear();
    }

    /// Tears down and replaces the host message with `notice`, best effort.
    pub(crate) async fn fail(&mut self, notice: &str) {
        self.abandon();
        if let Some(message_id) = self.host.message_id {
            let content = MessageContent::text(notice);
            if let Err(e) = self
                .env
                .gateway
                .edit_message(self.host.chat_id, message_id, &content)
                .await
            {
                tracing::warn!(
                    "Could not show failure notice on message {} in chat {}: {}",
                    message_id.0,
                    self.host.chat_id.0,
                    e
                );
            } else {
                self.host.rendered = Some(content);
            }
        }
    }

    pub(crate) fn take_timer_requests(&mut self) -> Vec<TimerRequest> {
        self.timers.take_pending()
    }

    pub(crate) fn attach_timer(&mut self, request: &TimerRequest, handle: JoinHandle<()>) {
        self.timers.attach(request, handle);
    }

    pub(crate) fn claim_timer(&mut self, name: &str, generation: u64) -> bool {
        self.timers.claim(name, generation)
    }

    fn context(&mut self) -> ActivityContext<'_> {
        ActivityContext {
            env: &self.env,
            trigger: &self.trigger,
            host: &mut self.host,
            timers: &mut self.timers,
        }
    }

    fn push_history(&mut self, state: Box<dyn ActivityState>) {
        if self.history.len() >= MAX_HISTORY_DEPTH {
            self.history.remove(0);
        }
        self.history.push(state);
    }

    async fn apply(&mut self, mut transition: Transition) -> Result<(), ActivityError> {
        for _ in 0..MAX_TRANSITIONS_PER_EVENT {
            if self.torn_down {
                return Ok(());
            }

            let next = match transition {
                Transition::Stay => return Ok(()),
                Transition::Done => {
                    self.done().await;
                    return Ok(());
                }
                Transition::Replace(next) => next,
                Transition::Push(next) => {
                    if let Some(current) = self.state.take() {
                        self.push_history(current);
                    }
                    next
                }
                Transition::Back => match self.history.pop() {
                    Some(previous) => previous,
                    None => return Ok(()),
                },
                Transition::Root => match self.history.drain(..).next() {
                    Some(root) => root,
                    None => return Ok(()),
                },
            };

            transition = self.enter(next).await?;
        }

        Err(ActivityError::TransitionLoop {
            state: self.current_state().unwrap_or("none"),
        })
    }

    async fn enter(&mut self, mut state: Box<dyn ActivityState>) -> Result<Transition, ActivityError> {
        tracing::debug!(
            "Activity {} in chat {} entering {}",
            self.id,
            self.host.chat_id.0,
            state.name()
        );
        let result = {
            let mut ctx = self.context();
            state.execute(&mut ctx).await
        };
        self.state = Some(state);
        result
    }
}
