use std::fmt;

use async_trait::async_trait;
use teloxide::types::UserId;

use super::context::ActivityContext;
use crate::error::ActivityError;

/// Input delivered to the current state of an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// An inline button on the host message was pressed.
    Button { token: String, user_id: UserId },
    /// Someone replied to the host message.
    Reply { text: String, user_id: UserId },
    /// A timer the state scheduled has fired.
    Timer { name: String },
}

impl Response {
    pub fn token(&self) -> Option<&str> {
        match self {
            Response::Button { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Response::Reply { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn timer(&self) -> Option<&str> {
        match self {
            Response::Timer { name } => Some(name),
            _ => None,
        }
    }
}

/// What the hosting activity should do after a state has run.
pub enum Transition {
    /// Keep the current state; it has already re-rendered if it needed to.
    Stay,
    /// Enter a child state, remembering the current one for [`Transition::Back`].
    Push(Box<dyn ActivityState>),
    /// Enter a state without remembering the current one.
    Replace(Box<dyn ActivityState>),
    /// Return to the most recently pushed state. A no-op at the root.
    Back,
    /// Return to the first state on the history stack.
    Root,
    /// Tear the activity down.
    Done,
}

impl Transition {
    pub fn push(state: impl ActivityState + 'static) -> Self {
        Transition::Push(Box::new(state))
    }

    pub fn replace(state: impl ActivityState + 'static) -> Self {
        Transition::Replace(Box::new(state))
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Stay => write!(f, "Stay"),
            Transition::Push(state) => write!(f, "Push({})", state.name()),
            Transition::Replace(state) => write!(f, "Replace({})", state.name()),
            Transition::Back => write!(f, "Back"),
            Transition::Root => write!(f, "Root"),
            Transition::Done => write!(f, "Done"),
        }
    }
}

/// One screen of an interactive activity.
///
/// A state renders itself in [`execute`](ActivityState::execute) and reacts to
/// input in [`handle_response`](ActivityState::handle_response). Rendering must
/// depend only on the state's own fields so that executing twice yields the same
/// host message. States reach the outside world only through the
/// [`ActivityContext`] they are handed.
#[async_trait]
pub trait ActivityState: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError>;

    /// Unknown tokens must be ignored: keyboards from earlier renders can still be pressed.
    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        let _ = (ctx, response);
        Ok(Transition::Stay)
    }
}
