//! Error types shared by the gateway, the activity machinery and the message boards.

use thiserror::Error;

/// Failure talking to the messaging transport.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The Telegram Bot API request failed.
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    /// The transport refused the operation for a reason other than a missing message.
    #[error("gateway rejected the request: {0}")]
    Rejected(String),
}

/// Failure inside an activity or while dispatching an event to it.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// Sending or editing the host message failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The host message was deleted from under the activity.
    #[error("host message {message_id} in chat {chat_id} no longer exists")]
    HostMessageGone { chat_id: i64, message_id: i32 },

    /// The persistence collaborator failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Another live activity already owns the host message.
    #[error("an activity is already registered for message {message_id} in chat {chat_id}")]
    DuplicateHost { chat_id: i64, message_id: i32 },

    /// States kept handing control to each other without settling.
    #[error("too many consecutive state transitions, last state was {state}")]
    TransitionLoop { state: &'static str },

    /// Anything a state could not recover from.
    #[error("{0}")]
    Unexpected(String),
}

impl ActivityError {
    /// True when the error only means the host message disappeared.
    pub fn is_transport_not_found(&self) -> bool {
        matches!(self, ActivityError::HostMessageGone { .. })
    }
}

/// Failure while rendering or publishing a message board.
#[derive(Debug, Error)]
pub enum BoardError {
    /// Sending, editing or deleting the board message failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A scheduled content provider could not produce content.
    #[error("content provider failed: {0}")]
    Content(String),
}
