use tracing::{debug, error, info, warn};

/// Logs command start with consistent format
pub fn log_command_start(command: &str, user: &str, user_id: i64, chat_id: i64) {
    info!("CMD_START: {} by {}({}) in chat {}", command, user, user_id, chat_id);
}

/// Logs command errors with consistent format
pub fn log_command_error(command: &str, chat_id: i64, error: &str) {
    error!("CMD_ERROR: {} in chat {} - {}", command, chat_id, error);
}

/// Logs an activity becoming live on its host message
pub fn log_activity_start(state: &str, chat_id: i64, message_id: i32) {
    info!(
        "ACTIVITY_START: {} on message {} in chat {}",
        state, message_id, chat_id
    );
}

/// Logs an activity leaving the registry
pub fn log_activity_done(chat_id: i64, message_id: i32, reason: &str) {
    info!(
        "ACTIVITY_DONE: message {} in chat {} - {}",
        message_id, chat_id, reason
    );
}

/// Logs a button press that arrived for an activity that is no longer tracked
pub fn log_activity_expired(chat_id: i64, message_id: i32) {
    debug!(
        "ACTIVITY_EXPIRED: button pressed on untracked message {} in chat {}",
        message_id, chat_id
    );
}

/// Logs an activity failure with consistent format
pub fn log_activity_error(chat_id: i64, message_id: i32, error: &str) {
    error!(
        "ACTIVITY_ERROR: message {} in chat {} - {}",
        message_id, chat_id, error
    );
}

/// Logs a board render; `slot` is the displayed event id or `default`
pub fn log_board_render(chat_id: i64, slot: &str, outcome: &str) {
    debug!("BOARD_RENDER: chat {} showing {} - {}", chat_id, slot, outcome);
}

/// Logs board failures with consistent format
pub fn log_board_error(chat_id: i64, operation: &str, error: &str) {
    warn!("BOARD_ERROR: {} for chat {} failed: {}", operation, chat_id, error);
}

/// Logs system events with consistent format
pub fn log_system_event(event: &str, details: Option<&str>) {
    match details {
        Some(d) => info!("SYSTEM: {} - {}", event, d),
        None => info!("SYSTEM: {}", event),
    }
}
