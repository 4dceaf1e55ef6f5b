use teloxide::prelude::*;

use super::{BotServices, HandlerResult};
use crate::utils::feedback::CommandFeedback;

/// Hints for messages that look like commands but are not ones.
pub async fn handle_general_message(msg: Message, services: BotServices) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(command) = unknown_command(text, msg.chat.is_private()) else {
        return Ok(());
    };

    let feedback = CommandFeedback::new(services.registry.env().gateway.clone(), msg.chat.id);
    feedback
        .validation_error(
            &format!("Tuntematon komento: {command}"),
            "Kaikki komennot näet komennolla /help.",
        )
        .await?;
    Ok(())
}

/// The command word worth a hint, if any. In groups a bare `/word` may belong to
/// another bot, so only private chats get hints.
fn unknown_command(text: &str, private: bool) -> Option<&str> {
    if !private {
        return None;
    }
    text.split_whitespace()
        .next()
        .filter(|word| word.starts_with('/') && !word.contains('@'))
}
