use teloxide::prelude::*;

use super::failure::report_failure;
use super::{BotServices, HandlerResult};
use crate::activity::{InboundEvent, RouteOutcome};

pub async fn callback_handler(bot: Bot, q: CallbackQuery, services: BotServices) -> HandlerResult {
    let user_id = q.from.id;
    let username = q.from.username.as_deref().unwrap_or("unknown");

    let (Some(data), Some(message)) = (q.data.clone(), q.message.as_ref()) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat_id = message.chat.id;

    tracing::info!(
        "Callback received: '{}' from user {} ({}) in chat {}",
        data,
        username,
        user_id.0,
        chat_id.0
    );

    let event = InboundEvent::ButtonPressed {
        chat_id,
        message_id: message.id,
        token: data,
        user_id,
    };
    let answer = match services.registry.route(event).await {
        Ok(RouteOutcome::Expired) => Some("⌛ Toiminto on vanhentunut."),
        Ok(_) => None,
        Err(e) => {
            report_failure(&services, chat_id, "button press", &e).await;
            Some("❌ Jotain meni pieleen.")
        }
    };

    let request = bot.answer_callback_query(q.id.clone());
    match answer {
        Some(text) => request.text(text).await?,
        None => request.await?,
    };
    Ok(())
}
