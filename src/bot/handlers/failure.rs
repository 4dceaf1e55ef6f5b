//! Process-wide error boundary for activities.

use teloxide::types::ChatId;

use super::BotServices;
use crate::activity::TriggerContext;
use crate::bot::states::ErrorShareConfirmation;
use crate::error::ActivityError;
use crate::utils::logging::log_command_error;

/// Logs an unexpected activity failure, tells the operators about it and asks
/// the affected chat whether the details may be shared.
///
/// The failed activity has already been torn down by the registry. Nothing here
/// can fail the caller.
pub async fn report_failure(
    services: &BotServices,
    chat_id: ChatId,
    context: &str,
    error: &ActivityError,
) {
    log_command_error(context, chat_id.0, &error.to_string());

    let env = services.registry.env();
    let notice = format!(
        "⚠️ Odottamaton virhe chatissa {} ({}). Käyttäjältä kysytään lupaa tietojen jakamiseen.",
        chat_id.0, context
    );
    if let Err(e) = env.notify_operators(&notice).await {
        tracing::warn!("Could not notify operators about a failure: {}", e);
    }

    let confirmation =
        ErrorShareConfirmation::new(format!("{context}: {error}"), services.error_share_timeout);
    if let Err(e) = services
        .registry
        .start_activity(TriggerContext::in_chat(chat_id), Box::new(confirmation))
        .await
    {
        tracing::error!("Could not offer error sharing in chat {}: {}", chat_id.0, e);
    }
}
