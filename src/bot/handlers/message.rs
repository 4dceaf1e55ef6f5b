use chrono::Utc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use super::failure::report_failure;
use super::{BotServices, HandlerResult};
use crate::activity::{ActivityState, InboundEvent, TriggerContext};
use crate::board::BoardEvent;
use crate::bot::commands::Command;
use crate::bot::states::{NewSeasonWizard, PaginatedList, SettingsMenu};
use crate::database::models::Season;
use crate::gateway::MessageContent;
use crate::utils::datetime::format_date_fi;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_command_start};

/// How long an `/ilmoitus` announcement stays on the board.
const ANNOUNCEMENT_HOURS: i64 = 1;

pub async fn command_handler(msg: Message, cmd: Command, services: BotServices) -> HandlerResult {
    let chat_id = msg.chat.id;
    let user = msg.from();
    let username = user.and_then(|u| u.username.as_deref()).unwrap_or("unknown");
    let user_id = user.map(|u| u.id.0 as i64).unwrap_or(0);
    log_command_start(cmd.name(), username, user_id, chat_id.0);

    let env = services.registry.env().clone();
    let feedback = CommandFeedback::new(env.gateway.clone(), chat_id);
    let trigger = TriggerContext::from_message(&msg);

    match cmd {
        Command::Help => {
            let help = MessageContent::text(Command::descriptions().to_string());
            env.gateway.send_message(chat_id, &help).await?;
        }
        Command::Start => {
            feedback
                .info(
                    "Tervetuloa!\n\nAloita uusi kausi komennolla /kausi, muuta asetuksia komennolla \
                     /asetukset tai luo chatille ilmoitustaulu komennolla /ilmoitustaulu.\n\
                     Kaikki komennot: /help",
                )
                .await?;
        }
        Command::Kausi => {
            start_activity(&services, trigger, Box::new(NewSeasonWizard::new())).await;
        }
        Command::Kaudet => match Season::find_by_chat(&env.db.pool, chat_id.0).await {
            Ok(seasons) if seasons.is_empty() => {
                feedback
                    .info("Chatilla ei ole vielä kausia. Aloita ensimmäinen komennolla /kausi.")
                    .await?;
            }
            Ok(seasons) => {
                let lines = seasons.iter().map(season_line).collect();
                let list = PaginatedList::new("🏆 Kaudet", lines);
                start_activity(&services, trigger, Box::new(list)).await;
            }
            Err(e) => {
                log_command_error("kaudet", chat_id.0, &e.to_string());
                feedback
                    .error("Kausien haku epäonnistui. Yritä myöhemmin uudelleen.")
                    .await?;
            }
        },
        Command::Asetukset => {
            start_activity(&services, trigger, Box::new(SettingsMenu::new())).await;
        }
        Command::Ilmoitustaulu(arg) => match arg.trim() {
            "" => {
                if let Err(e) = services.boards.ensure_board(chat_id).await {
                    log_command_error("ilmoitustaulu", chat_id.0, &e.to_string());
                    feedback.error("Ilmoitustaulun luominen epäonnistui.").await?;
                }
            }
            "pois" => match services.boards.remove_board(chat_id).await {
                Ok(true) => {
                    feedback.success("Ilmoitustaulu poistettu.").await?;
                }
                Ok(false) => {
                    feedback.info("Chatissa ei ole ilmoitustaulua.").await?;
                }
                Err(e) => {
                    log_command_error("ilmoitustaulu", chat_id.0, &e.to_string());
                    feedback.error("Ilmoitustaulun poistaminen epäonnistui.").await?;
                }
            },
            other => {
                feedback
                    .validation_error(
                        &format!("Tuntematon valinta: {other}"),
                        "Käytä /ilmoitustaulu tai /ilmoitustaulu pois.",
                    )
                    .await?;
            }
        },
        Command::Ilmoitus(text) => {
            let text = text.trim();
            if text.is_empty() {
                feedback
                    .validation_error(
                        "Ilmoituksen teksti puuttuu.",
                        "Esimerkki: /ilmoitus Peli-ilta perjantaina klo 18!",
                    )
                    .await?;
                return Ok(());
            }

            let event = BoardEvent::new(format!("ilmoitus-{}", msg.id.0), text)
                .expiring_at(Utc::now() + chrono::Duration::hours(ANNOUNCEMENT_HOURS));
            match services.boards.add_event(chat_id, event).await {
                Ok(_) => {
                    feedback
                        .success("Ilmoitus lisätty ilmoitustaululle tunniksi.")
                        .await?;
                }
                Err(e) => {
                    log_command_error("ilmoitus", chat_id.0, &e.to_string());
                    feedback.error("Ilmoituksen lisääminen epäonnistui.").await?;
                }
            }
        }
    }

    Ok(())
}

/// Routes a reply to the activity owning the replied-to message.
pub async fn reply_handler(msg: Message, services: BotServices) -> HandlerResult {
    let (Some(replied), Some(text), Some(user)) = (msg.reply_to_message(), msg.text(), msg.from())
    else {
        return Ok(());
    };

    let event = InboundEvent::ReplyReceived {
        chat_id: msg.chat.id,
        replied_to: replied.id,
        text: text.to_string(),
        user_id: user.id,
    };
    match services.registry.route(event).await {
        Ok(outcome) => tracing::debug!(
            "Reply to message {} in chat {}: {:?}",
            replied.id.0,
            msg.chat.id.0,
            outcome
        ),
        Err(e) => report_failure(&services, msg.chat.id, "reply", &e).await,
    }
    Ok(())
}

/// Starts an activity, handing unexpected failures to the error boundary.
pub async fn start_activity(
    services: &BotServices,
    trigger: TriggerContext,
    state: Box<dyn ActivityState>,
) {
    let chat_id = trigger.chat_id;
    let name = state.name();
    if let Err(e) = services.registry.start_activity(trigger, state).await {
        report_failure(services, chat_id, name, &e).await;
    }
}

fn season_line(season: &Season) -> String {
    let start = season
        .start()
        .map(format_date_fi)
        .unwrap_or_else(|| season.start_date.clone());
    let end = match (season.end_day(), &season.end_date) {
        (Some(end), _) => format_date_fi(end),
        (None, Some(raw)) => raw.clone(),
        (None, None) => "käynnissä".to_string(),
    };
    format!("• {}: {} – {}", season.name, start, end)
}
