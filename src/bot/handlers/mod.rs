pub mod callback;
pub mod failure;
pub mod general_message;
pub mod message;

use std::time::Duration;

use teloxide::{dispatching::UpdateHandler, prelude::*};

use crate::activity::ActivityRegistry;
use crate::board::BoardManager;
use crate::bot::commands::Command;
use crate::config::Config;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

/// Long-lived services every handler needs.
#[derive(Clone)]
pub struct BotServices {
    pub registry: ActivityRegistry,
    pub boards: BoardManager,
    pub error_share_timeout: Duration,
}

impl BotServices {
    pub fn new(registry: ActivityRegistry, boards: BoardManager, config: &Config) -> Self {
        Self {
            registry,
            boards,
            error_share_timeout: config.error_share_timeout(),
        }
    }
}

pub struct BotHandler {
    pub services: BotServices,
}

impl BotHandler {
    pub fn new(services: BotServices) -> Self {
        Self { services }
    }

    pub fn schema(&self) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        let commands = self.services.clone();
        let replies = self.services.clone();
        let general = self.services.clone();
        let callbacks = self.services.clone();

        dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |msg: Message, cmd: Command| {
                        let services = commands.clone();
                        async move { message::command_handler(msg, cmd, services).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.reply_to_message().is_some())
                    .endpoint(move |msg: Message| {
                        let services = replies.clone();
                        async move { message::reply_handler(msg, services).await }
                    }),
            )
            .branch(Update::filter_message().endpoint(move |msg: Message| {
                let services = general.clone();
                async move { general_message::handle_general_message(msg, services).await }
            }))
            .branch(
                Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                    let services = callbacks.clone();
                    async move { callback::callback_handler(bot, q, services).await }
                }),
            )
    }
}
