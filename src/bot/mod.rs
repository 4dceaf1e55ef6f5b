//! Telegram glue: commands, update handlers and the concrete activity states.

pub mod commands;
pub mod handlers;
pub mod states;

pub use handlers::{BotHandler, BotServices};
