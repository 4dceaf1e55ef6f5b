use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::utils::datetime::parse_timezone;
use crate::utils::validation::validate_telegram_chat_id;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/bot.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    /// Chat that receives warnings and error reports.
    pub operator_chat_id: Option<i64>,
    pub board_timezone: Tz,
    pub board_tick_secs: u64,
    pub board_update_interval_secs: u64,
    pub error_share_timeout_secs: u64,
    pub activity_max_idle_hours: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = optional_var("DATABASE_URL")
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let http_port = parse_var("HTTP_PORT", 3000u16)?;

        let operator_chat_id = match optional_var("OPERATOR_CHAT_ID") {
            Some(raw) => {
                let chat_id: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("Invalid OPERATOR_CHAT_ID"))?;
                validate_telegram_chat_id(chat_id)
                    .map_err(|e| anyhow!("Invalid OPERATOR_CHAT_ID: {}", e))?;
                Some(chat_id)
            }
            None => None,
        };

        let board_timezone = match optional_var("BOARD_TIMEZONE") {
            Some(name) => parse_timezone(&name).map_err(|e| anyhow!("Invalid BOARD_TIMEZONE: {}", e))?,
            None => chrono_tz::Europe::Helsinki,
        };

        let board_tick_secs = parse_var("BOARD_TICK_SECS", 30u64)?;
        if board_tick_secs == 0 {
            return Err(anyhow!("Invalid BOARD_TICK_SECS: must be at least 1"));
        }

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            operator_chat_id,
            board_timezone,
            board_tick_secs,
            board_update_interval_secs: parse_var("BOARD_UPDATE_INTERVAL_SECS", 60u64)?,
            error_share_timeout_secs: parse_var("ERROR_SHARE_TIMEOUT_SECS", 3600u64)?,
            activity_max_idle_hours: parse_var("ACTIVITY_MAX_IDLE_HOURS", 24u64)?,
        })
    }

    pub fn board_tick(&self) -> Duration {
        Duration::from_secs(self.board_tick_secs)
    }

    pub fn board_update_interval(&self) -> Duration {
        Duration::from_secs(self.board_update_interval_secs)
    }

    pub fn error_share_timeout(&self) -> Duration {
        Duration::from_secs(self.error_share_timeout_secs)
    }

    pub fn activity_max_idle(&self) -> Duration {
        Duration::from_secs(self.activity_max_idle_hours * 60 * 60)
    }
}

/// A set, non-blank variable.
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match optional_var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| anyhow!("Invalid {}", name)),
        None => Ok(default),
    }
}
