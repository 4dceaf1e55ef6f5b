use anyhow::{anyhow, Result};
use chrono::NaiveDate;

/// Date formats accepted from users, tried in order.
const DATE_FORMATS: [&str; 4] = ["%d.%m.%Y", "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

pub const SEASON_NAME_MAX_LEN: usize = 30;
pub const GRAPH_WIDTH_MIN: i64 = 10;
pub const GRAPH_WIDTH_MAX: i64 = 40;

/// Parses a date written as `pp.kk.vvvv`, `p.k.vvvv`, `vvvv-kk-pp`, `pp/kk/vvvv` or `pp-kk-vvvv`.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim().trim_end_matches('.');

    if input.is_empty() {
        return Err(anyhow!("Date cannot be empty"));
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
        .ok_or_else(|| anyhow!("Unsupported date format: '{}'", input))
}

pub fn validate_season_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(anyhow!("Season name cannot be empty"));
    }

    if name.chars().count() > SEASON_NAME_MAX_LEN {
        return Err(anyhow!(
            "Season name cannot be longer than {} characters",
            SEASON_NAME_MAX_LEN
        ));
    }

    if name.contains('\n') || name.contains('\r') {
        return Err(anyhow!("Season name cannot contain line breaks"));
    }

    Ok(name.to_string())
}

pub fn validate_graph_width(input: &str) -> Result<i64> {
    let width: i64 = input
        .trim()
        .parse()
        .map_err(|_| anyhow!("Graph width must be a whole number"))?;

    if !(GRAPH_WIDTH_MIN..=GRAPH_WIDTH_MAX).contains(&width) {
        return Err(anyhow!(
            "Graph width must be between {} and {}",
            GRAPH_WIDTH_MIN,
            GRAPH_WIDTH_MAX
        ));
    }

    Ok(width)
}

pub fn validate_telegram_chat_id(chat_id: i64) -> Result<()> {
    // Telegram chat IDs should be non-zero
    if chat_id == 0 {
        return Err(anyhow!("Chat ID cannot be zero"));
    }

    if chat_id > 2147483647 {
        return Err(anyhow!("Invalid user chat ID range"));
    }

    // Supergroup ids start around -1000000000000
    if chat_id < -2000000000000 {
        return Err(anyhow!("Chat ID out of valid range"));
    }

    Ok(())
}
