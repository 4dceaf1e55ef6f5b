use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| anyhow!("Unknown timezone: {}", name))
}

pub fn local_now(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

pub fn today_in(tz: Tz) -> NaiveDate {
    local_now(tz).date_naive()
}

pub fn weekday_name_fi(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "maanantai",
        Weekday::Tue => "tiistai",
        Weekday::Wed => "keskiviikko",
        Weekday::Thu => "torstai",
        Weekday::Fri => "perjantai",
        Weekday::Sat => "lauantai",
        Weekday::Sun => "sunnuntai",
    }
}

/// `17.10.2026`
pub fn format_date_fi(date: NaiveDate) -> String {
    format!("{}.{}.{}", date.day(), date.month(), date.year())
}

/// Compact Finnish duration such as `2 pv 3 h 15 min`. Negative durations render as zero.
pub fn format_duration_fi(duration: Duration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days} pv"));
    }
    if hours > 0 {
        parts.push(format!("{hours} h"));
    }
    if minutes > 0 || parts.is_empty() {
        parts.push(format!("{minutes} min"));
    }
    parts.join(" ")
}
