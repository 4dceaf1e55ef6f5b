//! Weekly schedule deciding a board's default content.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::BoardError;
use crate::utils::datetime::{format_date_fi, format_duration_fi, weekday_name_fi};

/// Produces the default body of a board for a moment in local time.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn content(&self, now: DateTime<Tz>) -> Result<String, BoardError>;
}

/// From `start` (local time) on its weekday, `provider` decides the default content.
#[derive(Clone)]
pub struct ScheduleRule {
    pub start: NaiveTime,
    pub provider: Arc<dyn ContentProvider>,
}

/// Per-weekday lists of rules in one timezone.
///
/// A rule's window runs from its start to the next later start of the same day.
/// Before the first rule of a day, the last rule of the closest earlier day with
/// any rules still applies, which wraps across midnight and the week boundary.
#[derive(Clone)]
pub struct BoardSchedule {
    timezone: Tz,
    days: [Vec<ScheduleRule>; 7],
}

impl BoardSchedule {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            days: Default::default(),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn with_rule(
        mut self,
        weekday: Weekday,
        start: NaiveTime,
        provider: impl ContentProvider + 'static,
    ) -> Self {
        self.push_rule(weekday, start, Arc::new(provider));
        self
    }

    pub fn every_day(mut self, start: NaiveTime, provider: impl ContentProvider + 'static) -> Self {
        let provider: Arc<dyn ContentProvider> = Arc::new(provider);
        for weekday in WEEK {
            self.push_rule(weekday, start, provider.clone());
        }
        self
    }

    fn push_rule(&mut self, weekday: Weekday, start: NaiveTime, provider: Arc<dyn ContentProvider>) {
        self.days[weekday.num_days_from_monday() as usize].push(ScheduleRule { start, provider });
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    /// The rule whose window contains `now`. Rules sharing a start time resolve
    /// to the one declared first.
    pub fn rule_for(&self, now: DateTime<Utc>) -> Option<&ScheduleRule> {
        let local = now.with_timezone(&self.timezone);
        let weekday = local.weekday();
        let time = local.time();

        let today = &self.days[weekday.num_days_from_monday() as usize];
        if let Some(rule) = latest_rule(today.iter().filter(|rule| rule.start <= time)) {
            return Some(rule);
        }

        let mut day = weekday;
        for _ in 0..7 {
            day = day.pred();
            if let Some(rule) = latest_rule(self.days[day.num_days_from_monday() as usize].iter()) {
                return Some(rule);
            }
        }
        None
    }

    /// Default content for `now`, or `None` when the schedule has no rules at all.
    pub async fn content_for(&self, now: DateTime<Utc>) -> Result<Option<String>, BoardError> {
        match self.rule_for(now) {
            Some(rule) => {
                let local = now.with_timezone(&self.timezone);
                rule.provider.content(local).await.map(Some)
            }
            None => Ok(None),
        }
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn latest_rule<'a>(rules: impl Iterator<Item = &'a ScheduleRule>) -> Option<&'a ScheduleRule> {
    let mut best: Option<&ScheduleRule> = None;
    for rule in rules {
        // strict comparison keeps the first declared of equal starts
        if best.map_or(true, |b| rule.start > b.start) {
            best = Some(rule);
        }
    }
    best
}

/// Always the same text.
pub struct StaticText(pub String);

impl StaticText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

#[async_trait]
impl ContentProvider for StaticText {
    async fn content(&self, _now: DateTime<Tz>) -> Result<String, BoardError> {
        Ok(self.0.clone())
    }
}

/// "Tänään on lauantai 17.10.2026, viikko 42."
pub struct DayAnnouncement;

#[async_trait]
impl ContentProvider for DayAnnouncement {
    async fn content(&self, now: DateTime<Tz>) -> Result<String, BoardError> {
        let date = now.date_naive();
        Ok(format!(
            "📅 Tänään on {} {}, viikko {}.",
            weekday_name_fi(date.weekday()),
            format_date_fi(date),
            date.iso_week().week()
        ))
    }
}

/// Counts down to Friday afternoon.
pub struct WeekendCountdown {
    pub starts_at: NaiveTime,
}

impl Default for WeekendCountdown {
    fn default() -> Self {
        Self {
            starts_at: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

#[async_trait]
impl ContentProvider for WeekendCountdown {
    async fn content(&self, now: DateTime<Tz>) -> Result<String, BoardError> {
        let date = now.date_naive();
        let weekday = date.weekday();
        let in_weekend = matches!(weekday, Weekday::Sat | Weekday::Sun)
            || (weekday == Weekday::Fri && now.time() >= self.starts_at);
        if in_weekend {
            return Ok("🎉 Viikonloppu on alkanut!".to_string());
        }

        let days_left = i64::from(Weekday::Fri.num_days_from_monday())
            - i64::from(weekday.num_days_from_monday());
        let friday = date + Duration::days(days_left);
        let target = now
            .timezone()
            .from_local_datetime(&friday.and_time(self.starts_at))
            .earliest()
            .ok_or_else(|| BoardError::Content(format!("no local time {} on {}", self.starts_at, friday)))?;

        Ok(format!(
            "⏳ Viikonloppuun on {}.",
            format_duration_fi(target.signed_duration_since(now))
        ))
    }
}

/// Announcement of the day in the morning, weekend countdown from noon on weekdays.
pub fn default_schedule(timezone: Tz) -> BoardSchedule {
    let midnight = NaiveTime::MIN;
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(midnight);

    let mut schedule = BoardSchedule::new(timezone).every_day(midnight, DayAnnouncement);
    let countdown: Arc<dyn ContentProvider> = Arc::new(WeekendCountdown::default());
    for weekday in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
        schedule.push_rule(weekday, noon, countdown.clone());
    }
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Helsinki;

    struct Failing;

    #[async_trait]
    impl ContentProvider for Failing {
        async fn content(&self, _now: DateTime<Tz>) -> Result<String, BoardError> {
            Err(BoardError::Content("upstream down".to_string()))
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Helsinki
            .with_ymd_and_hms(2026, 10, day, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_window_on_same_day() {
        // 2026-10-13 is a Tuesday
        let schedule = BoardSchedule::new(Helsinki)
            .with_rule(Weekday::Tue, time(8, 0), StaticText::new("aamu"))
            .with_rule(Weekday::Tue, time(12, 0), StaticText::new("iltapäivä"))
            .with_rule(Weekday::Tue, time(18, 0), StaticText::new("ilta"));

        assert_eq!(schedule.content_for(at(13, 8, 0)).await.unwrap().unwrap(), "aamu");
        assert_eq!(schedule.content_for(at(13, 11, 59)).await.unwrap().unwrap(), "aamu");
        assert_eq!(schedule.content_for(at(13, 12, 30)).await.unwrap().unwrap(), "iltapäivä");
        assert_eq!(schedule.content_for(at(13, 23, 0)).await.unwrap().unwrap(), "ilta");
    }

    #[tokio::test]
    async fn test_falls_back_to_previous_day() {
        let schedule = BoardSchedule::new(Helsinki)
            .with_rule(Weekday::Mon, time(18, 0), StaticText::new("maanantai-ilta"))
            .with_rule(Weekday::Tue, time(8, 0), StaticText::new("tiistaiaamu"));

        assert_eq!(
            schedule.content_for(at(13, 7, 0)).await.unwrap().unwrap(),
            "maanantai-ilta"
        );
        // Wednesday has no rules of its own
        assert_eq!(
            schedule.content_for(at(14, 12, 0)).await.unwrap().unwrap(),
            "tiistaiaamu"
        );
    }

    #[tokio::test]
    async fn test_wraps_across_week_boundary() {
        let schedule = BoardSchedule::new(Helsinki)
            .with_rule(Weekday::Sun, time(20, 0), StaticText::new("sunnuntai"))
            .with_rule(Weekday::Mon, time(9, 0), StaticText::new("maanantai"));

        assert_eq!(schedule.content_for(at(12, 6, 0)).await.unwrap().unwrap(), "sunnuntai");
    }

    #[tokio::test]
    async fn test_overlapping_rules_prefer_first_declared() {
        let schedule = BoardSchedule::new(Helsinki)
            .with_rule(Weekday::Tue, time(8, 0), StaticText::new("ensimmäinen"))
            .with_rule(Weekday::Tue, time(8, 0), StaticText::new("toinen"));

        assert_eq!(
            schedule.content_for(at(13, 9, 0)).await.unwrap().unwrap(),
            "ensimmäinen"
        );
    }

    #[tokio::test]
    async fn test_empty_schedule_has_no_content() {
        let schedule = BoardSchedule::new(Helsinki);
        assert!(schedule.is_empty());
        assert!(schedule.content_for(at(13, 9, 0)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported() {
        let schedule = BoardSchedule::new(Helsinki).every_day(time(0, 0), Failing);
        assert!(matches!(
            schedule.content_for(at(13, 9, 0)).await,
            Err(BoardError::Content(_))
        ));
    }

    #[tokio::test]
    async fn test_day_announcement() {
        let now = Helsinki.with_ymd_and_hms(2026, 10, 17, 10, 0, 0).unwrap();
        assert_eq!(
            DayAnnouncement.content(now).await.unwrap(),
            "📅 Tänään on lauantai 17.10.2026, viikko 42."
        );
    }

    #[tokio::test]
    async fn test_weekend_countdown() {
        let countdown = WeekendCountdown::default();

        let thursday = Helsinki.with_ymd_and_hms(2026, 10, 15, 13, 30, 0).unwrap();
        assert_eq!(
            countdown.content(thursday).await.unwrap(),
            "⏳ Viikonloppuun on 1 pv 2 h 30 min."
        );

        let friday_evening = Helsinki.with_ymd_and_hms(2026, 10, 16, 17, 0, 0).unwrap();
        assert_eq!(
            countdown.content(friday_evening).await.unwrap(),
            "🎉 Viikonloppu on alkanut!"
        );
    }

    #[tokio::test]
    async fn test_default_schedule_switches_to_countdown_at_noon() {
        let schedule = default_schedule(Helsinki);
        let morning = schedule.content_for(at(13, 9, 0)).await.unwrap().unwrap();
        assert!(morning.starts_with("📅 Tänään on tiistai"));

        let afternoon = schedule.content_for(at(13, 13, 0)).await.unwrap().unwrap();
        assert!(afternoon.starts_with("⏳ Viikonloppuun"));

        let saturday = schedule.content_for(at(17, 13, 0)).await.unwrap().unwrap();
        assert!(saturday.starts_with("📅 Tänään on lauantai"));
    }
}
