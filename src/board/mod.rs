//! Message boards: one pinned message per chat that shows either the scheduled
//! default content or the most relevant transient event.

pub mod manager;
pub mod schedule;

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use teloxide::types::{ChatId, MessageId};

use crate::error::BoardError;
use crate::gateway::{Delivery, MessageContent, MessagingGateway};
use crate::utils::logging::log_board_error;

pub use manager::{BoardManager, BoardSnapshot};
pub use schedule::{default_schedule, BoardSchedule, ContentProvider, ScheduleRule};

/// Telegram's limit for a text message. Telegram counts UTF-16 code units, so
/// characters outside the BMP such as most emoji count twice.
pub const MAX_MESSAGE_LEN: usize = 4096;

const SECTION_SEPARATOR: &str = "\n\n";
const ELLIPSIS: char = '…';
const EMPTY_DEFAULT: &str = "Ei ajankohtaisia ilmoituksia.";

/// A transient override of the board's default content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardEvent {
    pub id: String,
    pub body: String,
    /// Link to media shown under the body.
    pub preview: Option<String>,
    pub priority: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

impl BoardEvent {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            preview: None,
            priority: 0,
            expires_at: None,
        }
    }

    pub fn with_preview(mut self, url: impl Into<String>) -> Self {
        self.preview = Some(url.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn rendered_body(&self) -> String {
        match &self.preview {
            Some(url) => format!("{}\n🔗 {}", self.body, url),
            None => self.body.clone(),
        }
    }
}

/// Fixed sections around the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardLayout {
    pub header: String,
    pub footer: String,
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self {
            header: "📌 Ilmoitustaulu".to_string(),
            footer: "Lisää ilmoitus: /ilmoitus <teksti>".to_string(),
        }
    }
}

/// Result of pushing the rendered board to the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    Sent(MessageId),
    Edited,
    Unchanged,
    /// The board message no longer exists.
    Gone,
}

impl Publish {
    fn describe(&self) -> &'static str {
        match self {
            Publish::Sent(_) => "sent",
            Publish::Edited => "edited",
            Publish::Unchanged => "unchanged",
            Publish::Gone => "message gone",
        }
    }
}

struct LiveEvent {
    event: BoardEvent,
    sequence: u64,
}

/// One chat's board. Boards without a schedule exist only for their events.
pub struct MessageBoard {
    chat_id: ChatId,
    message_id: Option<MessageId>,
    layout: BoardLayout,
    schedule: Option<BoardSchedule>,
    default_body: String,
    events: HashMap<String, LiveEvent>,
    sequence: u64,
    current: Option<String>,
    rendered: Option<String>,
    update_interval: Duration,
    last_tick: Option<DateTime<Utc>>,
}

impl MessageBoard {
    pub fn new(chat_id: ChatId, layout: BoardLayout, schedule: Option<BoardSchedule>) -> Self {
        Self {
            chat_id,
            message_id: None,
            layout,
            schedule,
            default_body: EMPTY_DEFAULT.to_string(),
            events: HashMap::new(),
            sequence: 0,
            current: None,
            rendered: None,
            update_interval: Duration::from_secs(60),
            last_tick: None,
        }
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    /// Id of the event holding the display slot; `None` means the default is shown.
    pub fn displayed(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn rendered(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    pub fn is_event_only(&self) -> bool {
        self.schedule.is_none()
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Live event ids, most relevant first.
    pub fn event_ids(&self) -> Vec<String> {
        let mut live: Vec<&LiveEvent> = self.events.values().collect();
        live.sort_by(|a, b| relevance(b).cmp(&relevance(a)));
        live.into_iter().map(|live| live.event.id.clone()).collect()
    }

    pub fn set_schedule(&mut self, schedule: BoardSchedule) {
        self.schedule = Some(schedule);
    }

    /// Inserts or replaces an event. Every call counts as the most recent update.
    /// Returns whether the event now holds the display slot.
    pub fn upsert_event(&mut self, event: BoardEvent) -> bool {
        self.sequence += 1;
        let id = event.id.clone();
        self.events.insert(
            id.clone(),
            LiveEvent {
                event,
                sequence: self.sequence,
            },
        );
        self.select_slot();
        self.current.as_deref() == Some(id.as_str())
    }

    pub fn take_event(&mut self, id: &str) -> Option<BoardEvent> {
        let removed = self.events.remove(id).map(|live| live.event);
        if removed.is_some() {
            self.select_slot();
        }
        removed
    }

    /// Drops expired events, returning how many were removed.
    pub fn drop_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.events.len();
        self.events.retain(|_, live| !live.event.is_expired(now));
        let removed = before - self.events.len();
        if removed > 0 {
            self.select_slot();
        }
        removed
    }

    /// Highest priority wins, then the most recent update.
    fn select_slot(&mut self) {
        self.current = self
            .events
            .values()
            .max_by_key(|live| relevance(live))
            .map(|live| live.event.id.clone());
    }

    /// Recomputes the default body from the schedule. A failing provider keeps the previous body.
    pub async fn refresh_default(&mut self, now: DateTime<Utc>) -> bool {
        let Some(schedule) = &self.schedule else {
            return false;
        };
        match schedule.content_for(now).await {
            Ok(Some(body)) if body != self.default_body => {
                self.default_body = body;
                true
            }
            Ok(_) => false,
            Err(e) => {
                log_board_error(self.chat_id.0, "default content", &e.to_string());
                false
            }
        }
    }

    /// Header, body, legend and footer, clipped to [`MAX_MESSAGE_LEN`].
    pub fn render(&self) -> String {
        let body = match self.current.as_ref().and_then(|id| self.events.get(id)) {
            Some(live) => live.event.rendered_body(),
            None => self.default_body.clone(),
        };

        let others = self.events.len().saturating_sub(1);
        let legend = match others {
            0 => None,
            1 => Some("➕ 1 muu ilmoitus".to_string()),
            n => Some(format!("➕ {n} muuta ilmoitusta")),
        };
        let mut tail: Vec<&str> = Vec::new();
        if let Some(legend) = legend.as_deref() {
            tail.push(legend);
        }
        if !self.layout.footer.is_empty() {
            tail.push(&self.layout.footer);
        }
        let tail = tail.join("\n");

        clip(&self.layout.header, &body, &tail, MAX_MESSAGE_LEN)
    }

    /// Sends the board on first use, edits it when the rendered text changed.
    pub async fn publish(&mut self, gateway: &dyn MessagingGateway) -> Result<Publish, BoardError> {
        let text = self.render();

        let Some(message_id) = self.message_id else {
            let message_id = gateway
                .send_message(self.chat_id, &MessageContent::text(text.clone()))
                .await?;
            self.message_id = Some(message_id);
            self.rendered = Some(text);
            return Ok(Publish::Sent(message_id));
        };

        if self.rendered.as_deref() == Some(text.as_str()) {
            return Ok(Publish::Unchanged);
        }

        match gateway
            .edit_message(self.chat_id, message_id, &MessageContent::text(text.clone()))
            .await?
        {
            Delivery::Done => {
                self.rendered = Some(text);
                Ok(Publish::Edited)
            }
            Delivery::NotFound => {
                self.message_id = None;
                self.rendered = None;
                Ok(Publish::Gone)
            }
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_tick {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .map_or(false, |elapsed| elapsed >= self.update_interval),
        }
    }

    pub fn mark_ticked(&mut self, now: DateTime<Utc>) {
        self.last_tick = Some(now);
    }

    /// Forgets the physical message, returning it so the caller can delete it.
    pub fn detach(&mut self) -> Option<MessageId> {
        self.rendered = None;
        self.message_id.take()
    }
}

fn relevance(live: &LiveEvent) -> (i32, u64) {
    (live.event.priority, live.sequence)
}

fn join_sections(sections: &[&str]) -> String {
    sections
        .iter()
        .filter(|section| !section.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Length of `text` as Telegram measures it.
pub fn message_len(text: &str) -> usize {
    text.encode_utf16().count()
}

fn truncate(text: &str, max: usize) -> String {
    if message_len(text) <= max {
        return text.to_string();
    }
    let ellipsis = ELLIPSIS.len_utf16();
    if max < ellipsis {
        return String::new();
    }
    let budget = max - ellipsis;
    let mut used = 0;
    let mut truncated = String::new();
    for c in text.chars() {
        used += c.len_utf16();
        if used > budget {
            break;
        }
        truncated.push(c);
    }
    truncated.push(ELLIPSIS);
    truncated
}

/// Drops the tail first, then truncates the body, then the header.
fn clip(header: &str, body: &str, tail: &str, max: usize) -> String {
    let full = join_sections(&[header, body, tail]);
    if message_len(&full) <= max {
        return full;
    }

    let without_tail = join_sections(&[header, body]);
    if message_len(&without_tail) <= max {
        return without_tail;
    }

    let header_cost = if header.is_empty() {
        0
    } else {
        message_len(header) + message_len(SECTION_SEPARATOR)
    };
    if header_cost < max {
        let body = truncate(body, max - header_cost);
        return join_sections(&[header, &body]);
    }

    truncate(header, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> MessageBoard {
        MessageBoard::new(ChatId(1), BoardLayout::default(), None)
    }

    #[test]
    fn test_latest_event_takes_slot() {
        let mut board = board();
        assert!(board.upsert_event(BoardEvent::new("a", "first")));
        assert!(board.upsert_event(BoardEvent::new("b", "second")));
        assert_eq!(board.displayed(), Some("b"));

        // updating an older event makes it the most recent
        assert!(board.upsert_event(BoardEvent::new("a", "first again")));
        assert_eq!(board.displayed(), Some("a"));
    }

    #[test]
    fn test_priority_beats_recency() {
        let mut board = board();
        board.upsert_event(BoardEvent::new("urgent", "!").with_priority(5));
        assert!(!board.upsert_event(BoardEvent::new("later", "later")));
        assert_eq!(board.displayed(), Some("urgent"));
        assert_eq!(board.event_ids(), vec!["urgent".to_string(), "later".to_string()]);
    }

    #[test]
    fn test_removing_displayed_event_falls_back() {
        let mut board = board();
        board.upsert_event(BoardEvent::new("a", "first"));
        board.upsert_event(BoardEvent::new("b", "second"));

        board.take_event("b");
        assert_eq!(board.displayed(), Some("a"));
        board.take_event("a");
        assert_eq!(board.displayed(), None);
        assert!(board.render().contains(EMPTY_DEFAULT));
        assert!(board.take_event("a").is_none());
    }

    #[test]
    fn test_expired_events_are_dropped() {
        let now = Utc::now();
        let mut board = board();
        board.upsert_event(BoardEvent::new("old", "old").expiring_at(now - chrono::Duration::minutes(1)));
        board.upsert_event(BoardEvent::new("fresh", "fresh").expiring_at(now + chrono::Duration::hours(1)));
        board.upsert_event(BoardEvent::new("forever", "forever").with_priority(-1));

        assert_eq!(board.drop_expired(now), 1);
        assert_eq!(board.displayed(), Some("fresh"));
    }

    #[test]
    fn test_render_sections_and_legend() {
        let mut board = board();
        board.upsert_event(BoardEvent::new("a", "Striimi alkoi").with_preview("https://example.org/a.jpg"));
        board.upsert_event(BoardEvent::new("b", "Uusi kausi").with_priority(1));

        let text = board.render();
        assert_eq!(
            text,
            "📌 Ilmoitustaulu\n\nUusi kausi\n\n➕ 1 muu ilmoitus\nLisää ilmoitus: /ilmoitus <teksti>"
        );

        board.take_event("b");
        assert!(board.render().contains("Striimi alkoi\n🔗 https://example.org/a.jpg"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut board = board();
        board.upsert_event(BoardEvent::new("a", "x"));
        assert_eq!(board.render(), board.render());
    }

    #[test]
    fn test_clip_drops_tail_first() {
        let clipped = clip("H", "body", "footer", 8);
        assert_eq!(clipped, "H\n\nbody");
    }

    #[test]
    fn test_clip_truncates_body_then_header() {
        let clipped = clip("H", "0123456789", "footer", 8);
        assert_eq!(clipped, "H\n\n0123…");
        assert_eq!(message_len(&clipped), 8);

        let clipped = clip("Header too long", "body", "", 5);
        assert_eq!(clipped, "Head…");
    }

    #[test]
    fn test_oversized_body_never_exceeds_limit() {
        let mut board = board();
        board.upsert_event(BoardEvent::new("big", "ä".repeat(MAX_MESSAGE_LEN * 2)));
        let text = board.render();
        assert_eq!(message_len(&text), MAX_MESSAGE_LEN);
        // the pinned header emoji takes two units
        assert_eq!(text.chars().count(), MAX_MESSAGE_LEN - 1);
        assert!(text.starts_with("📌 Ilmoitustaulu\n\n"));
        assert!(text.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_clip_counts_emoji_as_two_units() {
        let clipped = clip("📌", "🎲🎲🎲🎲", "", 8);
        assert_eq!(clipped, "📌\n\n🎲…");
        assert_eq!(message_len(&clipped), 7);

        // an emoji that would straddle the limit is left out whole
        let clipped = clip("", "ab🎲🎲", "", 4);
        assert_eq!(clipped, "ab…");
    }

    #[test]
    fn test_oversized_emoji_body_stays_within_limit() {
        let mut board = board();
        board.upsert_event(BoardEvent::new("dice", "🎲".repeat(MAX_MESSAGE_LEN)));
        let text = board.render();
        assert!(message_len(&text) <= MAX_MESSAGE_LEN);
        assert!(text.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_is_due_respects_interval() {
        let now = Utc::now();
        let mut board = board().with_update_interval(Duration::from_secs(60));
        assert!(board.is_due(now));
        board.mark_ticked(now);
        assert!(!board.is_due(now + chrono::Duration::seconds(30)));
        assert!(board.is_due(now + chrono::Duration::seconds(60)));
    }
}
