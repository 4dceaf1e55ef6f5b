//! The `/kausi` wizard: end the running season, pick a start date and a name,
//! confirm, and write both changes at once.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use crate::activity::{ActivityContext, ActivityState, Response, Transition};
use crate::database::models::Season;
use crate::error::ActivityError;
use crate::gateway::{button, MessageContent};
use crate::utils::datetime::format_date_fi;
use crate::utils::validation::{parse_date, validate_season_name, SEASON_NAME_MAX_LEN};

const TITLE: &str = "🏆 Uusi kausi";

const TOKEN_TODAY: &str = "today";
const TOKEN_BACK: &str = "back";
const TOKEN_CANCEL: &str = "cancel";
const TOKEN_RETRY: &str = "retry";
const TOKEN_CONFIRM: &str = "confirm";
const TOKEN_NAME_PREFIX: &str = "name:";

/// Message shown when a reply could not be read as a date.
pub fn invalid_date_message(input: &str) -> String {
    format!(
        "⚠️ Antamasi päivämäärä '{}' ei ole tuettua muotoa. Käytä muotoa pp.kk.vvvv, vvvv-kk-pp tai pp/kk/vvvv.",
        input.trim()
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PreviousSeason {
    id: i64,
    name: String,
    start: Option<NaiveDate>,
}

/// What the wizard has collected so far. Every step owns its own copy, so
/// going back restores the earlier answers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SeasonDraft {
    previous: Option<PreviousSeason>,
    previous_end: Option<NaiveDate>,
    start: Option<NaiveDate>,
    name: Option<String>,
}

enum StepInput {
    Ignored,
    Back,
    Cancel,
    Date(NaiveDate),
    Invalid(String),
}

fn read_date_input(ctx: &ActivityContext<'_>, response: &Response) -> StepInput {
    if let Some(text) = response.reply_text() {
        return match parse_date(text) {
            Ok(date) => StepInput::Date(date),
            Err(_) => StepInput::Invalid(invalid_date_message(text)),
        };
    }
    match response.token() {
        Some(TOKEN_TODAY) => StepInput::Date(ctx.today()),
        Some(TOKEN_BACK) => StepInput::Back,
        Some(TOKEN_CANCEL) => StepInput::Cancel,
        _ => StepInput::Ignored,
    }
}

async fn cancel(ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
    ctx.update_host(MessageContent::text(format!("{TITLE}\n\n✖️ Kauden luonti peruttiin.")))
        .await?;
    Ok(Transition::Done)
}

fn navigation_row(has_back: bool) -> Vec<teloxide::types::InlineKeyboardButton> {
    let mut row = Vec::new();
    if has_back {
        row.push(button("⬅️ Takaisin", TOKEN_BACK));
    }
    row.push(button("✖️ Peruuta", TOKEN_CANCEL));
    row
}

fn with_error(text: String, error: Option<&str>) -> String {
    match error {
        Some(error) => format!("{text}\n\n{error}"),
        None => text,
    }
}

/// Entry point of the wizard. Looks up the running season and hands over to
/// the first real step.
#[derive(Debug, Default)]
pub struct NewSeasonWizard {
    load_failed: bool,
}

impl NewSeasonWizard {
    pub fn new() -> Self {
        Self::default()
    }

    async fn render_retry(&self, ctx: &mut ActivityContext<'_>) -> Result<(), ActivityError> {
        let content = MessageContent::text(format!(
            "{TITLE}\n\n⚠️ Kausitietojen haku epäonnistui. Yritä hetken päästä uudelleen."
        ))
        .with_buttons(vec![
            vec![button("🔄 Yritä uudelleen", TOKEN_RETRY)],
            vec![button("✖️ Peruuta", TOKEN_CANCEL)],
        ]);
        ctx.update_host(content).await
    }
}

#[async_trait]
impl ActivityState for NewSeasonWizard {
    fn name(&self) -> &'static str {
        "season_wizard"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        let active = match Season::find_active(&ctx.db().pool, ctx.chat_id().0).await {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!("Could not load seasons of chat {}: {}", ctx.chat_id().0, e);
                self.load_failed = true;
                self.render_retry(ctx).await?;
                return Ok(Transition::Stay);
            }
        };
        self.load_failed = false;

        Ok(match active {
            Some(season) => {
                let draft = SeasonDraft {
                    previous: Some(PreviousSeason {
                        id: season.id,
                        start: season.start(),
                        name: season.name,
                    }),
                    ..SeasonDraft::default()
                };
                Transition::replace(EndPreviousSeason::new(draft))
            }
            None => Transition::replace(StartDateStep::new(SeasonDraft::default(), false)),
        })
    }

    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        match response.token() {
            Some(TOKEN_RETRY) if self.load_failed => self.execute(ctx).await,
            Some(TOKEN_CANCEL) => cancel(ctx).await,
            _ => Ok(Transition::Stay),
        }
    }
}

/// Asks when the still running season ended.
pub struct EndPreviousSeason {
    draft: SeasonDraft,
    error: Option<String>,
}

impl EndPreviousSeason {
    fn new(draft: SeasonDraft) -> Self {
        Self { draft, error: None }
    }

    async fn render(&self, ctx: &mut ActivityContext<'_>) -> Result<(), ActivityError> {
        let (name, started) = match &self.draft.previous {
            Some(previous) => (
                previous.name.as_str(),
                previous.start.map(format_date_fi).unwrap_or_else(|| "?".to_string()),
            ),
            None => ("?", "?".to_string()),
        };
        let text = format!(
            "{TITLE}\n\nKausi \"{name}\" (alkoi {started}) on vielä käynnissä.\n\
             Milloin se päättyy? Vastaa tähän viestiin päivämäärällä tai paina \"Tänään\"."
        );
        let content = MessageContent::text(with_error(text, self.error.as_deref())).with_buttons(vec![
            vec![button("📅 Tänään", TOKEN_TODAY)],
            navigation_row(false),
        ]);
        ctx.update_host(content).await
    }
}

#[async_trait]
impl ActivityState for EndPreviousSeason {
    fn name(&self) -> &'static str {
        "season_end_previous"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        self.render(ctx).await?;
        Ok(Transition::Stay)
    }

    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        let end = match read_date_input(ctx, response) {
            StepInput::Date(date) => date,
            StepInput::Invalid(message) => {
                self.error = Some(message);
                self.render(ctx).await?;
                return Ok(Transition::Stay);
            }
            StepInput::Cancel => return cancel(ctx).await,
            StepInput::Back | StepInput::Ignored => return Ok(Transition::Stay),
        };

        let started = self.draft.previous.as_ref().and_then(|p| p.start);
        if let Some(started) = started.filter(|started| end < *started) {
            self.error = Some(format!(
                "⚠️ Päättymispäivä ei voi olla ennen kauden alkua ({}).",
                format_date_fi(started)
            ));
            self.render(ctx).await?;
            return Ok(Transition::Stay);
        }

        self.error = None;
        let draft = SeasonDraft {
            previous_end: Some(end),
            ..self.draft.clone()
        };
        Ok(Transition::push(StartDateStep::new(draft, true)))
    }
}

/// Asks when the new season starts.
pub struct StartDateStep {
    draft: SeasonDraft,
    has_back: bool,
    error: Option<String>,
}

impl StartDateStep {
    fn new(draft: SeasonDraft, has_back: bool) -> Self {
        Self {
            draft,
            has_back,
            error: None,
        }
    }

    async fn render(&self, ctx: &mut ActivityContext<'_>) -> Result<(), ActivityError> {
        let mut text = format!("{TITLE}\n\n");
        if let Some(end) = self.draft.previous_end {
            text.push_str(&format!("Edellinen kausi päättyy {}.\n", format_date_fi(end)));
        }
        text.push_str(
            "Milloin uusi kausi alkaa? Vastaa tähän viestiin päivämäärällä tai paina \"Tänään\".",
        );
        let content = MessageContent::text(with_error(text, self.error.as_deref())).with_buttons(vec![
            vec![button("📅 Tänään", TOKEN_TODAY)],
            navigation_row(self.has_back),
        ]);
        ctx.update_host(content).await
    }
}

#[async_trait]
impl ActivityState for StartDateStep {
    fn name(&self) -> &'static str {
        "season_start_date"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        self.render(ctx).await?;
        Ok(Transition::Stay)
    }

    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        let start = match read_date_input(ctx, response) {
            StepInput::Date(date) => date,
            StepInput::Invalid(message) => {
                self.error = Some(message);
                self.render(ctx).await?;
                return Ok(Transition::Stay);
            }
            StepInput::Back if self.has_back => return Ok(Transition::Back),
            StepInput::Cancel => return cancel(ctx).await,
            StepInput::Back | StepInput::Ignored => return Ok(Transition::Stay),
        };

        if let Some(end) = self.draft.previous_end.filter(|end| start < *end) {
            self.error = Some(format!(
                "⚠️ Uusi kausi ei voi alkaa ennen edellisen kauden päättymistä ({}).",
                format_date_fi(end)
            ));
            self.render(ctx).await?;
            return Ok(Transition::Stay);
        }

        self.error = None;
        let draft = SeasonDraft {
            start: Some(start),
            ..self.draft.clone()
        };
        Ok(Transition::push(SeasonNameStep::new(draft)))
    }
}

/// Name suggestions for a season starting on `start`.
pub fn suggested_names(start: NaiveDate) -> Vec<String> {
    let period = match start.month() {
        3..=5 => "Kevät",
        6..=8 => "Kesä",
        9..=11 => "Syksy",
        _ => "Talvi",
    };
    vec![
        format!("{} {}", period, start.year()),
        format!("Kausi {}", format_date_fi(start)),
    ]
}

/// Asks for the season's name.
pub struct SeasonNameStep {
    draft: SeasonDraft,
    suggestions: Vec<String>,
    error: Option<String>,
}

impl SeasonNameStep {
    fn new(draft: SeasonDraft) -> Self {
        let suggestions = draft.start.map(suggested_names).unwrap_or_default();
        Self {
            draft,
            suggestions,
            error: None,
        }
    }

    async fn render(&self, ctx: &mut ActivityContext<'_>) -> Result<(), ActivityError> {
        let text = format!(
            "{TITLE}\n\nMikä kauden nimeksi tulee? Valitse ehdotus tai vastaa tähän viestiin \
             (enintään {SEASON_NAME_MAX_LEN} merkkiä)."
        );
        let mut rows: Vec<_> = self
            .suggestions
            .iter()
            .enumerate()
            .map(|(i, name)| vec![button(name.clone(), format!("{TOKEN_NAME_PREFIX}{i}"))])
            .collect();
        rows.push(navigation_row(true));
        let content = MessageContent::text(with_error(text, self.error.as_deref())).with_buttons(rows);
        ctx.update_host(content).await
    }

    fn next(&self, name: String) -> Transition {
        let draft = SeasonDraft {
            name: Some(name),
            ..self.draft.clone()
        };
        Transition::push(ConfirmSeason::new(draft))
    }
}

#[async_trait]
impl ActivityState for SeasonNameStep {
    fn name(&self) -> &'static str {
        "season_name"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        self.render(ctx).await?;
        Ok(Transition::Stay)
    }

    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        if let Some(text) = response.reply_text() {
            return match validate_season_name(text) {
                Ok(name) => {
                    self.error = None;
                    Ok(self.next(name))
                }
                Err(_) => {
                    self.error = Some(format!(
                        "⚠️ Nimen on oltava 1–{SEASON_NAME_MAX_LEN} merkkiä pitkä yksirivinen teksti."
                    ));
                    self.render(ctx).await?;
                    Ok(Transition::Stay)
                }
            };
        }

        match response.token() {
            Some(TOKEN_BACK) => Ok(Transition::Back),
            Some(TOKEN_CANCEL) => cancel(ctx).await,
            Some(token) => {
                let picked = token
                    .strip_prefix(TOKEN_NAME_PREFIX)
                    .and_then(|index| index.parse::<usize>().ok())
                    .and_then(|index| self.suggestions.get(index).cloned());
                Ok(match picked {
                    Some(name) => self.next(name),
                    None => Transition::Stay,
                })
            }
            None => Ok(Transition::Stay),
        }
    }
}

/// Summary of the answers; confirming writes them.
pub struct ConfirmSeason {
    draft: SeasonDraft,
    error: Option<String>,
}

impl ConfirmSeason {
    fn new(draft: SeasonDraft) -> Self {
        Self { draft, error: None }
    }

    fn summary(&self) -> String {
        let mut text = format!("{TITLE}\n\n");
        if let (Some(previous), Some(end)) = (&self.draft.previous, self.draft.previous_end) {
            text.push_str(&format!(
                "Päätetään kausi \"{}\" {}.\n",
                previous.name,
                format_date_fi(end)
            ));
        }
        text.push_str(&format!(
            "Aloitetaan kausi \"{}\" {}.\n\nVahvistetaanko?",
            self.draft.name.as_deref().unwrap_or("?"),
            self.draft.start.map(format_date_fi).unwrap_or_else(|| "?".to_string())
        ));
        text
    }

    async fn render(&self, ctx: &mut ActivityContext<'_>) -> Result<(), ActivityError> {
        let content = MessageContent::text(with_error(self.summary(), self.error.as_deref()))
            .with_buttons(vec![vec![button("✅ Vahvista", TOKEN_CONFIRM)], navigation_row(true)]);
        ctx.update_host(content).await
    }

    async fn save(&self, ctx: &ActivityContext<'_>) -> Result<Season, ActivityError> {
        let (Some(name), Some(start)) = (self.draft.name.clone(), self.draft.start) else {
            return Err(ActivityError::Unexpected(
                "season confirmation reached without a name or start date".to_string(),
            ));
        };

        let mut tx = ctx.db().pool.begin().await?;
        if let (Some(previous), Some(end)) = (&self.draft.previous, self.draft.previous_end) {
            Season::end(&mut *tx, previous.id, end).await?;
        }
        let season = Season::create(&mut *tx, ctx.chat_id().0, name, start).await?;
        tx.commit().await?;
        Ok(season)
    }
}

#[async_trait]
impl ActivityState for ConfirmSeason {
    fn name(&self) -> &'static str {
        "season_confirm"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        self.render(ctx).await?;
        Ok(Transition::Stay)
    }

    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        match response.token() {
            Some(TOKEN_CONFIRM) => match self.save(ctx).await {
                Ok(season) => {
                    tracing::info!(
                        "Season '{}' ({}) started in chat {}",
                        season.name,
                        season.id,
                        season.chat_id
                    );
                    let started = season.start().map(format_date_fi).unwrap_or(season.start_date);
                    ctx.update_host(MessageContent::text(format!(
                        "{TITLE}\n\n✅ Kausi \"{}\" alkoi {}.",
                        season.name, started
                    )))
                    .await?;
                    Ok(Transition::Done)
                }
                Err(ActivityError::Database(e)) => {
                    tracing::warn!("Saving season in chat {} failed: {}", ctx.chat_id().0, e);
                    self.error = Some("⚠️ Tallennus epäonnistui. Yritä uudelleen.".to_string());
                    self.render(ctx).await?;
                    Ok(Transition::Stay)
                }
                Err(e) => Err(e),
            },
            Some(TOKEN_BACK) => Ok(Transition::Back),
            Some(TOKEN_CANCEL) => cancel(ctx).await,
            _ => Ok(Transition::Stay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_date_message_quotes_input() {
        let message = invalid_date_message(" tiistai ");
        assert!(message.contains("'tiistai'"));
        assert!(message.contains("ei ole tuettua muotoa"));
    }

    #[test]
    fn test_suggested_names_follow_start_month() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(
            suggested_names(start),
            vec!["Syksy 2026".to_string(), "Kausi 17.10.2026".to_string()]
        );
        let start = NaiveDate::from_ymd_opt(2027, 1, 2).unwrap();
        assert_eq!(suggested_names(start)[0], "Talvi 2027");
    }
}
