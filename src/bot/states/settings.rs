use async_trait::async_trait;

use crate::activity::{ActivityContext, ActivityState, Response, Transition};
use crate::database::models::chat_setting::{ChatSetting, GRAPH_WIDTH};
use crate::error::ActivityError;
use crate::gateway::{button, MessageContent};
use crate::utils::validation::{validate_graph_width, GRAPH_WIDTH_MAX, GRAPH_WIDTH_MIN};

pub const DEFAULT_GRAPH_WIDTH: i64 = 20;
const GRAPH_WIDTH_STEP: i64 = 2;

/// Top level of `/asetukset`.
#[derive(Debug, Default)]
pub struct SettingsMenu;

impl SettingsMenu {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActivityState for SettingsMenu {
    fn name(&self) -> &'static str {
        "settings_menu"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        let content = MessageContent::text("⚙️ Asetukset\n\nValitse muutettava asetus.")
            .with_buttons(vec![
                vec![button("📊 Kaavion leveys", "graph_width")],
                vec![button("✖️ Sulje", "close")],
            ]);
        ctx.update_host(content).await?;
        Ok(Transition::Stay)
    }

    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        match response.token() {
            Some("graph_width") => Ok(Transition::push(GraphWidthSetting::new())),
            Some("close") => {
                ctx.update_host(MessageContent::text("⚙️ Asetukset suljettu.")).await?;
                Ok(Transition::Done)
            }
            _ => Ok(Transition::Stay),
        }
    }
}

/// Width of the chat's graphs, adjusted in steps or typed as a reply.
#[derive(Debug, Default)]
pub struct GraphWidthSetting {
    width: Option<i64>,
    notice: Option<String>,
}

impl GraphWidthSetting {
    pub fn new() -> Self {
        Self::default()
    }

    async fn render(&self, ctx: &mut ActivityContext<'_>) -> Result<(), ActivityError> {
        let Some(width) = self.width else {
            let content = MessageContent::text(format!(
                "📊 Kaavion leveys\n\n{}",
                self.notice.as_deref().unwrap_or("⚠️ Asetusta ei voitu lukea.")
            ))
            .with_buttons(vec![vec![button("⬅️ Takaisin", "back")]]);
            return ctx.update_host(content).await;
        };

        let bar = "▇".repeat(usize::try_from(width).unwrap_or(0));
        let mut text = format!(
            "📊 Kaavion leveys\n\nNykyinen leveys: {width} merkkiä\n{bar}\n\n\
             Säädä napeilla tai vastaa tähän viestiin luvulla {GRAPH_WIDTH_MIN}–{GRAPH_WIDTH_MAX}."
        );
        if let Some(notice) = &self.notice {
            text.push_str("\n\n");
            text.push_str(notice);
        }
        let content = MessageContent::text(text).with_buttons(vec![
            vec![button("➖", "dec"), button("➕", "inc")],
            vec![button("⬅️ Takaisin", "back")],
        ]);
        ctx.update_host(content).await
    }

    async fn store(&mut self, ctx: &mut ActivityContext<'_>, width: i64) -> Result<(), ActivityError> {
        if self.width == Some(width) {
            self.notice = None;
            return self.render(ctx).await;
        }
        match ChatSetting::set(&ctx.db().pool, ctx.chat_id().0, GRAPH_WIDTH, &width.to_string()).await {
            Ok(()) => {
                self.width = Some(width);
                self.notice = None;
            }
            Err(e) => {
                tracing::warn!("Could not store graph width for chat {}: {}", ctx.chat_id().0, e);
                self.notice = Some("⚠️ Tallennus epäonnistui. Yritä uudelleen.".to_string());
            }
        }
        self.render(ctx).await
    }
}

#[async_trait]
impl ActivityState for GraphWidthSetting {
    fn name(&self) -> &'static str {
        "settings_graph_width"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        if self.width.is_none() {
            match ChatSetting::get_or(&ctx.db().pool, ctx.chat_id().0, GRAPH_WIDTH, DEFAULT_GRAPH_WIDTH).await {
                Ok(width) => self.width = Some(width.clamp(GRAPH_WIDTH_MIN, GRAPH_WIDTH_MAX)),
                Err(e) => {
                    tracing::warn!("Could not read graph width for chat {}: {}", ctx.chat_id().0, e);
                    self.notice = Some("⚠️ Asetusta ei voitu lukea.".to_string());
                }
            }
        }
        self.render(ctx).await?;
        Ok(Transition::Stay)
    }

    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        if let Some(text) = response.reply_text() {
            if self.width.is_none() {
                return Ok(Transition::Stay);
            }
            match validate_graph_width(text) {
                Ok(width) => self.store(ctx, width).await?,
                Err(_) => {
                    self.notice = Some(format!(
                        "⚠️ Leveyden on oltava kokonaisluku väliltä {GRAPH_WIDTH_MIN}–{GRAPH_WIDTH_MAX}."
                    ));
                    self.render(ctx).await?;
                }
            }
            return Ok(Transition::Stay);
        }

        let step = match response.token() {
            Some("back") => return Ok(Transition::Back),
            Some("dec") => -GRAPH_WIDTH_STEP,
            Some("inc") => GRAPH_WIDTH_STEP,
            _ => return Ok(Transition::Stay),
        };
        if let Some(width) = self.width {
            let next = (width + step).clamp(GRAPH_WIDTH_MIN, GRAPH_WIDTH_MAX);
            self.store(ctx, next).await?;
        }
        Ok(Transition::Stay)
    }
}
