use std::time::Duration;

use async_trait::async_trait;

use crate::activity::{ActivityContext, ActivityState, Response, Transition};
use crate::error::ActivityError;
use crate::gateway::{button, MessageContent};

/// Name of the timer that scrubs unanswered error details.
pub const EXPIRY_TIMER: &str = "error_share_expiry";

pub const SHARED_NOTICE: &str = "✅ Kiitos! Virheen tiedot lähetettiin ylläpidolle.";
pub const DISCARDED_NOTICE: &str = "🗑️ Virheen tiedot hylättiin.";
pub const EXPIRED_NOTICE: &str =
    "⌛ Virheen tiedot poistettiin, koska niiden jakamiseen ei vastattu ajoissa.";

/// Asks whether the details of a failure may be sent to the operators.
/// Unanswered, the details are scrubbed after `timeout`.
pub struct ErrorShareConfirmation {
    details: Option<String>,
    timeout: Duration,
    armed: bool,
}

impl ErrorShareConfirmation {
    pub fn new(details: impl Into<String>, timeout: Duration) -> Self {
        Self {
            details: Some(details.into()),
            timeout,
            armed: false,
        }
    }

    async fn finish(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        notice: &str,
    ) -> Result<Transition, ActivityError> {
        self.details = None;
        ctx.update_host(MessageContent::text(notice)).await?;
        Ok(Transition::Done)
    }

    async fn share(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        let Some(details) = self.details.take() else {
            return Ok(Transition::Stay);
        };
        let report = format!("🐞 Virheraportti chatista {}:\n\n{}", ctx.chat_id().0, details);
        let notice = match ctx.notify_operators(&report).await {
            Ok(true) => SHARED_NOTICE,
            Ok(false) => "ℹ️ Ylläpidon kanavaa ei ole määritetty, joten tietoja ei lähetetty.",
            Err(e) => {
                tracing::warn!("Could not forward error report: {}", e);
                "⚠️ Tietojen lähettäminen epäonnistui."
            }
        };
        self.finish(ctx, notice).await
    }
}

#[async_trait]
impl ActivityState for ErrorShareConfirmation {
    fn name(&self) -> &'static str {
        "error_share"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        if !self.armed {
            ctx.schedule_timer(EXPIRY_TIMER, self.timeout);
            self.armed = true;
        }
        let content = MessageContent::text(
            "❌ Jotain meni pieleen.\n\nHaluatko jakaa virheen tiedot ylläpidolle? \
             Tiedot poistetaan automaattisesti, jos et vastaa.",
        )
        .with_buttons(vec![vec![
            button("📤 Jaa", "share"),
            button("🗑️ Älä jaa", "discard"),
        ]]);
        ctx.update_host(content).await?;
        Ok(Transition::Stay)
    }

    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        if response.timer() == Some(EXPIRY_TIMER) {
            tracing::info!("Error details in chat {} expired unanswered", ctx.chat_id().0);
            return self.finish(ctx, EXPIRED_NOTICE).await;
        }

        match response.token() {
            Some("share") => {
                ctx.cancel_timer(EXPIRY_TIMER);
                self.share(ctx).await
            }
            Some("discard") => {
                ctx.cancel_timer(EXPIRY_TIMER);
                self.finish(ctx, DISCARDED_NOTICE).await
            }
            _ => Ok(Transition::Stay),
        }
    }
}
