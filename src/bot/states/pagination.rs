use async_trait::async_trait;

use crate::activity::{ActivityContext, ActivityState, Response, Transition};
use crate::error::ActivityError;
use crate::gateway::{button, MessageContent};

pub const PAGE_SIZE: usize = 5;

/// A list of lines shown a page at a time.
#[derive(Debug, Clone)]
pub struct PaginatedList {
    title: String,
    lines: Vec<String>,
    page: usize,
    per_page: usize,
}

impl PaginatedList {
    pub fn new(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
            page: 0,
            per_page: PAGE_SIZE,
        }
    }

    pub fn page_count(&self) -> usize {
        self.lines.len().div_ceil(self.per_page).max(1)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    fn content(&self) -> MessageContent {
        let start = self.page * self.per_page;
        let body = if self.lines.is_empty() {
            "Ei näytettävää.".to_string()
        } else {
            self.lines
                .iter()
                .skip(start)
                .take(self.per_page)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n")
        };
        let text = format!(
            "{}\n\n{}\n\nSivu {}/{}",
            self.title,
            body,
            self.page + 1,
            self.page_count()
        );

        let mut arrows = Vec::new();
        if self.page > 0 {
            arrows.push(button("◀", "prev"));
        }
        if self.page + 1 < self.page_count() {
            arrows.push(button("▶", "next"));
        }
        MessageContent::text(text).with_buttons(vec![arrows, vec![button("✖️ Sulje", "close")]])
    }
}

#[async_trait]
impl ActivityState for PaginatedList {
    fn name(&self) -> &'static str {
        "paginated_list"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        ctx.update_host(self.content()).await?;
        Ok(Transition::Stay)
    }

    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        match response.token() {
            Some("prev") if self.page > 0 => self.page -= 1,
            Some("next") if self.page + 1 < self.page_count() => self.page += 1,
            Some("close") => return Ok(Transition::Done),
            _ => return Ok(Transition::Stay),
        }
        ctx.update_host(self.content()).await?;
        Ok(Transition::Stay)
    }
}
