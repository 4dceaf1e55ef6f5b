use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A competition season of a chat. A season without an end date is still running.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Season {
    pub id: i64,
    pub chat_id: i64,
    pub name: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub created_at: String,
}

impl Season {
    pub async fn create<'e, E>(
        executor: E,
        chat_id: i64,
        name: String,
        start_date: NaiveDate,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let start = start_date.format(DATE_FORMAT).to_string();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO seasons (chat_id, name, start_date, end_date, created_at) VALUES (?, ?, ?, NULL, ?)"
        )
        .bind(chat_id)
        .bind(&name)
        .bind(&start)
        .bind(&now)
        .execute(executor)
        .await?;

        Ok(Season {
            id: result.last_insert_rowid(),
            chat_id,
            name,
            start_date: start,
            end_date: None,
            created_at: now,
        })
    }

    pub async fn find_active(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Season>(
            "SELECT id, chat_id, name, start_date, end_date, created_at FROM seasons
             WHERE chat_id = ? AND end_date IS NULL
             ORDER BY start_date DESC, id DESC LIMIT 1"
        )
        .bind(chat_id)
        .fetch_optional(pool)
        .await
    }

    /// All seasons of a chat, newest first.
    pub async fn find_by_chat(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Season>(
            "SELECT id, chat_id, name, start_date, end_date, created_at FROM seasons
             WHERE chat_id = ? ORDER BY start_date DESC, id DESC"
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await
    }

    pub async fn end<'e, E>(
        executor: E,
        season_id: i64,
        end_date: NaiveDate,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query("UPDATE seasons SET end_date = ? WHERE id = ?")
            .bind(end_date.format(DATE_FORMAT).to_string())
            .bind(season_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub fn start(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.start_date, DATE_FORMAT).ok()
    }

    pub fn end_day(&self) -> Option<NaiveDate> {
        self.end_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
    }
}
