use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Setting key for the width of rendered graphs, in characters.
pub const GRAPH_WIDTH: &str = "graph_width";

/// One per-chat key/value setting.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChatSetting {
    pub chat_id: i64,
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

impl ChatSetting {
    pub async fn get(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
        key: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT value FROM chat_settings WHERE chat_id = ? AND key = ?"
        )
        .bind(chat_id)
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    /// Reads a numeric setting, falling back to `default` when missing or unparsable.
    pub async fn get_or(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
        key: &str,
        default: i64,
    ) -> Result<i64, sqlx::Error> {
        let value = Self::get(pool, chat_id, key).await?;
        Ok(value
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(default))
    }

    pub async fn set(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
        key: &str,
        value: &str,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO chat_settings (chat_id, key, value, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (chat_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#
        )
        .bind(chat_id)
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_chat(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ChatSetting>(
            "SELECT chat_id, key, value, updated_at FROM chat_settings WHERE chat_id = ? ORDER BY key"
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await
    }
}
