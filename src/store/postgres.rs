use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::StoryStore;
use crate::models::StoryRecord;

const STORY_COLUMNS: &str = r#"
    st.id, st.title, s.text, st.published_at, p.name AS publication,
    st.author, st.type AS story_type, st.classification
FROM content_story st
INNER JOIN scripts_script s ON s.story_id = st.id
INNER JOIN content_publication p ON p.id = st.publication_id
"#;

#[derive(Debug, sqlx::FromRow)]
struct StoryRow {
    id: Uuid,
    title: Option<String>,
    text: Option<String>,
    published_at: Option<DateTime<Utc>>,
    publication: Option<String>,
    author: Option<String>,
    story_type: Option<String>,
    classification: Option<String>,
}

impl From<StoryRow> for StoryRecord {
    fn from(row: StoryRow) -> Self {
        Self {
            id: row.id.to_string(),
            title: row.title.unwrap_or_default(),
            text: row.text.unwrap_or_default(),
            published_at: row.published_at,
            publication: row.publication,
            author: row.author,
            story_type: row.story_type,
            classification: row.classification,
        }
    }
}

/// Read-only access to the story replica.
#[derive(Clone)]
pub struct PgStoryStore {
    pool: PgPool,
}

impl PgStoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool that connects on first use, so the service can start
    /// while the replica is unreachable.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .context("Invalid story database URL")?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl StoryStore for PgStoryStore {
    async fn query_recent(&self, start_date: NaiveDate, limit: i64) -> Result<Vec<StoryRecord>> {
        let sql = format!(
            "SELECT {STORY_COLUMNS}
            WHERE st.published_at::date <= current_date
              AND st.published_at::date >= $1
              AND (st.type != 'SEGMENT' OR st.type IS NULL)
            ORDER BY st.published_at DESC
            LIMIT $2"
        );

        let rows = sqlx::query_as::<_, StoryRow>(&sql)
            .bind(start_date)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to query recent stories")?;

        Ok(rows.into_iter().map(StoryRecord::from).collect())
    }

    async fn query_by_ids(&self, ids: &[Uuid]) -> Result<Vec<StoryRecord>> {
        let sql = format!(
            "SELECT {STORY_COLUMNS}
            WHERE st.id = ANY($1)
            ORDER BY st.published_at DESC"
        );

        let rows = sqlx::query_as::<_, StoryRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .context("Failed to query stories by id")?;

        Ok(rows.into_iter().map(StoryRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversion_fills_missing_text() {
        let id = Uuid::new_v4();
        let record = StoryRecord::from(StoryRow {
            id,
            title: Some("Rates held".to_string()),
            text: None,
            published_at: None,
            publication: Some("Daily Ledger".to_string()),
            author: None,
            story_type: Some("ARTICLE".to_string()),
            classification: None,
        });
        assert_eq!(record.id, id.to_string());
        assert_eq!(record.text, "");
        assert_eq!(record.story_type.as_deref(), Some("ARTICLE"));
    }
}
