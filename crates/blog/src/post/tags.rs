//! Post-tag link table.

use anyhow::{Context, Result};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::instrument;

use crate::taxonomy::Term;

/// Repository for the `post_tags` join table.
#[derive(Debug, Clone)]
pub struct PostTagRepository {
    pool: SqlitePool,
}

impl PostTagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn tags_for(&self, post_id: i64) -> Result<Vec<Term>> {
        sqlx::query_as::<_, Term>(
            r#"
            SELECT t.id, t.name, t.slug
            FROM tags t
            JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = ?
            ORDER BY t.id
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch post tags")
    }

    /// Replace a post's tag set inside an open transaction.
    pub async fn replace(conn: &mut SqliteConnection, post_id: i64, tag_ids: &[i64]) -> Result<()> {
        sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut *conn)
            .await
            .context("Failed to clear post tags")?;

        for tag_id in tag_ids {
            sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(*tag_id)
                .execute(&mut *conn)
                .await
                .context("Failed to link post tag")?;
        }

        Ok(())
    }
}
