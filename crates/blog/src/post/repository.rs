//! Post repository for database operations.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{NewPost, Post, PostSummary};
use super::tags::PostTagRepository;

const POST_COLUMNS: &str =
    "id, title, summary, body, slug, category_id, author_id, created_at, updated_at";

const SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.title, p.slug, p.updated_at,
           c.name AS category,
           u.name || ' - (' || u.email || ')' AS author
    FROM posts p
    JOIN categories c ON c.id = p.category_id
    JOIN users u ON u.id = p.author_id
"#;

/// Repository for post database operations.
#[derive(Debug, Clone)]
pub struct PostRepository {
    pool: SqlitePool,
}

impl PostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a post and its tag links atomically.
    #[instrument(skip(self, post, tag_ids), fields(slug = %post.slug))]
    pub async fn create(&self, post: &NewPost, tag_ids: &[i64]) -> Result<Post> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let id = sqlx::query(
            r#"
            INSERT INTO posts (title, summary, body, slug, category_id, author_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.title)
        .bind(&post.summary)
        .bind(&post.body)
        .bind(&post.slug)
        .bind(post.category_id)
        .bind(post.author_id)
        .execute(&mut *tx)
        .await
        .context("Failed to insert post")?
        .last_insert_rowid();

        PostTagRepository::replace(&mut *tx, id, tag_ids).await?;
        tx.commit().await.context("Failed to commit post")?;
        debug!("Created post {} with {} tags", id, tag_ids.len());

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after creation"))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?");
        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch post")
    }

    /// Persist edits and bump `updated_at`. `tag_ids` replaces the tag set
    /// when given. Returns `false` when the row is gone.
    #[instrument(skip(self, post, tag_ids), fields(id = post.id))]
    pub async fn update(&self, post: &Post, tag_ids: Option<&[i64]>) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = ?, summary = ?, body = ?, slug = ?, category_id = ?,
                updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(&post.title)
        .bind(&post.summary)
        .bind(&post.body)
        .bind(&post.slug)
        .bind(post.category_id)
        .bind(post.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update post")?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        if let Some(tag_ids) = tag_ids {
            PostTagRepository::replace(&mut *tx, post.id, tag_ids).await?;
        }

        tx.commit().await.context("Failed to commit post update")?;
        Ok(true)
    }

    /// Hard delete; tag links cascade.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete post")?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<PostSummary>> {
        let sql = format!("{SUMMARY_SELECT} ORDER BY p.id LIMIT ? OFFSET ?");
        sqlx::query_as::<_, PostSummary>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list posts")
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count posts")
    }

    #[instrument(skip(self))]
    pub async fn list_by_category(
        &self,
        category_slug: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostSummary>> {
        let sql = format!("{SUMMARY_SELECT} WHERE c.slug = ? ORDER BY p.id LIMIT ? OFFSET ?");
        sqlx::query_as::<_, PostSummary>(&sql)
            .bind(category_slug)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list posts by category")
    }

    pub async fn count_by_category(&self, category_slug: &str) -> Result<i64> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM posts p
            JOIN categories c ON c.id = p.category_id
            WHERE c.slug = ?
            "#,
        )
        .bind(category_slug)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count posts by category")
    }
}
