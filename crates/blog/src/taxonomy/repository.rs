//! Term repository for database operations.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::instrument;

use super::models::{Term, TermKind};

/// Repository for one term table.
#[derive(Debug, Clone)]
pub struct TermRepository {
    pool: SqlitePool,
    kind: TermKind,
}

impl TermRepository {
    pub fn new(pool: SqlitePool, kind: TermKind) -> Self {
        Self { pool, kind }
    }

    pub fn kind(&self) -> TermKind {
        self.kind
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn list(&self) -> Result<Vec<Term>> {
        let sql = format!("SELECT id, name, slug FROM {} ORDER BY id", self.kind.table());
        sqlx::query_as::<_, Term>(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {}", self.kind.table()))
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn get(&self, id: i64) -> Result<Option<Term>> {
        let sql = format!("SELECT id, name, slug FROM {} WHERE id = ?", self.kind.table());
        sqlx::query_as::<_, Term>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {}", self.kind.label()))
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Term>> {
        let sql = format!("SELECT id, name, slug FROM {} WHERE slug = ?", self.kind.table());
        sqlx::query_as::<_, Term>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {} by slug", self.kind.label()))
    }

    /// Fetch the subset of `ids` that exist, in id order.
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<Term>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, name, slug FROM {} WHERE id IN ({placeholders}) ORDER BY id",
            self.kind.table()
        );
        let mut query = sqlx::query_as::<_, Term>(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        query
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {}", self.kind.table()))
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn create(&self, name: &str, slug: &str) -> Result<Term> {
        let sql = format!("INSERT INTO {} (name, slug) VALUES (?, ?)", self.kind.table());
        let id = sqlx::query(&sql)
            .bind(name)
            .bind(slug)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert {}", self.kind.label()))?
            .last_insert_rowid();

        Ok(Term {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }

    /// Overwrite name and slug. Returns `false` when the row is gone.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn update(&self, term: &Term) -> Result<bool> {
        let sql = format!("UPDATE {} SET name = ?, slug = ? WHERE id = ?", self.kind.table());
        let result = sqlx::query(&sql)
            .bind(&term.name)
            .bind(&term.slug)
            .bind(term.id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update {}", self.kind.label()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Hard delete. Dependent rows go with it through foreign key cascades.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.kind.table());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {}", self.kind.label()))?;
        Ok(result.rows_affected() > 0)
    }
}
