//! User-role link table.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::instrument;

use crate::taxonomy::Term;

/// Repository for the `user_roles` join table.
#[derive(Debug, Clone)]
pub struct UserRoleRepository {
    pool: SqlitePool,
}

impl UserRoleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Roles held by a user, ordered by role id.
    #[instrument(skip(self))]
    pub async fn roles_for(&self, user_id: i64) -> Result<Vec<Term>> {
        sqlx::query_as::<_, Term>(
            r#"
            SELECT r.id, r.name, r.slug
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = ?
            ORDER BY r.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch user roles")
    }

    /// Link a role. Returns `false` if the link already existed.
    #[instrument(skip(self))]
    pub async fn link(&self, user_id: i64, role_id: i64) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(role_id)
                .execute(&self.pool)
                .await
                .context("Failed to link role")?;
        Ok(result.rows_affected() > 0)
    }

    /// Unlink a role. Returns `false` if there was nothing to remove.
    #[instrument(skip(self))]
    pub async fn unlink(&self, user_id: i64, role_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .context("Failed to unlink role")?;
        Ok(result.rows_affected() > 0)
    }
}
