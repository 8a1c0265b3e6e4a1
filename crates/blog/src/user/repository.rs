//! User repository (credential store).

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{NewUser, User, UserSummary};

const USER_COLUMNS: &str = "id, name, email, password_hash, bio, image, slug, created_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    pub async fn create(&self, user: NewUser) -> Result<User> {
        debug!("Creating user: {}", user.email);

        let id = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, bio, image, slug)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(&user.image)
        .bind(&user.slug)
        .execute(&self.pool)
        .await
        .context("Failed to insert user")?
        .last_insert_rowid();

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")
    }

    #[instrument(skip(self))]
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by email")
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check email")?;
        Ok(count > 0)
    }

    /// Persist mutable fields. Returns `false` when the row is gone.
    #[instrument(skip(self, user), fields(id = user.id))]
    pub async fn update(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = ?, email = ?, password_hash = ?, bio = ?, image = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(&user.image)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;

        Ok(result.rows_affected() > 0)
    }

    /// Hard delete; posts and role links cascade.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<UserSummary>> {
        sqlx::query_as::<_, UserSummary>(
            "SELECT id, name, email, slug FROM users ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::error::is_unique_violation;

    fn new_user(email: &str, slug: &str) -> NewUser {
        NewUser {
            name: "Test".into(),
            email: email.into(),
            password_hash: "$2b$04$hash".into(),
            bio: None,
            image: None,
            slug: slug.into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool().clone());

        let user = repo.create(new_user("a@b.c", "a-b-c")).await.unwrap();
        assert!(user.id > 0);
        assert!(!user.created_at.is_empty());
        assert_eq!(repo.get_by_email("a@b.c").await.unwrap().unwrap().id, user.id);
        assert!(repo.email_exists("a@b.c").await.unwrap());
        assert!(!repo.email_exists("x@y.z").await.unwrap());
    }

    #[tokio::test]
    async fn test_unique_email_and_slug() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool().clone());

        repo.create(new_user("a@b.c", "a-b-c")).await.unwrap();
        let dup_email = repo.create(new_user("a@b.c", "other")).await.unwrap_err();
        assert!(is_unique_violation(&dup_email));
        let dup_slug = repo.create(new_user("a-b@c", "a-b-c")).await.unwrap_err();
        assert!(is_unique_violation(&dup_slug));
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool().clone());
        for i in 0..5 {
            repo.create(new_user(&format!("u{i}@x.io"), &format!("u{i}-x-io")))
                .await
                .unwrap();
        }

        let page = repo.list(2, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].email, "u2@x.io");
        assert_eq!(repo.count().await.unwrap(), 5);
    }
}
