//! Term service: validation, caching and slug rules.

use std::time::Duration;

use tracing::{info, instrument};
use validator::Validate;

use super::models::{CreateTermRequest, Term, TermKind, UpdateTermRequest};
use super::repository::TermRepository;
use crate::cache::ListCache;
use crate::error::{ServiceError, ServiceResult, ensure_id};
use crate::slug::normalize_slug;

/// Service for one kind of term, with a cached list read.
#[derive(Debug, Clone)]
pub struct TermService {
    repo: TermRepository,
    cache: ListCache<Term>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TermService {
    pub fn new(repo: TermRepository, cache_ttl: Duration) -> Self {
        let cache = ListCache::new(repo.kind().table(), cache_ttl);
        Self { repo, cache }
    }

    pub fn kind(&self) -> TermKind {
        self.repo.kind()
    }

    fn duplicate_slug(&self, slug: &str) -> String {
        format!("{} slug '{}' is already in use", self.kind().label(), slug)
    }

    /// All terms ordered by id. Served from cache while fresh.
    #[instrument(skip(self), fields(kind = %self.kind()))]
    pub async fn list(&self) -> ServiceResult<Vec<Term>> {
        let items = self
            .cache
            .get_or_load(|| async { self.repo.list().await.map_err(ServiceError::from) })
            .await?;
        Ok(items.as_ref().clone())
    }

    #[instrument(skip(self), fields(kind = %self.kind()))]
    pub async fn get(&self, id: i64) -> ServiceResult<Term> {
        ensure_id(id, self.kind().label())?;
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("{} {id}", self.kind().label())))
    }

    #[instrument(skip(self), fields(kind = %self.kind()))]
    pub async fn get_by_slug(&self, slug: &str) -> ServiceResult<Option<Term>> {
        Ok(self.repo.get_by_slug(&slug.trim().to_lowercase()).await?)
    }

    #[instrument(skip(self, request), fields(kind = %self.kind(), slug = %request.slug))]
    pub async fn create(&self, request: CreateTermRequest) -> ServiceResult<Term> {
        request.validate()?;
        let name = request.name.trim().to_string();
        self.kind()
            .check_name(&name)
            .map_err(ServiceError::validation)?;
        let slug = normalize_slug(&request.slug)?;

        let term = self
            .repo
            .create(&name, &slug)
            .await
            .map_err(|e| ServiceError::from_write(e, self.duplicate_slug(&slug)))?;
        self.cache.invalidate().await;

        info!(id = term.id, slug = %term.slug, "Created {}", self.kind().label());
        Ok(term)
    }

    /// Patch the supplied non-empty fields.
    #[instrument(skip(self, request), fields(kind = %self.kind()))]
    pub async fn update(&self, id: i64, request: UpdateTermRequest) -> ServiceResult<Term> {
        request.validate()?;
        let mut term = self.get(id).await?;

        if let Some(name) = non_empty(request.name) {
            self.kind()
                .check_name(&name)
                .map_err(ServiceError::validation)?;
            term.name = name;
        }
        if let Some(slug) = non_empty(request.slug) {
            term.slug = normalize_slug(&slug)?;
        }

        let updated = self
            .repo
            .update(&term)
            .await
            .map_err(|e| ServiceError::from_write(e, self.duplicate_slug(&term.slug)))?;
        if !updated {
            return Err(ServiceError::not_found(format!(
                "{} {id}",
                self.kind().label()
            )));
        }
        self.cache.invalidate().await;

        info!(id, "Updated {}", self.kind().label());
        Ok(term)
    }

    /// Delete and return the last-known state. Links cascade.
    #[instrument(skip(self), fields(kind = %self.kind()))]
    pub async fn delete(&self, id: i64) -> ServiceResult<Term> {
        let term = self.get(id).await?;
        self.repo.delete(id).await?;
        self.cache.invalidate().await;

        info!(id, slug = %term.slug, "Deleted {}", self.kind().label());
        Ok(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DEFAULT_TTL;
    use crate::db::Database;

    async fn service(kind: TermKind) -> TermService {
        let db = Database::in_memory().await.unwrap();
        TermService::new(TermRepository::new(db.pool().clone(), kind), DEFAULT_TTL)
    }

    fn create(name: &str, slug: &str) -> CreateTermRequest {
        CreateTermRequest {
            name: name.into(),
            slug: slug.into(),
        }
    }

    #[tokio::test]
    async fn test_create_lowercases_slug() {
        let svc = service(TermKind::Category).await;
        let term = svc.create(create("Programming", "Programming")).await.unwrap();
        assert_eq!(term.slug, "programming");
        assert_eq!(svc.get(term.id).await.unwrap(), term);
    }

    #[tokio::test]
    async fn test_create_validates_name_length() {
        let svc = service(TermKind::Category).await;
        assert!(matches!(
            svc.create(create("ab", "ab")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.create(create("Valid", "")).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_slug_conflicts() {
        let svc = service(TermKind::Tag).await;
        svc.create(create("Rust", "rust")).await.unwrap();
        assert!(matches!(
            svc.create(create("Rust again", "RUST")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_get_rejects_bad_ids() {
        let svc = service(TermKind::Tag).await;
        assert!(matches!(svc.get(0).await, Err(ServiceError::InvalidArgument(_))));
        assert!(matches!(svc.get(99).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_sees_writes_after_cache_fill() {
        let svc = service(TermKind::Tag).await;
        assert!(svc.list().await.unwrap().is_empty());

        let created = svc.create(create("Async", "async")).await.unwrap();
        assert_eq!(svc.list().await.unwrap(), vec![created.clone()]);

        svc.update(
            created.id,
            UpdateTermRequest {
                name: Some("Async Rust".into()),
                slug: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(svc.list().await.unwrap()[0].name, "Async Rust");

        svc.delete(created.id).await.unwrap();
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_ignores_empty_fields() {
        let svc = service(TermKind::Category).await;
        let term = svc.create(create("Science", "science")).await.unwrap();

        let updated = svc
            .update(
                term.id,
                UpdateTermRequest {
                    name: Some("   ".into()),
                    slug: Some("Physics".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Science");
        assert_eq!(updated.slug, "physics");
    }

    #[tokio::test]
    async fn test_delete_returns_last_state() {
        let svc = service(TermKind::Category).await;
        let term = svc.create(create("Travel", "travel")).await.unwrap();
        assert_eq!(svc.delete(term.id).await.unwrap(), term);
        assert!(matches!(svc.delete(term.id).await, Err(ServiceError::NotFound(_))));
    }
}
