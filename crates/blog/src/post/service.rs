//! Post service: validation, existence checks and paging.

use tracing::{info, instrument};
use validator::Validate;

use super::models::{CreatePostRequest, NewPost, Post, PostDetail, PostSummary, UpdatePostRequest};
use super::repository::PostRepository;
use super::tags::PostTagRepository;
use crate::error::{ServiceError, ServiceResult, ensure_id};
use crate::pagination::{Page, PageQuery};
use crate::slug::normalize_slug;
use crate::taxonomy::{Term, TermKind, TermRepository};
use crate::user::{UserRepository, UserSummary};

/// Service for post operations.
#[derive(Debug, Clone)]
pub struct PostService {
    posts: PostRepository,
    post_tags: PostTagRepository,
    categories: TermRepository,
    tags: TermRepository,
    users: UserRepository,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn duplicate_slug(slug: &str) -> String {
    format!("Post slug '{slug}' is already in use")
}

impl PostService {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            posts: PostRepository::new(pool.clone()),
            post_tags: PostTagRepository::new(pool.clone()),
            categories: TermRepository::new(pool.clone(), TermKind::Category),
            tags: TermRepository::new(pool.clone(), TermKind::Tag),
            users: UserRepository::new(pool),
        }
    }

    async fn load(&self, id: i64) -> ServiceResult<Post> {
        ensure_id(id, "Post")?;
        self.posts
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Post {id}")))
    }

    async fn category(&self, id: i64) -> ServiceResult<Term> {
        ensure_id(id, "Category")?;
        self.categories
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Category {id}")))
    }

    async fn author(&self, id: i64) -> ServiceResult<UserSummary> {
        ensure_id(id, "Author")?;
        let user = self
            .users
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Author {id}")))?;
        Ok(UserSummary {
            id: user.id,
            name: user.name,
            email: user.email,
            slug: user.slug,
        })
    }

    /// Deduplicate tag ids and make sure every one exists.
    async fn resolve_tags(&self, tag_ids: &[i64]) -> ServiceResult<Vec<i64>> {
        let mut ids = tag_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        for id in &ids {
            ensure_id(*id, "Tag")?;
        }

        let found = self.tags.get_many(&ids).await?;
        if let Some(missing) = ids.iter().find(|id| !found.iter().any(|t| t.id == **id)) {
            return Err(ServiceError::not_found(format!("Tag {missing}")));
        }
        Ok(ids)
    }

    async fn detail(&self, post: Post) -> ServiceResult<PostDetail> {
        let category = self.category(post.category_id).await?;
        let author = self.author(post.author_id).await?;
        let tags = self.post_tags.tags_for(post.id).await?;
        Ok(PostDetail {
            post,
            category,
            author,
            tags,
        })
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: PageQuery) -> ServiceResult<Page<PostSummary>> {
        let query = query.checked()?;
        let total = self.posts.count().await?;
        let items = self.posts.list(query.limit(), query.offset()).await?;
        Ok(Page::new(query, total, items))
    }

    /// Posts in the category with this slug. An unknown slug yields an
    /// empty page.
    #[instrument(skip(self))]
    pub async fn list_by_category(
        &self,
        category_slug: &str,
        query: PageQuery,
    ) -> ServiceResult<Page<PostSummary>> {
        let query = query.checked()?;
        let slug = category_slug.trim().to_lowercase();
        let total = self.posts.count_by_category(&slug).await?;
        if total == 0 {
            return Ok(Page::empty(query));
        }
        let items = self
            .posts
            .list_by_category(&slug, query.limit(), query.offset())
            .await?;
        Ok(Page::new(query, total, items))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> ServiceResult<PostDetail> {
        let post = self.load(id).await?;
        self.detail(post).await
    }

    /// Create a post. `author_id` falls back to `default_author`.
    #[instrument(skip(self, request), fields(slug = %request.slug))]
    pub async fn create(
        &self,
        request: CreatePostRequest,
        default_author: i64,
    ) -> ServiceResult<PostDetail> {
        request.validate()?;
        let slug = normalize_slug(&request.slug)?;
        let category = self.category(request.category_id).await?;
        let author = self.author(request.author_id.unwrap_or(default_author)).await?;
        let tag_ids = self.resolve_tags(&request.tag_ids).await?;

        let new_post = NewPost {
            title: request.title.trim().to_string(),
            summary: request.summary.trim().to_string(),
            body: request.body,
            slug,
            category_id: category.id,
            author_id: author.id,
        };
        let post = self
            .posts
            .create(&new_post, &tag_ids)
            .await
            .map_err(|e| ServiceError::from_write(e, duplicate_slug(&new_post.slug)))?;

        info!(post_id = post.id, author_id = author.id, "Created post");
        let tags = self.post_tags.tags_for(post.id).await?;
        Ok(PostDetail {
            post,
            category,
            author,
            tags,
        })
    }

    /// Patch the supplied non-empty fields.
    #[instrument(skip(self, request))]
    pub async fn update(&self, id: i64, request: UpdatePostRequest) -> ServiceResult<PostDetail> {
        request.validate()?;
        let mut post = self.load(id).await?;

        if let Some(title) = non_empty(request.title) {
            post.title = title;
        }
        if let Some(summary) = non_empty(request.summary) {
            post.summary = summary;
        }
        if let Some(body) = request.body.filter(|b| !b.trim().is_empty()) {
            post.body = body;
        }
        if let Some(slug) = non_empty(request.slug) {
            post.slug = normalize_slug(&slug)?;
        }
        if let Some(category_id) = request.category_id {
            post.category_id = self.category(category_id).await?.id;
        }
        let tag_ids = match request.tag_ids {
            Some(ids) => Some(self.resolve_tags(&ids).await?),
            None => None,
        };

        let updated = self
            .posts
            .update(&post, tag_ids.as_deref())
            .await
            .map_err(|e| ServiceError::from_write(e, duplicate_slug(&post.slug)))?;
        if !updated {
            return Err(ServiceError::not_found(format!("Post {id}")));
        }

        info!(post_id = id, "Updated post");
        self.get(id).await
    }

    /// Delete a post and return its last-known state.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ServiceResult<PostDetail> {
        let detail = self.get(id).await?;
        self.posts.delete(id).await?;
        info!(post_id = id, "Deleted post");
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::user::NewUser;

    struct Fixture {
        db: Database,
        svc: PostService,
        author: i64,
        category: i64,
        tags: Vec<i64>,
    }

    async fn fixture() -> Fixture {
        let db = Database::in_memory().await.unwrap();
        let pool = db.pool().clone();

        let author = UserRepository::new(pool.clone())
            .create(NewUser {
                name: "Writer".into(),
                email: "writer@x.io".into(),
                password_hash: "$2b$04$hash".into(),
                bio: None,
                image: None,
                slug: "writer-x-io".into(),
            })
            .await
            .unwrap()
            .id;
        let category = TermRepository::new(pool.clone(), TermKind::Category)
            .create("Programming", "programming")
            .await
            .unwrap()
            .id;
        let tag_repo = TermRepository::new(pool.clone(), TermKind::Tag);
        let mut tags = Vec::new();
        for slug in ["rust", "async"] {
            tags.push(tag_repo.create(slug, slug).await.unwrap().id);
        }

        Fixture {
            svc: PostService::new(pool),
            db,
            author,
            category,
            tags,
        }
    }

    fn request(slug: &str, category_id: i64, tag_ids: Vec<i64>) -> CreatePostRequest {
        CreatePostRequest {
            title: "A title".into(),
            summary: "A summary".into(),
            body: "Body text".into(),
            slug: slug.into(),
            category_id,
            author_id: None,
            tag_ids,
        }
    }

    async fn count(db: &Database, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(db.pool()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_resolves_relations() {
        let f = fixture().await;
        let detail = f
            .svc
            .create(request("Hello-World", f.category, f.tags.clone()), f.author)
            .await
            .unwrap();

        assert_eq!(detail.post.slug, "hello-world");
        assert_eq!(detail.author.id, f.author);
        assert_eq!(detail.category.slug, "programming");
        assert_eq!(detail.tags.len(), 2);
        assert_eq!(f.svc.get(detail.post.id).await.unwrap().tags, detail.tags);
    }

    #[tokio::test]
    async fn test_create_checks_references() {
        let f = fixture().await;
        assert!(matches!(
            f.svc.create(request("p1", 999, vec![]), f.author).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.svc.create(request("p2", f.category, vec![999]), f.author).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.svc.create(request("p3", f.category, vec![]), 999).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(count(&f.db, "SELECT COUNT(*) FROM posts").await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_slug_conflicts() {
        let f = fixture().await;
        f.svc.create(request("same", f.category, vec![]), f.author).await.unwrap();
        assert!(matches!(
            f.svc.create(request("SAME", f.category, vec![]), f.author).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_patches_and_replaces_tags() {
        let f = fixture().await;
        let created = f
            .svc
            .create(request("draft", f.category, f.tags.clone()), f.author)
            .await
            .unwrap();

        let updated = f
            .svc
            .update(
                created.post.id,
                UpdatePostRequest {
                    title: Some("New title".into()),
                    summary: Some("  ".into()),
                    tag_ids: Some(vec![f.tags[1], f.tags[1]]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.post.title, "New title");
        assert_eq!(updated.post.summary, "A summary");
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.tags[0].id, f.tags[1]);
    }

    #[tokio::test]
    async fn test_read_rejects_bad_ids() {
        let f = fixture().await;
        assert!(matches!(f.svc.get(0).await, Err(ServiceError::InvalidArgument(_))));
        assert!(matches!(f.svc.get(42).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(f.svc.delete(42).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_pagination_returns_requested_window() {
        let f = fixture().await;
        let mut ids = Vec::new();
        for i in 0..25 {
            let detail = f
                .svc
                .create(request(&format!("post-{i}"), f.category, vec![]), f.author)
                .await
                .unwrap();
            ids.push(detail.post.id);
        }

        let page = f.svc.list(PageQuery::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 10);
        let got: Vec<i64> = page.items.iter().map(|p| p.id).collect();
        assert_eq!(got, ids[10..20].to_vec());
        assert_eq!(page.items[0].category, "Programming");
        assert_eq!(page.items[0].author, "Writer - (writer@x.io)");
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let f = fixture().await;
        let other = TermRepository::new(f.db.pool().clone(), TermKind::Category)
            .create("Cooking", "cooking")
            .await
            .unwrap()
            .id;
        f.svc.create(request("a", f.category, vec![]), f.author).await.unwrap();
        f.svc.create(request("b", other, vec![]), f.author).await.unwrap();
        f.svc.create(request("c", f.category, vec![]), f.author).await.unwrap();

        let page = f
            .svc
            .list_by_category("Programming", PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|p| p.category == "Programming"));

        let empty = f
            .svc
            .list_by_category("unknown", PageQuery::default())
            .await
            .unwrap();
        assert_eq!(empty.total, 0);
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn test_cascades() {
        let f = fixture().await;
        let post = f
            .svc
            .create(request("doomed", f.category, f.tags.clone()), f.author)
            .await
            .unwrap();

        TermRepository::new(f.db.pool().clone(), TermKind::Tag)
            .delete(f.tags[0])
            .await
            .unwrap();
        assert_eq!(f.svc.get(post.post.id).await.unwrap().tags.len(), 1);

        TermRepository::new(f.db.pool().clone(), TermKind::Category)
            .delete(f.category)
            .await
            .unwrap();
        assert!(matches!(
            f.svc.get(post.post.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(count(&f.db, "SELECT COUNT(*) FROM post_tags").await, 0);
    }

    #[tokio::test]
    async fn test_deleting_author_removes_posts() {
        let f = fixture().await;
        f.svc.create(request("mine", f.category, vec![]), f.author).await.unwrap();
        UserRepository::new(f.db.pool().clone())
            .delete(f.author)
            .await
            .unwrap();
        assert_eq!(count(&f.db, "SELECT COUNT(*) FROM posts").await, 0);
    }
}
