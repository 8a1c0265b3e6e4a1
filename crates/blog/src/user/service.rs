//! User service: registration, login, account edits and role assignment.

use tracing::{info, instrument, warn};
use validator::{Validate, ValidateEmail};

use super::models::{
    EditAccountRequest, NewUser, RegisterRequest, Registration, User, UserProfile, UserRoles,
    UserSummary,
};
use super::repository::UserRepository;
use super::roles::UserRoleRepository;
use crate::auth::{PasswordGenerator, PasswordHasher};
use crate::error::{ServiceError, ServiceResult, ensure_id};
use crate::pagination::{Page, PageQuery};
use crate::slug::slug_from_email;
use crate::taxonomy::{Term, TermKind, TermRepository};

/// Service for user management operations.
#[derive(Debug, Clone)]
pub struct UserService {
    users: UserRepository,
    links: UserRoleRepository,
    roles: TermRepository,
    hasher: PasswordHasher,
    generator: PasswordGenerator,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl UserService {
    pub fn new(
        pool: sqlx::SqlitePool,
        hasher: PasswordHasher,
        generator: PasswordGenerator,
    ) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            links: UserRoleRepository::new(pool.clone()),
            roles: TermRepository::new(pool, TermKind::Role),
            hasher,
            generator,
        }
    }

    async fn load(&self, id: i64) -> ServiceResult<User> {
        ensure_id(id, "User")?;
        self.users
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("User {id}")))
    }

    async fn load_role(&self, id: i64) -> ServiceResult<Term> {
        ensure_id(id, "Role")?;
        self.roles
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Role {id}")))
    }

    async fn with_roles(&self, user: User) -> ServiceResult<UserProfile> {
        let roles = self.links.roles_for(user.id).await?;
        Ok(UserProfile::from_parts(user, roles))
    }

    /// Register an account with a server-generated password.
    ///
    /// Returns the email and the plaintext password; only the hash is stored.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<Registration> {
        request.validate()?;
        let email = normalize_email(&request.email);

        if self.users.email_exists(&email).await? {
            return Err(ServiceError::conflict(format!(
                "Email '{email}' is already registered"
            )));
        }

        let password = self.generator.generate();
        let new_user = NewUser {
            name: request.name.trim().to_string(),
            slug: slug_from_email(&email),
            email: email.clone(),
            password_hash: self.hasher.hash(&password)?,
            bio: non_empty(request.bio),
            image: non_empty(request.image),
        };

        let user = self.users.create(new_user).await.map_err(|e| {
            ServiceError::from_write(e, format!("An account for '{email}' already exists"))
        })?;
        info!(user_id = user.id, slug = %user.slug, "Registered user");

        Ok(Registration {
            user: user.email,
            password,
        })
    }

    /// Check credentials and return the profile a token is issued for.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<UserProfile> {
        let email = normalize_email(email);
        let Some(user) = self.users.get_by_email(&email).await? else {
            warn!("Login attempt for unknown email");
            return Err(ServiceError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash) {
            warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        self.with_roles(user).await
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, id: i64) -> ServiceResult<UserProfile> {
        let user = self.load(id).await?;
        self.with_roles(user).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: PageQuery) -> ServiceResult<Page<UserSummary>> {
        let query = query.checked()?;
        let total = self.users.count().await?;
        let items = self.users.list(query.limit(), query.offset()).await?;
        Ok(Page::new(query, total, items))
    }

    /// Patch the caller's own account. The slug keeps its original value.
    #[instrument(skip(self, request))]
    pub async fn edit_account(
        &self,
        id: i64,
        request: EditAccountRequest,
    ) -> ServiceResult<UserProfile> {
        request.validate()?;
        let mut user = self.load(id).await?;

        if let Some(name) = non_empty(request.name) {
            user.name = name.trim().to_string();
        }
        if let Some(email) = non_empty(request.email) {
            let email = normalize_email(&email);
            if !email.validate_email() {
                return Err(ServiceError::validation(
                    "email: must be a valid email address",
                ));
            }
            user.email = email;
        }
        if let Some(bio) = non_empty(request.bio) {
            user.bio = Some(bio);
        }
        if let Some(image) = non_empty(request.image) {
            user.image = Some(image);
        }
        if let Some(password) = non_empty(request.password) {
            user.password_hash = self.hasher.hash(&password)?;
        }

        let updated = self.users.update(&user).await.map_err(|e| {
            ServiceError::from_write(e, format!("Email '{}' is already registered", user.email))
        })?;
        if !updated {
            return Err(ServiceError::not_found(format!("User {id}")));
        }

        info!(user_id = id, "Updated account");
        self.with_roles(user).await
    }

    /// Delete a user and return its last-known profile. Posts and role links
    /// cascade.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> ServiceResult<UserProfile> {
        let profile = self.get_profile(id).await?;
        self.users.delete(id).await?;
        info!(user_id = id, "Deleted user");
        Ok(profile)
    }

    /// Grant a role. Granting a role already held is a no-op.
    #[instrument(skip(self))]
    pub async fn add_role(&self, user_id: i64, role_id: i64) -> ServiceResult<UserRoles> {
        let user = self.load(user_id).await?;
        let role = self.load_role(role_id).await?;

        if self.links.link(user.id, role.id).await? {
            info!(user_id, role = %role.slug, "Granted role");
        }

        Ok(self.with_roles(user).await?.into())
    }

    /// Revoke a role. Revoking a role not held is a no-op.
    #[instrument(skip(self))]
    pub async fn remove_role(&self, user_id: i64, role_id: i64) -> ServiceResult<UserRoles> {
        let user = self.load(user_id).await?;
        let role = self.load_role(role_id).await?;

        if self.links.unlink(user.id, role.id).await? {
            info!(user_id, role = %role.slug, "Revoked role");
        }

        Ok(self.with_roles(user).await?.into())
    }

    /// Grant a role by slug, for bootstrapping accounts from the CLI.
    #[instrument(skip(self))]
    pub async fn add_role_by_slug(&self, user_id: i64, slug: &str) -> ServiceResult<UserRoles> {
        let role = self
            .roles
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Role '{slug}'")))?;
        self.add_role(user_id, role.id).await
    }

    /// Look up an account id by email.
    pub async fn find_id_by_email(&self, email: &str) -> ServiceResult<Option<i64>> {
        Ok(self
            .users
            .get_by_email(&normalize_email(email))
            .await?
            .map(|u| u.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ADMIN_ROLE, AUTHOR_ROLE, PasswordPolicy};
    use crate::db::Database;

    async fn setup() -> (Database, UserService) {
        let db = Database::in_memory().await.unwrap();
        let svc = UserService::new(
            db.pool().clone(),
            PasswordHasher::new(4),
            PasswordGenerator::new(PasswordPolicy::default()),
        );
        (db, svc)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Jane Doe".into(),
            email: email.into(),
            password: Some("client-chosen".into()),
            bio: None,
            image: None,
        }
    }

    async fn role_id(db: &Database, slug: &str) -> i64 {
        sqlx::query_scalar("SELECT id FROM roles WHERE slug = ?")
            .bind(slug)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_generates_password_that_verifies() {
        let (_db, svc) = setup().await;
        let reg = svc.register(register_request("Jane.Doe@Example.com")).await.unwrap();

        assert_eq!(reg.user, "jane.doe@example.com");
        assert_eq!(reg.password.len(), 25);
        assert_ne!(reg.password, "client-chosen");

        let profile = svc.authenticate(&reg.user, &reg.password).await.unwrap();
        assert_eq!(profile.slug, "jane-doe-example-com");
        assert!(profile.roles.is_empty());
        assert!(matches!(
            svc.authenticate(&reg.user, "client-chosen").await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let (_db, svc) = setup().await;
        svc.register(register_request("a@b.io")).await.unwrap();
        assert!(matches!(
            svc.register(register_request("A@B.io ")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_register_colliding_slug_conflicts() {
        let (_db, svc) = setup().await;
        svc.register(register_request("a.b@c.io")).await.unwrap();
        assert!(matches!(
            svc.register(register_request("a-b@c.io")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_email() {
        let (_db, svc) = setup().await;
        assert!(matches!(
            svc.authenticate("nobody@example.com", "whatever").await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_add_role_idempotent_and_remove_noop() {
        let (db, svc) = setup().await;
        svc.register(register_request("r@x.io")).await.unwrap();
        let user_id = svc.find_id_by_email("r@x.io").await.unwrap().unwrap();
        let admin = role_id(&db, ADMIN_ROLE).await;
        let author = role_id(&db, AUTHOR_ROLE).await;

        let first = svc.add_role(user_id, admin).await.unwrap();
        let second = svc.add_role(user_id, admin).await.unwrap();
        assert_eq!(first.roles, second.roles);
        assert_eq!(second.roles.len(), 1);

        let removed = svc.remove_role(user_id, author).await.unwrap();
        assert_eq!(removed.roles.len(), 1);

        let removed = svc.remove_role(user_id, admin).await.unwrap();
        assert!(removed.roles.is_empty());
    }

    #[tokio::test]
    async fn test_role_assignment_errors() {
        let (db, svc) = setup().await;
        svc.register(register_request("e@x.io")).await.unwrap();
        let user_id = svc.find_id_by_email("e@x.io").await.unwrap().unwrap();
        let admin = role_id(&db, ADMIN_ROLE).await;

        assert!(matches!(
            svc.add_role(0, admin).await,
            Err(ServiceError::InvalidArgument(_))
        ));
        assert!(matches!(
            svc.add_role(user_id, -1).await,
            Err(ServiceError::InvalidArgument(_))
        ));
        assert!(matches!(
            svc.add_role(9999, admin).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.remove_role(user_id, 9999).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_account_patches_and_keeps_slug() {
        let (_db, svc) = setup().await;
        svc.register(register_request("old@x.io")).await.unwrap();
        let id = svc.find_id_by_email("old@x.io").await.unwrap().unwrap();

        let profile = svc
            .edit_account(
                id,
                EditAccountRequest {
                    name: Some(String::new()),
                    email: Some("New@X.io".into()),
                    bio: Some("Writes about Rust".into()),
                    image: None,
                    password: Some("a-new-password".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.email, "new@x.io");
        assert_eq!(profile.slug, "old-x-io");
        assert_eq!(profile.bio.as_deref(), Some("Writes about Rust"));
        assert!(svc.authenticate("new@x.io", "a-new-password").await.is_ok());
    }

    #[tokio::test]
    async fn test_edit_account_email_rules() {
        let (_db, svc) = setup().await;
        svc.register(register_request("one@x.io")).await.unwrap();
        svc.register(register_request("two@x.io")).await.unwrap();
        let id = svc.find_id_by_email("two@x.io").await.unwrap().unwrap();

        let taken = EditAccountRequest {
            email: Some("one@x.io".into()),
            ..Default::default()
        };
        assert!(matches!(
            svc.edit_account(id, taken).await,
            Err(ServiceError::Conflict(_))
        ));

        let invalid = EditAccountRequest {
            email: Some("nope".into()),
            ..Default::default()
        };
        assert!(matches!(
            svc.edit_account(id, invalid).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_account_rejects_passwords_bcrypt_would_truncate() {
        let (_db, svc) = setup().await;
        svc.register(register_request("long@x.io")).await.unwrap();
        let id = svc.find_id_by_email("long@x.io").await.unwrap().unwrap();

        // 100 characters, and 40 characters that encode to 80 bytes.
        for password in ["p".repeat(100), "é".repeat(40)] {
            let request = EditAccountRequest {
                password: Some(password),
                ..Default::default()
            };
            assert!(matches!(
                svc.edit_account(id, request).await,
                Err(ServiceError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_delete_user_cascades_role_links() {
        let (db, svc) = setup().await;
        svc.register(register_request("gone@x.io")).await.unwrap();
        let id = svc.find_id_by_email("gone@x.io").await.unwrap().unwrap();
        svc.add_role_by_slug(id, AUTHOR_ROLE).await.unwrap();

        let deleted = svc.delete_user(id).await.unwrap();
        assert_eq!(deleted.role_slugs(), vec![AUTHOR_ROLE]);

        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_roles WHERE user_id = ?")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(links, 0);
        assert!(matches!(
            svc.get_profile(id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_pages_with_full_total() {
        let (_db, svc) = setup().await;
        for i in 0..12 {
            svc.register(register_request(&format!("p{i:02}@x.io")))
                .await
                .unwrap();
        }

        let page = svc.list(PageQuery::new(1, 5)).await.unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].email, "p05@x.io");
        assert!(svc.list(PageQuery::new(-1, 5)).await.is_err());
    }
}
