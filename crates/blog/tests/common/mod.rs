//! Test utilities and common setup.
#![allow(dead_code)]

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use blog::api::{self, AppState};
use blog::auth::{AuthConfig, AuthState};
use blog::db::Database;
use blog::user::RegisterRequest;
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";

/// Create a test AuthConfig with a fast bcrypt cost.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: Some(TEST_SECRET.to_string()),
        bcrypt_cost: 4,
        ..AuthConfig::default()
    }
}

/// Router plus direct access to the services behind it.
#[derive(Clone)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub db: Database,
}

pub async fn test_app() -> TestApp {
    let db = Database::in_memory()
        .await
        .expect("Failed to create in-memory database");
    let auth = AuthState::new(test_auth_config()).expect("valid test auth config");
    let state = AppState::new(&db, auth, Duration::from_secs(60));
    let router = api::create_router(state.clone(), 2);
    TestApp { router, state, db }
}

/// Response status, headers and parsed JSON body (`Null` when empty).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().uri(uri).method(method);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            json,
        }
    }

    /// Register through the service layer and return the generated password.
    pub async fn register(&self, name: &str, email: &str) -> String {
        self.state
            .users
            .register(RegisterRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: None,
                bio: None,
                image: None,
            })
            .await
            .expect("registration")
            .password
    }

    /// Register, grant `role` (if any), and log in through the API.
    pub async fn user_token(&self, name: &str, email: &str, role: Option<&str>) -> String {
        let password = self.register(name, email).await;
        if let Some(role) = role {
            let id = self
                .state
                .users
                .find_id_by_email(email)
                .await
                .unwrap()
                .expect("registered user");
            self.state.users.add_role_by_slug(id, role).await.unwrap();
        }
        self.login(email, &password).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .request(
                Method::POST,
                "/v1/accounts/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.json);
        res.json["token"].as_str().expect("token").to_string()
    }

    pub async fn user_id(&self, email: &str) -> i64 {
        self.state
            .users
            .find_id_by_email(email)
            .await
            .unwrap()
            .expect("registered user")
    }

    pub async fn count_rows(&self, sql: &str, id: i64) -> i64 {
        sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(self.db.pool())
            .await
            .unwrap()
    }

    pub async fn admin_token(&self) -> String {
        self.user_token("Admin", "admin@example.com", Some("admin"))
            .await
    }
}
