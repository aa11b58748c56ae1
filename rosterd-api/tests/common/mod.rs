/// Common test utilities for integration tests
///
/// These tests need a running PostgreSQL instance. When `DATABASE_URL` is not
/// set the context constructor returns None and each test skips itself, so
/// the suite stays green on machines without the database.

use axum::body::Body;
use axum::http::{header, Request};
use rosterd_api::app::{build_router, AppState};
use rosterd_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use rosterd_shared::auth::jwt::{create_token, Claims, TokenType};
use rosterd_shared::auth::password::hash_password;
use rosterd_shared::media::MediaConfig;
use rosterd_shared::models::{CreateUser, User};
use sqlx::PgPool;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "Str0ng!Pass";

/// Test context holding the app, its database pool, and configuration
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    /// Creates a test context, or None when no test database is configured
    pub async fn try_new() -> Option<Self> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("DATABASE_URL not set; skipping integration test");
                return None;
            }
        };

        let media_root = std::env::temp_dir().join(format!("rosterd-test-{}", Uuid::new_v4()));

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                url: database_url.clone(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: "integration-test-secret-0123456789abcdef".to_string(),
            },
            media: MediaConfig {
                root: media_root,
                ..Default::default()
            },
            media_url: "/media".to_string(),
        };

        let db = PgPool::connect(&database_url).await.expect("database connection");

        // Path relative to Cargo.toml, not this file
        sqlx::migrate!("../rosterd-shared/migrations")
            .run(&db)
            .await
            .expect("migrations");

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Some(TestContext { db, app, config })
    }

    /// Creates a user directly in the database and returns it
    pub async fn create_user(&self, is_staff: bool) -> User {
        let password_hash = hash_password(TEST_PASSWORD).expect("hash password");

        User::create(
            &self.db,
            CreateUser {
                email: format!("test-{}@example.com", Uuid::new_v4()),
                password_hash,
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                phone: String::new(),
                avatar: None,
                is_staff,
                is_superuser: false,
            },
        )
        .await
        .expect("create test user")
    }

    /// Issues a valid access token for a user
    pub fn token_for(&self, user: &User) -> String {
        let claims = Claims::new(user.id, TokenType::Access);
        create_token(&claims, &self.config.jwt.secret).expect("create token")
    }
}

/// Builds a JSON request, optionally with a Bearer token
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::from(body.to_string())).expect("request")
}

/// Builds a bodyless request, optionally with a Bearer token
pub fn bare_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::empty()).expect("request")
}

/// Reads a response body as JSON
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse body")
}
