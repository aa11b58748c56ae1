/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use rosterd_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = rosterd_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use crate::error::ApiError;
use crate::policy::Caller;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use rosterd_shared::auth::jwt;
use rosterd_shared::models::User;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                       # Health check (public)
/// ├── /media/*                      # Stored media files (read-only)
/// └── /api/
///     ├── POST /token               # Obtain access/refresh pair
///     ├── POST /token/refresh       # Refresh an access token
///     ├── /users/                   # User resource
///     │   ├── GET    /              # List (staff)
///     │   ├── POST   /              # Create (anyone)
///     │   ├── GET    /:id           # Retrieve (self or staff)
///     │   ├── PUT    /:id           # Update (self or staff)
///     │   ├── PATCH  /:id           # Partial update (self or staff)
///     │   └── DELETE /:id           # Destroy (staff)
///     └── /organizations/           # Organization resource
///         ├── GET    /              # List (anyone)
///         ├── POST   /              # Create (staff/superuser)
///         ├── GET    /:id           # Retrieve (anyone)
///         ├── PUT    /:id           # Update (staff/superuser)
///         ├── PATCH  /:id           # Partial update (staff/superuser)
///         └── DELETE /:id           # Destroy (staff/superuser)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Identity resolution (whole /api surface)
///
/// Identity resolution is optional: anonymous requests pass through with no
/// [`Caller`] extension, and each handler consults the policy module for the
/// action it performs. Per-handler checks rather than per-route auth walls
/// keep anonymous-allowed and authenticated actions on the same routes.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/", post(routes::users::create_user))
        .route("/:id", get(routes::users::get_user))
        .route("/:id", put(routes::users::update_user))
        .route("/:id", axum::routing::patch(routes::users::patch_user))
        .route("/:id", delete(routes::users::delete_user));

    let organization_routes = Router::new()
        .route("/", get(routes::organizations::list_organizations))
        .route("/", post(routes::organizations::create_organization))
        .route("/:id", get(routes::organizations::get_organization))
        .route("/:id", put(routes::organizations::update_organization))
        .route(
            "/:id",
            axum::routing::patch(routes::organizations::patch_organization),
        )
        .route("/:id", delete(routes::organizations::delete_organization));

    let token_routes = Router::new()
        .route("/", post(routes::token::obtain_token))
        .route("/refresh", post(routes::token::refresh_token));

    let api_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/organizations", organization_routes)
        .nest("/token", token_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            identity_layer,
        ));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .nest_service("/media", ServeDir::new(&state.config.media.root))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Identity resolution middleware
///
/// Validates a Bearer access token when one is present and attaches the
/// matching [`Caller`] to request extensions. Requests without an
/// Authorization header proceed anonymously; a header that is present but
/// invalid, or that names a missing or deactivated user, is rejected with
/// 401 rather than silently downgraded to anonymous.
async fn identity_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if let Some(header) = auth_header {
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::BadRequest("Expected Bearer token".to_string()))?;

        let claims = jwt::validate_access_token(token, state.jwt_secret())?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

        if !user.is_active {
            return Err(ApiError::Unauthorized("User account is inactive".to_string()));
        }

        req.extensions_mut().insert(Caller {
            id: user.id,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        });
    }

    Ok(next.run(req).await)
}
