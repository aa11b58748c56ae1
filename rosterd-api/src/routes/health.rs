/// Health check endpoint
///
/// Reports process liveness and database connectivity. Deployment probes and
/// load balancers hit this; it requires no authentication.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::ApiResult;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: "ok" or "degraded"
    pub status: String,

    /// Database connectivity
    pub database: String,

    /// Crate version
    pub version: String,
}

/// GET /health
///
/// Returns 200 even when the database check fails; the body distinguishes
/// "ok" from "degraded" so probes can decide what to do.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database = match rosterd_shared::db::health_check(&state.db).await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            "unavailable"
        }
    };

    let status = if database == "ok" { "ok" } else { "degraded" };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        database: database.to_string(),
        version: rosterd_shared::VERSION.to_string(),
    }))
}
