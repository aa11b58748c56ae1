/// Token endpoints
///
/// `POST /api/token` verifies credentials and hands out an access/refresh
/// pair; `POST /api/token/refresh` exchanges a refresh token for a fresh
/// access token. Both are public routes.
///
/// Credential failures deliberately return the same message whether the
/// email is unknown, the password is wrong, or the account is inactive, so
/// the endpoint cannot be used to probe which emails are registered.

use axum::{extract::State, Json};

use rosterd_shared::auth::jwt::{create_token, refresh_access_token, Claims, TokenType};
use rosterd_shared::auth::password::verify_password;
use rosterd_shared::models::User;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::schemas::{TokenPair, TokenRefreshRequest, TokenRefreshResponse, TokenRequest};
use crate::validation::normalize_email;

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}

/// POST /api/token
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> ApiResult<Json<TokenPair>> {
    let email = normalize_email(&request.email);

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !user.is_active {
        return Err(invalid_credentials());
    }

    let valid = verify_password(&request.password, &user.password_hash)?;
    if !valid {
        return Err(invalid_credentials());
    }

    let access = create_token(&Claims::new(user.id, TokenType::Access), state.jwt_secret())?;
    let refresh = create_token(&Claims::new(user.id, TokenType::Refresh), state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "Issued token pair");

    Ok(Json(TokenPair { access, refresh }))
}

/// POST /api/token/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRefreshRequest>,
) -> ApiResult<Json<TokenRefreshResponse>> {
    let access = refresh_access_token(&request.refresh, state.jwt_secret())?;

    Ok(Json(TokenRefreshResponse { access }))
}
