/// User resource handlers
///
/// Creation is open to anyone (self-registration). Retrieval and updates are
/// limited to the user themselves or staff; listing and deletion are staff
/// only. Every write runs the full validation pipeline before touching the
/// database, and avatar post-processing happens after the record is saved so
/// an unreadable image can never fail the request.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use uuid::Uuid;
use validator::Validate;

use rosterd_shared::auth::password::hash_password;
use rosterd_shared::media::store::save_avatar;
use rosterd_shared::models::{CreateUser, Membership, UpdateUser, User};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult, FieldError};
use crate::policy::{user_action, Action, Caller};
use crate::schemas::{AvatarUpload, UserCreateRequest, UserDetail, UserUpdateRequest};
use crate::validation;

/// Decodes an inline avatar upload and writes it under the media root
///
/// Returns the media-relative path to store on the user record.
fn store_avatar(state: &AppState, upload: &AvatarUpload) -> ApiResult<String> {
    let bytes = BASE64.decode(&upload.data).map_err(|_| {
        ApiError::ValidationError(vec![FieldError::new(
            "avatar",
            "Avatar data is not valid base64",
        )])
    })?;

    save_avatar(&state.config.media, &upload.filename, &bytes)
        .map_err(|e| ApiError::InternalError(format!("Failed to store avatar: {}", e)))
}

/// Runs avatar normalization after the record is saved
///
/// Normalization is best-effort: the upload already succeeded, and a broken
/// image only costs us the resize, not the request. The image work happens
/// on the blocking pool so it doesn't stall other requests.
async fn post_process(state: &AppState, relative: String) {
    let config = state.config.clone();
    let result = tokio::task::spawn_blocking(move || {
        rosterd_shared::media::resize::post_process_avatar(&config.media, &relative);
    })
    .await;

    if let Err(e) = result {
        tracing::warn!("Avatar post-processing task failed: {}", e);
    }
}

async fn user_detail(state: &AppState, user: User) -> ApiResult<UserDetail> {
    let organizations = Membership::organizations_for_user(&state.db, user.id).await?;
    Ok(UserDetail::from_user(user, organizations, &state.config))
}

/// POST /api/users/
pub async fn create_user(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    Json(request): Json<UserCreateRequest>,
) -> ApiResult<(StatusCode, Json<UserDetail>)> {
    let caller = caller.map(|Extension(c)| c);
    user_action(caller.as_ref(), Action::Create, None).require()?;

    let mut errors = Vec::new();
    if let Err(derive_errors) = request.validate() {
        errors.extend(validation::collect_field_errors(&derive_errors));
    }

    let email = validation::normalize_email(&request.email);
    validation::validate_phone(&request.phone, &mut errors);
    validation::validate_password(&request.password, &mut errors);
    if let Some(avatar) = &request.avatar {
        validation::validate_avatar_content(avatar, &mut errors);
    }
    validation::validate_email_unique(&state.db, &email, None, &mut errors).await?;
    validation::validate_organization_ids(&state.db, &request.organization_ids, &mut errors)
        .await?;
    validation::finish(errors)?;

    let password_hash = hash_password(&request.password)?;

    let avatar_path = match &request.avatar {
        Some(upload) => Some(store_avatar(&state, upload)?),
        None => None,
    };

    let user = User::create_with_memberships(
        &state.db,
        CreateUser {
            email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            avatar: avatar_path.clone(),
            is_staff: false,
            is_superuser: false,
        },
        &request.organization_ids,
    )
    .await?;

    if let Some(path) = avatar_path {
        post_process(&state, path).await;
    }

    tracing::info!(user_id = %user.id, "User created");

    let detail = user_detail(&state, user).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/users/
pub async fn list_users(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
) -> ApiResult<Json<Vec<UserDetail>>> {
    let caller = caller.map(|Extension(c)| c);
    user_action(caller.as_ref(), Action::List, None).require()?;

    let users = User::list(&state.db).await?;

    let mut details = Vec::with_capacity(users.len());
    for user in users {
        details.push(user_detail(&state, user).await?);
    }

    Ok(Json(details))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserDetail>> {
    let caller = caller.map(|Extension(c)| c);
    user_action(caller.as_ref(), Action::Retrieve, Some(id)).require()?;

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user_detail(&state, user).await?))
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UserUpdateRequest>,
) -> ApiResult<Json<UserDetail>> {
    apply_update(state, caller, id, request, Action::Update).await
}

/// PATCH /api/users/:id
pub async fn patch_user(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UserUpdateRequest>,
) -> ApiResult<Json<UserDetail>> {
    apply_update(state, caller, id, request, Action::PartialUpdate).await
}

/// Shared update path for PUT and PATCH
///
/// Both verbs apply only the provided fields; a present `organization_ids`
/// replaces the entire membership set, including `[]` which clears it.
async fn apply_update(
    state: AppState,
    caller: Option<Extension<Caller>>,
    id: Uuid,
    request: UserUpdateRequest,
    action: Action,
) -> ApiResult<Json<UserDetail>> {
    let caller = caller.map(|Extension(c)| c);
    user_action(caller.as_ref(), action, Some(id)).require()?;

    let mut errors = Vec::new();
    if let Err(derive_errors) = request.validate() {
        errors.extend(validation::collect_field_errors(&derive_errors));
    }

    let email = request.email.as_deref().map(validation::normalize_email);
    if let Some(email) = &email {
        validation::validate_email_unique(&state.db, email, Some(id), &mut errors).await?;
    }
    if let Some(phone) = &request.phone {
        validation::validate_phone(phone, &mut errors);
    }
    if let Some(password) = &request.password {
        validation::validate_password(password, &mut errors);
    }
    if let Some(avatar) = &request.avatar {
        validation::validate_avatar_content(avatar, &mut errors);
    }
    if let Some(organization_ids) = &request.organization_ids {
        validation::validate_organization_ids(&state.db, organization_ids, &mut errors).await?;
    }
    validation::finish(errors)?;

    let password_hash = match &request.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let avatar_path = match &request.avatar {
        Some(upload) => Some(store_avatar(&state, upload)?),
        None => None,
    };

    let update = UpdateUser {
        email,
        password_hash,
        first_name: request.first_name,
        last_name: request.last_name,
        phone: request.phone,
        avatar: avatar_path.clone(),
    };

    let user = User::update_with_memberships(
        &state.db,
        id,
        update,
        request.organization_ids.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if let Some(path) = avatar_path {
        post_process(&state, path).await;
    }

    tracing::info!(user_id = %user.id, "User updated");

    Ok(Json(user_detail(&state, user).await?))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let caller = caller.map(|Extension(c)| c);
    user_action(caller.as_ref(), Action::Destroy, Some(id)).require()?;

    let deleted = User::delete(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}
