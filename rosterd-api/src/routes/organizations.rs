/// Organization resource handlers
///
/// Reads are public, including for anonymous callers. Mutations require a
/// staff or superuser caller. Detail responses nest the member users as
/// compact summaries.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use rosterd_shared::models::{CreateOrganization, Membership, Organization, UpdateOrganization};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::policy::{organization_action, Action, Caller};
use crate::schemas::{OrganizationCreateRequest, OrganizationDetail, OrganizationUpdateRequest};
use crate::validation;

async fn organization_detail(
    state: &AppState,
    organization: Organization,
) -> ApiResult<OrganizationDetail> {
    let users = Membership::users_for_organization(&state.db, organization.id).await?;
    Ok(OrganizationDetail::from_organization(organization, users))
}

/// POST /api/organizations/
pub async fn create_organization(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    Json(request): Json<OrganizationCreateRequest>,
) -> ApiResult<(StatusCode, Json<OrganizationDetail>)> {
    let caller = caller.map(|Extension(c)| c);
    organization_action(caller.as_ref(), Action::Create).require()?;

    if let Err(derive_errors) = request.validate() {
        validation::finish(validation::collect_field_errors(&derive_errors))?;
    }

    let organization = Organization::create(
        &state.db,
        CreateOrganization {
            name: request.name,
            description: request.description,
        },
    )
    .await?;

    tracing::info!(organization_id = %organization.id, "Organization created");

    let detail = organization_detail(&state, organization).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/organizations/
pub async fn list_organizations(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
) -> ApiResult<Json<Vec<OrganizationDetail>>> {
    let caller = caller.map(|Extension(c)| c);
    organization_action(caller.as_ref(), Action::List).require()?;

    let organizations = Organization::list(&state.db).await?;

    let mut details = Vec::with_capacity(organizations.len());
    for organization in organizations {
        details.push(organization_detail(&state, organization).await?);
    }

    Ok(Json(details))
}

/// GET /api/organizations/:id
pub async fn get_organization(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrganizationDetail>> {
    let caller = caller.map(|Extension(c)| c);
    organization_action(caller.as_ref(), Action::Retrieve).require()?;

    let organization = Organization::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    Ok(Json(organization_detail(&state, organization).await?))
}

/// PUT /api/organizations/:id
pub async fn update_organization(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<Uuid>,
    Json(request): Json<OrganizationUpdateRequest>,
) -> ApiResult<Json<OrganizationDetail>> {
    apply_update(state, caller, id, request, Action::Update).await
}

/// PATCH /api/organizations/:id
pub async fn patch_organization(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<Uuid>,
    Json(request): Json<OrganizationUpdateRequest>,
) -> ApiResult<Json<OrganizationDetail>> {
    apply_update(state, caller, id, request, Action::PartialUpdate).await
}

async fn apply_update(
    state: AppState,
    caller: Option<Extension<Caller>>,
    id: Uuid,
    request: OrganizationUpdateRequest,
    action: Action,
) -> ApiResult<Json<OrganizationDetail>> {
    let caller = caller.map(|Extension(c)| c);
    organization_action(caller.as_ref(), action).require()?;

    if let Err(derive_errors) = request.validate() {
        validation::finish(validation::collect_field_errors(&derive_errors))?;
    }

    let organization = Organization::update(
        &state.db,
        id,
        UpdateOrganization {
            name: request.name,
            description: request.description,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    tracing::info!(organization_id = %organization.id, "Organization updated");

    Ok(Json(organization_detail(&state, organization).await?))
}

/// DELETE /api/organizations/:id
pub async fn delete_organization(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let caller = caller.map(|Extension(c)| c);
    organization_action(caller.as_ref(), Action::Destroy).require()?;

    let deleted = Organization::delete(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Organization not found".to_string()));
    }

    tracing::info!(organization_id = %id, "Organization deleted");

    Ok(StatusCode::NO_CONTENT)
}
