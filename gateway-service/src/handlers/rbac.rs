use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        rbac::{AssignRoleRequest, PolicyRequest},
        MessageResponse,
    },
    middleware::Ctx,
    models::RolePolicy,
    utils::ValidatedJson,
    AppState,
};

pub async fn list_roles(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> Result<impl IntoResponse, AppError> {
    let roles = state.rbac_service.list_roles(&ctx).await?;
    Ok(Json(roles))
}

pub async fn get_role_policy(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(role): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let policy = state.rbac_service.get_role_policy(&ctx, &role).await?;
    Ok(Json(policy))
}

pub async fn my_permissions(State(state): State<AppState>, Ctx(ctx): Ctx) -> impl IntoResponse {
    Json(state.rbac_service.my_permissions(&ctx))
}

pub async fn create_policy(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ValidatedJson(req): ValidatedJson<PolicyRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .create_policy(&ctx, &req.role_name, &req.policy)
        .await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Role created"))))
}

pub async fn update_policy(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(role): Path<String>,
    Json(policy): Json<RolePolicy>,
) -> Result<impl IntoResponse, AppError> {
    state.rbac_service.update_policy(&ctx, &role, &policy).await?;
    Ok(Json(MessageResponse::new("Role updated")))
}

pub async fn delete_policy(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(role): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.rbac_service.delete_policy(&ctx, &role).await?;
    Ok(Json(MessageResponse::new("Role deleted")))
}

pub async fn assign_role(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ValidatedJson(req): ValidatedJson<AssignRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .assign_role(&ctx, &req.user_id, &req.role_name)
        .await?;
    Ok(Json(MessageResponse::new("Role assigned")))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .remove_user_from_tenant(&ctx, &user_id)
        .await?;
    Ok(Json(MessageResponse::new("User removed from tenant")))
}
