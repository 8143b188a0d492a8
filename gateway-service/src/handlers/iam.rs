use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::iam::{
        AcceptInviteRequest, CreateTenantRequest, InviteUserRequest, TenantUsersQuery,
        UpdateMeRequest, UpdateTenantRequest,
    },
    middleware::Ctx,
    utils::ValidatedJson,
    AppState,
};

const DEFAULT_PAGE_SIZE: u32 = 20;

pub async fn create_tenant(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ValidatedJson(req): ValidatedJson<CreateTenantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tenant = state.iam_service.create_own_tenant(&ctx, &req.name).await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

pub async fn my_tenants(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> Result<impl IntoResponse, AppError> {
    let tenants = state.iam_service.my_tenants(&ctx).await?;
    Ok(Json(tenants))
}

pub async fn update_tenant(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ValidatedJson(req): ValidatedJson<UpdateTenantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tenant = state.iam_service.update_tenant(&ctx, &req.name).await?;
    Ok(Json(tenant))
}

pub async fn tenant_users(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Query(query): Query<TenantUsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let page = state
        .iam_service
        .tenant_users(
            &ctx,
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            query.pagination_token.as_deref(),
        )
        .await?;
    Ok(Json(page))
}

pub async fn invite_user(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ValidatedJson(req): ValidatedJson<InviteUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .iam_service
        .invite_user(&ctx, &req.email, &req.role_name)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn accept_invite(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ValidatedJson(req): ValidatedJson<AcceptInviteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invite = state.iam_service.accept_invite(&ctx, &req.token).await?;
    Ok(Json(invite))
}

pub async fn get_me(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> Result<impl IntoResponse, AppError> {
    let user = state.iam_service.me(&ctx).await?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ValidatedJson(req): ValidatedJson<UpdateMeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (update, current_password) = req.into_parts();
    let res = state
        .iam_service
        .update_me(&ctx, update, current_password.as_deref())
        .await?;
    Ok(Json(res))
}
