use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{LoginRequest, PasswordResetConfirm, PasswordResetRequest, RefreshRequest, RegisterRequest},
        MessageResponse,
    },
    middleware::Ctx,
    utils::ValidatedJson,
    AppState,
};

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state
        .auth_service
        .register(&req.email, &req.password, req.first_name, req.last_name)
        .await?;
    Ok((StatusCode::CREATED, Json(res)))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.login(&req.email, &req.password).await?;
    Ok((StatusCode::OK, Json(res)))
}

pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.auth_service.refresh(&req.refresh_token).await?;
    Ok((StatusCode::OK, Json(tokens)))
}

pub async fn logout(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.logout(&ctx).await?;
    Ok((StatusCode::OK, Json(MessageResponse::new("Logged out successfully"))))
}

/// Same response whether or not the email is registered.
pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.send_password_reset(&req.email).await?;
    Ok((
        StatusCode::OK,
        Json(MessageResponse::new(
            "If an account exists for this email, a password reset link has been sent",
        )),
    ))
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PasswordResetConfirm>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth_service
        .reset_password(&req.token, &req.new_password)
        .await?;
    Ok((StatusCode::OK, Json(MessageResponse::new("Password has been reset"))))
}
