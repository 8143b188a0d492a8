use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::mfa::{DeviceRequest, VerifyCodeRequest, VerifyDeviceRequest},
    middleware::Ctx,
    utils::ValidatedJson,
    AppState,
};

pub async fn list_devices(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> Result<impl IntoResponse, AppError> {
    let devices = state.mfa_service.list_totp_devices(&ctx).await?;
    Ok(Json(devices))
}

pub async fn create_device(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ValidatedJson(req): ValidatedJson<DeviceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let device = state
        .mfa_service
        .create_totp_device(&ctx, &req.device_name)
        .await?;
    Ok((StatusCode::CREATED, Json(device)))
}

pub async fn verify_device(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ValidatedJson(req): ValidatedJson<VerifyDeviceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state
        .mfa_service
        .verify_totp_device(&ctx, &req.device_name, &req.code)
        .await?;
    Ok(Json(res))
}

pub async fn remove_device(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(device_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let res = state
        .mfa_service
        .remove_totp_device(&ctx, &device_name)
        .await?;
    Ok(Json(res))
}

pub async fn verify(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ValidatedJson(req): ValidatedJson<VerifyCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.mfa_service.verify_mfa(&ctx, &req.code).await?;
    Ok(Json(res))
}
