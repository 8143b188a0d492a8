use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::data::RecordDataRequest, middleware::Ctx, models::RecordQuery, utils::ValidatedJson,
    AppState,
};

pub async fn get_record(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path((entity, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.data_service.get_record(&ctx, &entity, &id).await?;
    Ok(Json(record))
}

pub async fn query_records(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(entity): Path<String>,
    Json(query): Json<RecordQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .data_service
        .query_records(&ctx, &entity, &query)
        .await?;
    Ok(Json(page))
}

pub async fn create_record(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(entity): Path<String>,
    ValidatedJson(req): ValidatedJson<RecordDataRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .data_service
        .create_record(&ctx, &entity, &req.data)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_record(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path((entity, id)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<RecordDataRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .data_service
        .update_record(&ctx, &entity, &id, &req.data)
        .await?;
    Ok(Json(record))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path((entity, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .data_service
        .delete_record(&ctx, &entity, &id)
        .await?;
    Ok(Json(outcome))
}
