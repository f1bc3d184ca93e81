use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use crewdesk_types::api::{
    AttachResourceRequest, CreateContainerRequest, CreateContainerResponse, Envelope,
};
use crewdesk_types::models::Identity;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /contents — create an attachment container ahead of the message (or
/// task) row that will own it.
pub async fn create_container(
    State(state): State<AppState>,
    Extension(_identity): Extension<Identity>,
    Json(req): Json<CreateContainerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content_id = state.linker.create_container(req.kind).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(CreateContainerResponse { content_id })),
    ))
}

/// POST /contents/{id}/resources — record a blob the external store already
/// persisted.
pub async fn attach_resource(
    State(state): State<AppState>,
    Path(content_id): Path<i64>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<AttachResourceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resource = state
        .linker
        .attach_resource(
            content_id,
            req.path,
            req.file_name,
            req.kind,
            req.size,
            identity.member_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(resource))))
}

/// GET /resources/{id} — metadata only. Skips the membership check; this is
/// the one exception among the chat routes. Callers that need gating use the
/// download route below.
pub async fn get_resource(
    State(state): State<AppState>,
    Path(resource_id): Path<i64>,
    Extension(_identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let resource = state.linker.get_resource(resource_id).await?;
    Ok(Json(Envelope::ok(resource)))
}

/// GET /resources/{id}/download — membership-gated via the ownership chain.
/// The blob itself lives in the external store; this returns the reference
/// record the caller fetches with.
pub async fn download_resource(
    State(state): State<AppState>,
    Path(resource_id): Path<i64>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = state.linker.resolve_owning_project(resource_id).await?;
    state.guard.require_project(identity, project_id).await?;
    let resource = state.linker.get_resource(resource_id).await?;
    Ok(Json(Envelope::ok(resource)))
}
