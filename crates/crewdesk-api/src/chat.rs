use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use crewdesk_chat::ChatError;
use crewdesk_db::queries::Page;
use crewdesk_types::api::{Envelope, MarkReadResponse, SendMessageRequest};
use crewdesk_types::models::{ChatKind, Identity};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Id-cursor alternative to `offset`: pass the lowest message id from
    /// the previous page to fetch strictly older history without the page
    /// shifting under concurrent sends.
    pub before: Option<i64>,
}

fn default_limit() -> u32 {
    30
}

impl HistoryQuery {
    fn page(&self) -> Page {
        Page {
            offset: self.offset,
            limit: self.limit.min(200),
            before: self.before,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub other_user_id: Option<i64>,
}

// -- Room chat --

/// GET /projects/{id}/chat — newest room message (peek).
pub async fn latest_room_message(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    state.guard.require_project(identity, project_id).await?;
    let messages = state.chat.latest_room_message(project_id).await?;
    Ok(Json(Envelope::ok(messages)))
}

/// GET /projects/{id}/chat/messages?offset&limit&before
pub async fn room_messages(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    state.guard.require_project(identity, project_id).await?;
    let messages = state.chat.list_room_messages(project_id, query.page()).await?;
    Ok(Json(Envelope::ok(messages)))
}

/// POST /projects/{id}/chat
pub async fn send_room_message(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.guard.require_project(identity, project_id).await?;
    let message = state
        .chat
        .send_room_message(project_id, identity.member_id, req.message, req.content_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok_with_message(message, "Message sent successfully")),
    ))
}

/// GET /projects/{id}/chat/pin
pub async fn pinned_room_messages(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    state.guard.require_project(identity, project_id).await?;
    let messages = state.chat.list_pinned_room_messages(project_id).await?;
    Ok(Json(Envelope::ok(messages)))
}

/// GET /projects/{id}/chat-search?query&other_user_id — searches the room
/// stream, or the private stream when other_user_id is present.
pub async fn search_messages(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Query(query): Query<SearchQuery>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    state.guard.require_project(identity, project_id).await?;

    if let Some(other) = query.other_user_id {
        let messages = state
            .chat
            .search_private_messages(project_id, identity.member_id, other, query.query)
            .await?;
        Ok(Json(Envelope::ok(messages)).into_response())
    } else {
        let messages = state.chat.search_room_messages(project_id, query.query).await?;
        Ok(Json(Envelope::ok(messages)).into_response())
    }
}

// -- Private chat --

/// GET /projects/{id}/chat-private/{other} — newest private message (peek).
pub async fn latest_private_message(
    State(state): State<AppState>,
    Path((project_id, other_id)): Path<(i64, i64)>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    state.guard.require_project(identity, project_id).await?;
    let messages = state
        .chat
        .latest_private_message(project_id, identity.member_id, other_id)
        .await?;
    Ok(Json(Envelope::ok(messages)))
}

/// GET /projects/{id}/chat-private/{other}/messages?offset&limit&before
pub async fn private_messages(
    State(state): State<AppState>,
    Path((project_id, other_id)): Path<(i64, i64)>,
    Query(query): Query<HistoryQuery>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    state.guard.require_project(identity, project_id).await?;
    let messages = state
        .chat
        .list_private_messages(project_id, identity.member_id, other_id, query.page())
        .await?;
    Ok(Json(Envelope::ok(messages)))
}

/// POST /projects/{id}/chat-private/{other}
pub async fn send_private_message(
    State(state): State<AppState>,
    Path((project_id, other_id)): Path<(i64, i64)>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.guard.require_project(identity, project_id).await?;
    let message = state
        .chat
        .send_private_message(project_id, identity.member_id, other_id, req.message, req.content_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok_with_message(message, "Message sent successfully")),
    ))
}

/// GET /projects/{id}/chat-private/{other}/pin
pub async fn pinned_private_messages(
    State(state): State<AppState>,
    Path((project_id, other_id)): Path<(i64, i64)>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    state.guard.require_project(identity, project_id).await?;
    let messages = state
        .chat
        .list_pinned_private_messages(project_id, identity.member_id, other_id)
        .await?;
    Ok(Json(Envelope::ok(messages)))
}

// -- Read / pin state --

/// POST /mark-as-read/{message_id} — read watermark for the caller's own
/// private messages; scoped by the receiver predicate, so no project guard.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.chat.mark_read(identity.member_id, message_id).await?;
    Ok(Json(Envelope::ok_with_message(
        MarkReadResponse { updated },
        "Message marked as read",
    )))
}

/// POST /message/{id}/pin/{kind} — kind ∈ {room, private}.
pub async fn pin_message(
    State(state): State<AppState>,
    Path((message_id, kind)): Path<(i64, String)>,
    Extension(_identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    set_important(&state, message_id, &kind, true).await?;
    Ok(Json(Envelope::message("Message pinned")))
}

/// POST /message/{id}/unpin/{kind}
pub async fn unpin_message(
    State(state): State<AppState>,
    Path((message_id, kind)): Path<(i64, String)>,
    Extension(_identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    set_important(&state, message_id, &kind, false).await?;
    Ok(Json(Envelope::message("Message unpinned")))
}

async fn set_important(
    state: &AppState,
    message_id: i64,
    kind: &str,
    important: bool,
) -> Result<(), ApiError> {
    let kind: ChatKind = kind
        .parse()
        .map_err(|_| ChatError::validation("kind must be 'room' or 'private'"))?;
    if state.chat.set_important(kind, message_id, important).await? {
        Ok(())
    } else {
        Err(ApiError(ChatError::NotFound("message")))
    }
}
