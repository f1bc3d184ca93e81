use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use crewdesk_chat::ChatError;
use crewdesk_types::models::{Claims, Identity};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";
const ACTOR_HEADER: &str = "x-actor-id";

/// Resolve the caller to an explicit Identity, exactly once, before any
/// handler runs. Two paths:
///
/// 1. Privileged: `X-API-KEY` matching the shared system key plus an
///    asserted `X-ACTOR-ID`. The asserted id is trusted unconditionally —
///    this is the service-to-service trust boundary, not per-user auth.
/// 2. `Authorization: Bearer <jwt>` (HS256) resolving to a member id.
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = resolve_identity(&state, &req)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

fn resolve_identity(state: &AppState, req: &Request) -> Result<Identity, ApiError> {
    if let Some(system_key) = state.auth.api_key.as_deref() {
        let provided = header_str(req, API_KEY_HEADER);
        if provided == Some(system_key) {
            let actor = header_str(req, ACTOR_HEADER)
                .and_then(|v| v.parse::<i64>().ok())
                .ok_or_else(|| {
                    ApiError(ChatError::validation("X-ACTOR-ID must be a member id"))
                })?;
            return Ok(Identity { member_id: actor, privileged: true });
        }
    }

    let token = header_str(req, header::AUTHORIZATION.as_str())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError(ChatError::Unauthorized))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("rejected bearer token: {}", e);
        ApiError(ChatError::Unauthorized)
    })?;

    Ok(Identity { member_id: token_data.claims.sub, privileged: false })
}

fn header_str<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}
