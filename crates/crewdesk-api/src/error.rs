use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crewdesk_chat::ChatError;
use crewdesk_types::api::Envelope;
use tracing::error;

/// Wraps the service taxonomy so handlers can `?` straight through while the
/// envelope and status mapping stays in one place.
pub struct ApiError(pub ChatError);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            ChatError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            // Generic body: authorization failures must not reveal whether
            // the entity exists.
            ChatError::Unauthorized => (StatusCode::FORBIDDEN, "Unauthorized".to_string()),
            ChatError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ChatError::Internal(e) => {
                error!("internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(Envelope::failure(message))).into_response()
    }
}
