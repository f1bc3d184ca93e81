use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AttachmentKind, MediaKind};

// -- Response envelope --

/// Uniform envelope for every REST response:
/// `{ "success": bool, "data": ..., "message": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), message: None }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self { success: true, data: Some(data), message: Some(message.into()) }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self { success: true, data: None, message: Some(message.into()) }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, data: None, message: Some(message.into()) }
    }
}

// -- Hydrated message projections --

/// Sender/receiver profile summary inlined into message payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub member_id: i64,
    pub full_name: String,
    pub email: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceView {
    pub resource_id: i64,
    pub file_name: String,
    pub path: String,
    pub kind: MediaKind,
    pub size: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMessageView {
    pub message_id: i64,
    pub project_id: i64,
    pub body: Option<String>,
    pub is_important: bool,
    pub created_at: DateTime<Utc>,
    pub sender: Option<MemberSummary>,
    pub resources: Vec<ResourceView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateMessageView {
    pub message_id: i64,
    pub project_id: i64,
    pub body: Option<String>,
    pub is_read: bool,
    pub is_important: bool,
    pub created_at: DateTime<Utc>,
    pub sender: Option<MemberSummary>,
    pub receiver: Option<MemberSummary>,
    pub resources: Vec<ResourceView>,
}

// -- Requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub message: Option<String>,
    pub content_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateContainerRequest {
    pub kind: AttachmentKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateContainerResponse {
    pub content_id: i64,
}

/// Metadata for a blob the external store has already persisted; this API
/// only records the reference.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttachResourceRequest {
    pub path: String,
    pub file_name: String,
    pub kind: MediaKind,
    pub size: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_absent_fields() {
        let json = serde_json::to_string(&Envelope::ok(5)).unwrap();
        assert_eq!(json, r#"{"success":true,"data":5}"#);

        let json = serde_json::to_string(&Envelope::failure("Unauthorized")).unwrap();
        assert_eq!(json, r#"{"success":false,"message":"Unauthorized"}"#);
    }

    #[test]
    fn send_request_rejects_unknown_fields() {
        let err = serde_json::from_str::<SendMessageRequest>(r#"{"text":"hi"}"#);
        assert!(err.is_err());

        let ok: SendMessageRequest =
            serde_json::from_str(r#"{"message":"hi","content_id":null}"#).unwrap();
        assert_eq!(ok.message.as_deref(), Some("hi"));
        assert!(ok.content_id.is_none());
    }
}
