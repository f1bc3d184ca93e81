//! Database row types mapping directly to SQLite rows. Distinct from the
//! crewdesk-types API projections; the service builds the wire DTOs from
//! these.

#[derive(Debug, Clone)]
pub struct MemberRow {
    pub member_id: i64,
    pub full_name: String,
    pub email: String,
    pub avatar: Option<String>,
}

#[derive(Debug)]
pub struct RoomMessageRow {
    pub message_id: i64,
    pub project_id: i64,
    pub body: Option<String>,
    pub content_id: Option<i64>,
    pub is_important: bool,
    pub created_at: String,
    pub sender: Option<MemberRow>,
}

#[derive(Debug)]
pub struct PrivateMessageRow {
    pub message_id: i64,
    pub project_id: i64,
    pub body: Option<String>,
    pub content_id: Option<i64>,
    pub is_read: bool,
    pub is_important: bool,
    pub created_at: String,
    pub sender: Option<MemberRow>,
    pub receiver: Option<MemberRow>,
}

#[derive(Debug)]
pub struct ContentRow {
    pub content_id: i64,
    pub kind: String,
}

#[derive(Debug)]
pub struct ResourceRow {
    pub resource_id: i64,
    pub content_id: i64,
    pub path: String,
    pub kind: String,
    pub size: i64,
    pub file_name: String,
    pub uploaded_by: Option<i64>,
    pub created_at: String,
}
