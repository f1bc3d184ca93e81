use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use crewdesk_db::models::{MemberRow, PrivateMessageRow, RoomMessageRow};
use crewdesk_db::queries::Page;
use crewdesk_db::Database;
use crewdesk_gateway::dispatcher::Dispatcher;
use crewdesk_types::api::{MemberSummary, PrivateMessageView, ResourceView, RoomMessageView};
use crewdesk_types::events::GatewayEvent;
use crewdesk_types::models::ChatKind;
use tracing::warn;

use crate::error::ChatError;
use crate::linker::resource_view;
use crate::run_blocking;

/// Business logic for both chat surfaces. Persistence commits before the
/// fan-out publish; a missed push is never an error because clients catch up
/// by paging.
pub struct ChatService {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl ChatService {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    // -- Room chat --

    /// Most recent `page.limit` messages starting `page.offset` back from
    /// the newest, returned oldest-first for direct append to a UI.
    pub async fn list_room_messages(
        &self,
        project_id: i64,
        page: Page,
    ) -> Result<Vec<RoomMessageView>, ChatError> {
        let mut views = run_blocking(&self.db, move |db| {
            let rows = db.list_room_messages(project_id, page)?;
            room_views(db, rows)
        })
        .await?;
        views.reverse();
        Ok(views)
    }

    /// Peek at the newest room message, if any.
    pub async fn latest_room_message(
        &self,
        project_id: i64,
    ) -> Result<Vec<RoomMessageView>, ChatError> {
        self.list_room_messages(project_id, Page::latest(1)).await
    }

    pub async fn send_room_message(
        &self,
        project_id: i64,
        sender_id: i64,
        body: Option<String>,
        content_id: Option<i64>,
    ) -> Result<RoomMessageView, ChatError> {
        let body = normalize_body(body, content_id)?;

        let view = run_blocking(&self.db, move |db| {
            if let Some(content_id) = content_id {
                if db.get_content(content_id)?.is_none() {
                    return Ok(Err(ChatError::validation("content_id does not exist")));
                }
            }
            let message_id =
                db.insert_room_message(project_id, sender_id, body.as_deref(), content_id)?;
            let row = db
                .get_room_message(message_id)?
                .ok_or_else(|| anyhow!("inserted room message {} missing", message_id))?;
            let mut views = room_views(db, vec![row])?;
            Ok(Ok(views.remove(0)))
        })
        .await??;

        // Best-effort notification hint; the row above is already durable.
        self.dispatcher.broadcast(GatewayEvent::RoomMessageCreate {
            project_id,
            message: view.clone(),
        });

        Ok(view)
    }

    pub async fn list_pinned_room_messages(
        &self,
        project_id: i64,
    ) -> Result<Vec<RoomMessageView>, ChatError> {
        run_blocking(&self.db, move |db| {
            let rows = db.list_pinned_room_messages(project_id)?;
            room_views(db, rows)
        })
        .await
    }

    pub async fn search_room_messages(
        &self,
        project_id: i64,
        query: String,
    ) -> Result<Vec<RoomMessageView>, ChatError> {
        run_blocking(&self.db, move |db| {
            let rows = db.search_room_messages(project_id, &query)?;
            room_views(db, rows)
        })
        .await
    }

    // -- Private chat --

    pub async fn list_private_messages(
        &self,
        project_id: i64,
        user_a: i64,
        user_b: i64,
        page: Page,
    ) -> Result<Vec<PrivateMessageView>, ChatError> {
        let mut views = run_blocking(&self.db, move |db| {
            let rows = db.list_private_messages(project_id, user_a, user_b, page)?;
            private_views(db, rows)
        })
        .await?;
        views.reverse();
        Ok(views)
    }

    pub async fn latest_private_message(
        &self,
        project_id: i64,
        user_a: i64,
        user_b: i64,
    ) -> Result<Vec<PrivateMessageView>, ChatError> {
        self.list_private_messages(project_id, user_a, user_b, Page::latest(1))
            .await
    }

    pub async fn send_private_message(
        &self,
        project_id: i64,
        sender_id: i64,
        receiver_id: i64,
        body: Option<String>,
        content_id: Option<i64>,
    ) -> Result<PrivateMessageView, ChatError> {
        if sender_id == receiver_id {
            return Err(ChatError::validation("sender and receiver must differ"));
        }
        let body = normalize_body(body, content_id)?;

        let view = run_blocking(&self.db, move |db| {
            if !db.member_exists(receiver_id)? {
                return Ok(Err(ChatError::NotFound("member")));
            }
            if let Some(content_id) = content_id {
                if db.get_content(content_id)?.is_none() {
                    return Ok(Err(ChatError::validation("content_id does not exist")));
                }
            }
            let message_id = db.insert_private_message(
                project_id,
                sender_id,
                receiver_id,
                body.as_deref(),
                content_id,
            )?;
            let row = db
                .get_private_message(message_id)?
                .ok_or_else(|| anyhow!("inserted private message {} missing", message_id))?;
            let mut views = private_views(db, vec![row])?;
            Ok(Ok(views.remove(0)))
        })
        .await??;

        // Only the receiver is pushed to — the sender already holds the
        // message from this synchronous response.
        self.dispatcher
            .send_to_user(
                receiver_id,
                GatewayEvent::PrivateMessageCreate { message: view.clone() },
            )
            .await;

        Ok(view)
    }

    pub async fn list_pinned_private_messages(
        &self,
        project_id: i64,
        user_a: i64,
        user_b: i64,
    ) -> Result<Vec<PrivateMessageView>, ChatError> {
        run_blocking(&self.db, move |db| {
            let rows = db.list_pinned_private_messages(project_id, user_a, user_b)?;
            private_views(db, rows)
        })
        .await
    }

    pub async fn search_private_messages(
        &self,
        project_id: i64,
        user_a: i64,
        user_b: i64,
        query: String,
    ) -> Result<Vec<PrivateMessageView>, ChatError> {
        run_blocking(&self.db, move |db| {
            let rows = db.search_private_messages(project_id, user_a, user_b, &query)?;
            private_views(db, rows)
        })
        .await
    }

    // -- Read / pin state --

    /// Flip every private message addressed to `actor_id` with
    /// id <= `up_to` to read. Idempotent; returns rows actually updated.
    pub async fn mark_read(&self, actor_id: i64, up_to: i64) -> Result<usize, ChatError> {
        run_blocking(&self.db, move |db| db.mark_read(actor_id, up_to)).await
    }

    /// Set or clear the important flag. Returns false when the id does not
    /// exist. No conversation-level ownership check here — the guard already
    /// gated the caller at the project boundary.
    pub async fn set_important(
        &self,
        kind: ChatKind,
        message_id: i64,
        important: bool,
    ) -> Result<bool, ChatError> {
        run_blocking(&self.db, move |db| match kind {
            ChatKind::Room => db.set_room_important(message_id, important),
            ChatKind::Private => db.set_private_important(message_id, important),
        })
        .await
    }
}

// -- Hydration: rows -> wire DTOs --
// The fan-out payload is this same DTO, built here at send time, so the
// event shape is independent of the storage representation.

fn room_views(db: &Database, rows: Vec<RoomMessageRow>) -> anyhow::Result<Vec<RoomMessageView>> {
    let mut resources = resources_by_content(db, rows.iter().filter_map(|r| r.content_id))?;
    Ok(rows
        .into_iter()
        .map(|row| RoomMessageView {
            message_id: row.message_id,
            project_id: row.project_id,
            body: row.body,
            is_important: row.is_important,
            created_at: parse_timestamp(&row.created_at, row.message_id),
            sender: row.sender.map(member_summary),
            resources: row
                .content_id
                .and_then(|id| resources.remove(&id))
                .unwrap_or_default(),
        })
        .collect())
}

fn private_views(
    db: &Database,
    rows: Vec<PrivateMessageRow>,
) -> anyhow::Result<Vec<PrivateMessageView>> {
    let mut resources = resources_by_content(db, rows.iter().filter_map(|r| r.content_id))?;
    Ok(rows
        .into_iter()
        .map(|row| PrivateMessageView {
            message_id: row.message_id,
            project_id: row.project_id,
            body: row.body,
            is_read: row.is_read,
            is_important: row.is_important,
            created_at: parse_timestamp(&row.created_at, row.message_id),
            sender: row.sender.map(member_summary),
            receiver: row.receiver.map(member_summary),
            resources: row
                .content_id
                .and_then(|id| resources.remove(&id))
                .unwrap_or_default(),
        })
        .collect())
}

fn resources_by_content(
    db: &Database,
    content_ids: impl Iterator<Item = i64>,
) -> anyhow::Result<HashMap<i64, Vec<ResourceView>>> {
    let ids: Vec<i64> = content_ids.collect();
    let mut by_content: HashMap<i64, Vec<ResourceView>> = HashMap::new();
    for row in db.resources_for_contents(&ids)? {
        by_content
            .entry(row.content_id)
            .or_default()
            .push(resource_view(row));
    }
    Ok(by_content)
}

fn member_summary(row: MemberRow) -> MemberSummary {
    MemberSummary {
        member_id: row.member_id,
        full_name: row.full_name,
        email: row.email,
        avatar: row.avatar,
    }
}

fn parse_timestamp(raw: &str, message_id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("corrupt created_at '{}' on message {}: {}", raw, message_id, e);
            DateTime::default()
        })
}

fn normalize_body(body: Option<String>, content_id: Option<i64>) -> Result<Option<String>, ChatError> {
    let body = body.filter(|b| !b.trim().is_empty());
    if body.is_none() && content_id.is_none() {
        return Err(ChatError::validation("message or content_id is required"));
    }
    Ok(body)
}
