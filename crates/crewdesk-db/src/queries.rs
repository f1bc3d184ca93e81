use crate::models::{ContentRow, MemberRow, PrivateMessageRow, ResourceRow, RoomMessageRow};
use crate::Database;
use anyhow::Result;
use rusqlite::Row;

/// Page selector for history queries. `before` is an exclusive id cursor;
/// when set, only ids strictly below it are considered and `offset` applies
/// after the cursor. Raw offsets shift under concurrent sends, the cursor
/// does not.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
    pub before: Option<i64>,
}

impl Page {
    pub fn latest(limit: u32) -> Self {
        Self { offset: 0, limit, before: None }
    }
}

impl Database {
    // -- Members / projects (membership oracle data) --

    pub fn create_member(&self, full_name: &str, email: &str, avatar: Option<&str>) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO members (full_name, email, avatar) VALUES (?1, ?2, ?3)",
                rusqlite::params![full_name, email, avatar],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn member_exists(&self, member_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM members WHERE member_id = ?1)",
                [member_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn get_member(&self, member_id: i64) -> Result<Option<MemberRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT member_id, full_name, email, avatar FROM members WHERE member_id = ?1",
                [member_id],
                |row| {
                    Ok(MemberRow {
                        member_id: row.get(0)?,
                        full_name: row.get(1)?,
                        email: row.get(2)?,
                        avatar: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn create_project(&self, name: &str, owner_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (name, owner_id) VALUES (?1, ?2)",
                rusqlite::params![name, owner_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn add_project_member(&self, project_id: i64, member_id: i64, role: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO project_members (project_id, member_id, role)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![project_id, member_id, role],
            )?;
            Ok(())
        })
    }

    /// Owner or member row — a missing project is simply not accessible.
    pub fn is_project_member(&self, project_id: i64, member_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let ok: bool = conn.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM projects
                      WHERE project_id = ?1 AND owner_id = ?2)
                 OR EXISTS(
                     SELECT 1 FROM project_members
                      WHERE project_id = ?1 AND member_id = ?2)",
                [project_id, member_id],
                |row| row.get(0),
            )?;
            Ok(ok)
        })
    }

    pub fn create_task(&self, project_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO tasks (project_id) VALUES (?1)", [project_id])?;
            Ok(conn.last_insert_rowid())
        })
    }

    // -- Room messages --

    pub fn insert_room_message(
        &self,
        project_id: i64,
        sender_id: i64,
        body: Option<&str>,
        content_id: Option<i64>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO room_messages (project_id, sender_id, body, content_id)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![project_id, sender_id, body, content_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_room_message(&self, message_id: i64) -> Result<Option<RoomMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ROOM_SELECT} WHERE m.message_id = ?1"))?;
            stmt.query_row([message_id], map_room_row).optional()
        })
    }

    /// Newest-first page of a project room. The caller reverses for
    /// chronological display order.
    pub fn list_room_messages(&self, project_id: i64, page: Page) -> Result<Vec<RoomMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{ROOM_SELECT}
                 WHERE m.project_id = ?1 AND (?2 IS NULL OR m.message_id < ?2)
                 ORDER BY m.message_id DESC
                 LIMIT ?3 OFFSET ?4"
            ))?;
            let rows = stmt
                .query_map(
                    rusqlite::params![project_id, page.before, page.limit, page.offset],
                    map_room_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_pinned_room_messages(&self, project_id: i64) -> Result<Vec<RoomMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{ROOM_SELECT}
                 WHERE m.project_id = ?1 AND m.is_important = 1
                 ORDER BY m.message_id DESC"
            ))?;
            let rows = stmt
                .query_map([project_id], map_room_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Room search uses LIKE's default collation (case-insensitive for
    /// ASCII). Private search below is binary. The asymmetry is intentional
    /// and relied on by clients.
    pub fn search_room_messages(&self, project_id: i64, query: &str) -> Result<Vec<RoomMessageRow>> {
        let pattern = format!("%{}%", escape_like(query));
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{ROOM_SELECT}
                 WHERE m.project_id = ?1 AND m.body LIKE ?2 ESCAPE '\\'
                 ORDER BY m.message_id DESC"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![project_id, pattern], map_room_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_room_important(&self, message_id: i64, important: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE room_messages SET is_important = ?2 WHERE message_id = ?1",
                rusqlite::params![message_id, important],
            )?;
            Ok(n > 0)
        })
    }

    // -- Private messages --

    pub fn insert_private_message(
        &self,
        project_id: i64,
        sender_id: i64,
        receiver_id: i64,
        body: Option<&str>,
        content_id: Option<i64>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO private_messages (project_id, sender_id, receiver_id, body, content_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![project_id, sender_id, receiver_id, body, content_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_private_message(&self, message_id: i64) -> Result<Option<PrivateMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{PRIVATE_SELECT} WHERE m.message_id = ?1"))?;
            stmt.query_row([message_id], map_private_row).optional()
        })
    }

    /// The conversation key is the unordered pair {a, b} within a project:
    /// both directions match regardless of which side is querying.
    pub fn list_private_messages(
        &self,
        project_id: i64,
        user_a: i64,
        user_b: i64,
        page: Page,
    ) -> Result<Vec<PrivateMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{PRIVATE_SELECT}
                 WHERE m.project_id = ?1
                   AND ((m.sender_id = ?2 AND m.receiver_id = ?3)
                     OR (m.sender_id = ?3 AND m.receiver_id = ?2))
                   AND (?4 IS NULL OR m.message_id < ?4)
                 ORDER BY m.message_id DESC
                 LIMIT ?5 OFFSET ?6"
            ))?;
            let rows = stmt
                .query_map(
                    rusqlite::params![project_id, user_a, user_b, page.before, page.limit, page.offset],
                    map_private_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_pinned_private_messages(
        &self,
        project_id: i64,
        user_a: i64,
        user_b: i64,
    ) -> Result<Vec<PrivateMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{PRIVATE_SELECT}
                 WHERE m.project_id = ?1 AND m.is_important = 1
                   AND ((m.sender_id = ?2 AND m.receiver_id = ?3)
                     OR (m.sender_id = ?3 AND m.receiver_id = ?2))
                 ORDER BY m.message_id DESC"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![project_id, user_a, user_b], map_private_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Binary (case-sensitive) substring match via instr; a NULL body never
    /// matches.
    pub fn search_private_messages(
        &self,
        project_id: i64,
        user_a: i64,
        user_b: i64,
        query: &str,
    ) -> Result<Vec<PrivateMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{PRIVATE_SELECT}
                 WHERE m.project_id = ?1
                   AND ((m.sender_id = ?2 AND m.receiver_id = ?3)
                     OR (m.sender_id = ?3 AND m.receiver_id = ?2))
                   AND instr(m.body, ?4) > 0
                 ORDER BY m.message_id DESC"
            ))?;
            let rows = stmt
                .query_map(
                    rusqlite::params![project_id, user_a, user_b, query],
                    map_private_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_private_important(&self, message_id: i64, important: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE private_messages SET is_important = ?2 WHERE message_id = ?1",
                rusqlite::params![message_id, important],
            )?;
            Ok(n > 0)
        })
    }

    /// Bulk read watermark: everything addressed to `receiver_id` with
    /// id <= `up_to` flips to read. Commutative under concurrent calls, so
    /// racing is safe. Returns the number of rows actually updated.
    pub fn mark_read(&self, receiver_id: i64, up_to: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE private_messages SET is_read = 1
                 WHERE receiver_id = ?1 AND message_id <= ?2 AND is_read = 0",
                rusqlite::params![receiver_id, up_to],
            )?;
            Ok(n)
        })
    }

    // -- Attachment containers / resources --

    pub fn create_content(&self, kind: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO contents (kind) VALUES (?1)", [kind])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_content(&self, content_id: i64) -> Result<Option<ContentRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT content_id, kind FROM contents WHERE content_id = ?1",
                [content_id],
                |row| {
                    Ok(ContentRow {
                        content_id: row.get(0)?,
                        kind: row.get(1)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn link_task_content(&self, task_id: i64, content_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO task_contents (task_id, content_id) VALUES (?1, ?2)",
                [task_id, content_id],
            )?;
            Ok(())
        })
    }

    pub fn insert_resource(
        &self,
        content_id: i64,
        path: &str,
        kind: &str,
        size: i64,
        file_name: &str,
        uploaded_by: i64,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO resources (content_id, path, kind, size, file_name, uploaded_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![content_id, path, kind, size, file_name, uploaded_by],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_resource(&self, resource_id: i64) -> Result<Option<ResourceRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{RESOURCE_SELECT} WHERE resource_id = ?1"),
                [resource_id],
                map_resource_row,
            )
            .optional()
        })
    }

    /// Batch-fetch resources for a set of container ids, avoiding an N+1
    /// per message page.
    pub fn resources_for_contents(&self, content_ids: &[i64]) -> Result<Vec<ResourceRow>> {
        if content_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=content_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "{RESOURCE_SELECT} WHERE content_id IN ({}) ORDER BY resource_id",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = content_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), map_resource_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The project a message-owned container belongs to, by surface table.
    /// The task branch walks task_contents -> tasks.
    pub fn project_of_room_content(&self, content_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT project_id FROM room_messages WHERE content_id = ?1",
                [content_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn project_of_private_content(&self, content_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT project_id FROM private_messages WHERE content_id = ?1",
                [content_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn project_of_task_content(&self, content_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT t.project_id
                 FROM task_contents tc
                 JOIN tasks t ON t.task_id = tc.task_id
                 WHERE tc.content_id = ?1",
                [content_id],
                |row| row.get(0),
            )
            .optional()
        })
    }
}

// Shared SELECT fragments: message columns plus LEFT JOINed profile columns
// so a deleted sender hydrates as NULL instead of dropping the row.
const ROOM_SELECT: &str = "SELECT m.message_id, m.project_id, m.body, m.content_id,
        m.is_important, m.created_at,
        s.member_id, s.full_name, s.email, s.avatar
 FROM room_messages m
 LEFT JOIN members s ON m.sender_id = s.member_id";

const PRIVATE_SELECT: &str = "SELECT m.message_id, m.project_id, m.body, m.content_id,
        m.is_read, m.is_important, m.created_at,
        s.member_id, s.full_name, s.email, s.avatar,
        r.member_id, r.full_name, r.email, r.avatar
 FROM private_messages m
 LEFT JOIN members s ON m.sender_id = s.member_id
 LEFT JOIN members r ON m.receiver_id = r.member_id";

const RESOURCE_SELECT: &str = "SELECT resource_id, content_id, path, kind, size, file_name, uploaded_by, created_at
 FROM resources";

fn member_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<MemberRow>> {
    let member_id: Option<i64> = row.get(idx)?;
    Ok(match member_id {
        Some(member_id) => Some(MemberRow {
            member_id,
            full_name: row.get(idx + 1)?,
            email: row.get(idx + 2)?,
            avatar: row.get(idx + 3)?,
        }),
        None => None,
    })
}

fn map_room_row(row: &Row<'_>) -> rusqlite::Result<RoomMessageRow> {
    Ok(RoomMessageRow {
        message_id: row.get(0)?,
        project_id: row.get(1)?,
        body: row.get(2)?,
        content_id: row.get(3)?,
        is_important: row.get(4)?,
        created_at: row.get(5)?,
        sender: member_at(row, 6)?,
    })
}

fn map_private_row(row: &Row<'_>) -> rusqlite::Result<PrivateMessageRow> {
    Ok(PrivateMessageRow {
        message_id: row.get(0)?,
        project_id: row.get(1)?,
        body: row.get(2)?,
        content_id: row.get(3)?,
        is_read: row.get(4)?,
        is_important: row.get(5)?,
        created_at: row.get(6)?,
        sender: member_at(row, 7)?,
        receiver: member_at(row, 11)?,
    })
}

fn map_resource_row(row: &Row<'_>) -> rusqlite::Result<ResourceRow> {
    Ok(ResourceRow {
        resource_id: row.get(0)?,
        content_id: row.get(1)?,
        path: row.get(2)?,
        kind: row.get(3)?,
        size: row.get(4)?,
        file_name: row.get(5)?,
        uploaded_by: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Escape LIKE metacharacters so a search query is a literal substring.
fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(db: &Database) -> (i64, i64, i64) {
        let alice = db.create_member("Alice", "alice@example.com", None).unwrap();
        let bob = db.create_member("Bob", "bob@example.com", Some("b.png")).unwrap();
        let project = db.create_project("Apollo", alice).unwrap();
        db.add_project_member(project, bob, "member").unwrap();
        (project, alice, bob)
    }

    #[test]
    fn room_message_ids_are_monotonic() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, _) = seed(&db);

        let mut last = 0;
        for i in 0..5 {
            let id = db
                .insert_room_message(project, alice, Some(&format!("msg {i}")), None)
                .unwrap();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn room_and_private_sequences_are_independent() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, bob) = seed(&db);

        let room_id = db.insert_room_message(project, alice, Some("room"), None).unwrap();
        let private_id = db
            .insert_private_message(project, alice, bob, Some("private"), None)
            .unwrap();
        assert_eq!(room_id, 1);
        assert_eq!(private_id, 1);
    }

    #[test]
    fn list_returns_newest_first_with_cursor() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, _) = seed(&db);

        for i in 1..=5 {
            db.insert_room_message(project, alice, Some(&format!("m{i}")), None)
                .unwrap();
        }

        let page = db.list_room_messages(project, Page::latest(2)).unwrap();
        let ids: Vec<i64> = page.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![5, 4]);

        // Cursor below the lowest id seen: no overlap even if new rows land.
        db.insert_room_message(project, alice, Some("m6"), None).unwrap();
        let older = db
            .list_room_messages(project, Page { offset: 0, limit: 10, before: Some(4) })
            .unwrap();
        let ids: Vec<i64> = older.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn offset_pages_back_from_newest() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, _) = seed(&db);

        for i in 1..=5 {
            db.insert_room_message(project, alice, Some(&format!("m{i}")), None)
                .unwrap();
        }

        // Skip the 2 newest, take the next 2.
        let page = db
            .list_room_messages(project, Page { offset: 2, limit: 2, before: None })
            .unwrap();
        let ids: Vec<i64> = page.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![3, 2]);

        // Offset past the end is just empty.
        let page = db
            .list_room_messages(project, Page { offset: 10, limit: 2, before: None })
            .unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn offset_applies_after_the_cursor() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, _) = seed(&db);

        for i in 1..=5 {
            db.insert_room_message(project, alice, Some(&format!("m{i}")), None)
                .unwrap();
        }

        // Cursor narrows to ids < 5 (4,3,2,1), then offset skips the newest
        // of those.
        let page = db
            .list_room_messages(project, Page { offset: 1, limit: 10, before: Some(5) })
            .unwrap();
        let ids: Vec<i64> = page.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn private_pair_is_unordered() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, bob) = seed(&db);

        db.insert_private_message(project, alice, bob, Some("a to b"), None).unwrap();
        db.insert_private_message(project, bob, alice, Some("b to a"), None).unwrap();

        let as_alice = db.list_private_messages(project, alice, bob, Page::latest(10)).unwrap();
        let as_bob = db.list_private_messages(project, bob, alice, Page::latest(10)).unwrap();
        assert_eq!(as_alice.len(), 2);
        assert_eq!(as_bob.len(), 2);
        assert_eq!(
            as_alice.iter().map(|m| m.message_id).collect::<Vec<_>>(),
            as_bob.iter().map(|m| m.message_id).collect::<Vec<_>>(),
        );
    }

    #[test]
    fn mark_read_is_idempotent_watermark() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, bob) = seed(&db);

        for i in 1..=3 {
            db.insert_private_message(project, alice, bob, Some(&format!("m{i}")), None)
                .unwrap();
        }

        assert_eq!(db.mark_read(bob, 2).unwrap(), 2);
        // Same watermark again: predicate already satisfied, nothing updates.
        assert_eq!(db.mark_read(bob, 2).unwrap(), 0);
        // Lower watermark is a no-op too.
        assert_eq!(db.mark_read(bob, 1).unwrap(), 0);
        assert_eq!(db.mark_read(bob, 3).unwrap(), 1);

        let msgs = db.list_private_messages(project, alice, bob, Page::latest(10)).unwrap();
        assert!(msgs.iter().all(|m| m.is_read));
    }

    #[test]
    fn mark_read_only_touches_addressee() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, bob) = seed(&db);

        db.insert_private_message(project, alice, bob, Some("to bob"), None).unwrap();
        db.insert_private_message(project, bob, alice, Some("to alice"), None).unwrap();

        assert_eq!(db.mark_read(bob, 100).unwrap(), 1);
        let msgs = db.list_private_messages(project, alice, bob, Page::latest(10)).unwrap();
        let to_alice = msgs.iter().find(|m| m.body.as_deref() == Some("to alice")).unwrap();
        assert!(!to_alice.is_read);
    }

    #[test]
    fn pin_unpin_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, _) = seed(&db);

        let id = db.insert_room_message(project, alice, Some("pin me"), None).unwrap();
        assert!(db.set_room_important(id, true).unwrap());
        assert_eq!(db.list_pinned_room_messages(project).unwrap().len(), 1);

        assert!(db.set_room_important(id, false).unwrap());
        assert!(db.list_pinned_room_messages(project).unwrap().is_empty());

        // Nonexistent id: false, nothing mutated.
        assert!(!db.set_room_important(9999, true).unwrap());
        assert!(db.list_pinned_room_messages(project).unwrap().is_empty());
    }

    #[test]
    fn room_search_is_case_insensitive_private_search_is_not() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, bob) = seed(&db);

        db.insert_room_message(project, alice, Some("Deploy Friday"), None).unwrap();
        assert_eq!(db.search_room_messages(project, "deploy").unwrap().len(), 1);

        db.insert_private_message(project, alice, bob, Some("Deploy Friday"), None).unwrap();
        assert!(db.search_private_messages(project, alice, bob, "deploy").unwrap().is_empty());
        assert_eq!(db.search_private_messages(project, alice, bob, "Deploy").unwrap().len(), 1);
    }

    #[test]
    fn search_treats_like_metacharacters_literally() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, _) = seed(&db);

        db.insert_room_message(project, alice, Some("done: 100% complete"), None).unwrap();
        db.insert_room_message(project, alice, Some("done: all of it"), None).unwrap();

        assert_eq!(db.search_room_messages(project, "100%").unwrap().len(), 1);
        assert!(db.search_room_messages(project, "100_").unwrap().is_empty());
    }

    #[test]
    fn search_never_matches_attachment_only_messages() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, bob) = seed(&db);

        let content = db.create_content("private_message").unwrap();
        db.insert_resource(content, "blobs/x", "image", 10, "x.png", alice).unwrap();
        db.insert_private_message(project, alice, bob, None, Some(content)).unwrap();

        assert!(db.search_private_messages(project, alice, bob, "x").unwrap().is_empty());
    }

    #[test]
    fn membership_covers_owner_and_members_only() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, bob) = seed(&db);
        let carol = db.create_member("Carol", "carol@example.com", None).unwrap();

        assert!(db.is_project_member(project, alice).unwrap());
        assert!(db.is_project_member(project, bob).unwrap());
        assert!(!db.is_project_member(project, carol).unwrap());
        assert!(!db.is_project_member(9999, alice).unwrap());
    }

    #[test]
    fn attachment_ownership_chain_resolves_per_kind() {
        let db = Database::open_in_memory().unwrap();
        let (project, alice, bob) = seed(&db);

        let room_content = db.create_content("room_message").unwrap();
        db.insert_room_message(project, alice, None, Some(room_content)).unwrap();
        assert_eq!(db.project_of_room_content(room_content).unwrap(), Some(project));

        let private_content = db.create_content("private_message").unwrap();
        db.insert_private_message(project, alice, bob, None, Some(private_content)).unwrap();
        assert_eq!(db.project_of_private_content(private_content).unwrap(), Some(project));

        let task = db.create_task(project).unwrap();
        let task_content = db.create_content("task").unwrap();
        db.link_task_content(task, task_content).unwrap();
        assert_eq!(db.project_of_task_content(task_content).unwrap(), Some(project));

        // Dangling container: created but never referenced by an owner.
        let orphan = db.create_content("room_message").unwrap();
        assert_eq!(db.project_of_room_content(orphan).unwrap(), None);
    }

    #[test]
    fn resources_batch_fetch_groups_by_container() {
        let db = Database::open_in_memory().unwrap();
        let (_, alice, _) = seed(&db);

        let c1 = db.create_content("room_message").unwrap();
        let c2 = db.create_content("room_message").unwrap();
        db.insert_resource(c1, "blobs/a", "file", 100, "a.pdf", alice).unwrap();
        db.insert_resource(c1, "blobs/b", "image", 200, "b.png", alice).unwrap();
        db.insert_resource(c2, "blobs/c", "file", 300, "c.txt", alice).unwrap();

        let rows = db.resources_for_contents(&[c1, c2]).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().filter(|r| r.content_id == c1).count(), 2);

        assert!(db.resources_for_contents(&[]).unwrap().is_empty());
    }
}
