use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS members (
            member_id   INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name   TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            avatar      TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS projects (
            project_id  INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            owner_id    INTEGER NOT NULL REFERENCES members(member_id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS project_members (
            project_id  INTEGER NOT NULL REFERENCES projects(project_id),
            member_id   INTEGER NOT NULL REFERENCES members(member_id),
            role        TEXT NOT NULL DEFAULT 'member',
            PRIMARY KEY (project_id, member_id)
        );

        CREATE TABLE IF NOT EXISTS tasks (
            task_id     INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id  INTEGER NOT NULL REFERENCES projects(project_id)
        );

        -- Polymorphic attachment container: created before the owning row,
        -- so `kind` declares ownership until the owner references it.
        CREATE TABLE IF NOT EXISTS contents (
            content_id  INTEGER PRIMARY KEY AUTOINCREMENT,
            kind        TEXT NOT NULL
                        CHECK (kind IN ('task', 'room_message', 'private_message'))
        );

        CREATE TABLE IF NOT EXISTS task_contents (
            task_id     INTEGER NOT NULL REFERENCES tasks(task_id),
            content_id  INTEGER NOT NULL REFERENCES contents(content_id),
            PRIMARY KEY (task_id, content_id)
        );

        CREATE TABLE IF NOT EXISTS resources (
            resource_id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_id  INTEGER NOT NULL REFERENCES contents(content_id),
            path        TEXT NOT NULL,
            kind        TEXT NOT NULL CHECK (kind IN ('file', 'image')),
            size        INTEGER NOT NULL,
            file_name   TEXT NOT NULL,
            uploaded_by INTEGER REFERENCES members(member_id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_resources_content
            ON resources(content_id);

        CREATE TABLE IF NOT EXISTS room_messages (
            message_id   INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id   INTEGER NOT NULL REFERENCES projects(project_id),
            sender_id    INTEGER REFERENCES members(member_id) ON DELETE SET NULL,
            body         TEXT,
            content_id   INTEGER REFERENCES contents(content_id),
            is_important INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_room_messages_project
            ON room_messages(project_id, message_id);

        -- Independent id sequence from room_messages: the two surfaces are
        -- separate streams with no cross-surface ordering.
        CREATE TABLE IF NOT EXISTS private_messages (
            message_id   INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id   INTEGER NOT NULL REFERENCES projects(project_id),
            sender_id    INTEGER REFERENCES members(member_id) ON DELETE SET NULL,
            receiver_id  INTEGER NOT NULL REFERENCES members(member_id),
            body         TEXT,
            content_id   INTEGER REFERENCES contents(content_id),
            is_read      INTEGER NOT NULL DEFAULT 0,
            is_important INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_private_messages_pair
            ON private_messages(project_id, sender_id, receiver_id, message_id);

        CREATE INDEX IF NOT EXISTS idx_private_messages_receiver
            ON private_messages(receiver_id, is_read);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
