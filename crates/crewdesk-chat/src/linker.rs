use std::sync::Arc;

use anyhow::anyhow;
use crewdesk_db::models::ResourceRow;
use crewdesk_db::Database;
use crewdesk_types::api::ResourceView;
use crewdesk_types::models::{AttachmentKind, MediaKind};
use tracing::warn;

use crate::error::ChatError;
use crate::run_blocking;

/// Associates uploaded blobs with their owning entity through the shared
/// container indirection. The container is created first and tagged with its
/// owner kind; the owning message (or task) row references it afterwards.
/// Blob bytes live in the external store — only reference records here.
pub struct AttachmentLinker {
    db: Arc<Database>,
}

impl AttachmentLinker {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create_container(&self, kind: AttachmentKind) -> Result<i64, ChatError> {
        run_blocking(&self.db, move |db| db.create_content(kind.as_str())).await
    }

    pub async fn attach_resource(
        &self,
        content_id: i64,
        path: String,
        file_name: String,
        kind: MediaKind,
        size: i64,
        uploader_id: i64,
    ) -> Result<ResourceView, ChatError> {
        if size < 0 {
            return Err(ChatError::validation("size must be non-negative"));
        }
        if path.is_empty() || file_name.is_empty() {
            return Err(ChatError::validation("path and file_name are required"));
        }

        run_blocking(&self.db, move |db| {
            if db.get_content(content_id)?.is_none() {
                return Ok(Err(ChatError::NotFound("container")));
            }
            let resource_id =
                db.insert_resource(content_id, &path, kind.as_str(), size, &file_name, uploader_id)?;
            let row = db
                .get_resource(resource_id)?
                .ok_or_else(|| anyhow!("inserted resource {} missing", resource_id))?;
            Ok(Ok(resource_view(row)))
        })
        .await?
    }

    pub async fn get_resource(&self, resource_id: i64) -> Result<ResourceView, ChatError> {
        let row = run_blocking(&self.db, move |db| db.get_resource(resource_id)).await?;
        row.map(resource_view).ok_or(ChatError::NotFound("resource"))
    }

    /// Walk resource -> container -> owning row -> project. Any missing link
    /// is NotFound: a container that was created but never claimed by a
    /// message or task owns nothing.
    pub async fn resolve_owning_project(&self, resource_id: i64) -> Result<i64, ChatError> {
        let project = run_blocking(&self.db, move |db| {
            let Some(resource) = db.get_resource(resource_id)? else {
                return Ok(None);
            };
            let Some(content) = db.get_content(resource.content_id)? else {
                return Ok(None);
            };
            let kind: AttachmentKind = content
                .kind
                .parse()
                .map_err(|e| anyhow!("corrupt container kind on content {}: {}", content.content_id, e))?;

            match kind {
                AttachmentKind::Task => db.project_of_task_content(content.content_id),
                AttachmentKind::RoomMessage => db.project_of_room_content(content.content_id),
                AttachmentKind::PrivateMessage => db.project_of_private_content(content.content_id),
            }
        })
        .await?;

        project.ok_or(ChatError::NotFound("resource"))
    }
}

/// Row -> wire projection. A corrupt kind tag degrades to `file` rather than
/// failing the whole page.
pub(crate) fn resource_view(row: ResourceRow) -> ResourceView {
    let kind = row.kind.parse::<MediaKind>().unwrap_or_else(|e| {
        warn!("corrupt media kind on resource {}: {}", row.resource_id, e);
        MediaKind::File
    });
    ResourceView {
        resource_id: row.resource_id,
        file_name: row.file_name,
        path: row.path,
        kind,
        size: row.size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (AttachmentLinker, Arc<Database>, i64, i64, i64) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let alice = db.create_member("Alice", "alice@example.com", None).unwrap();
        let bob = db.create_member("Bob", "bob@example.com", None).unwrap();
        let project = db.create_project("Apollo", alice).unwrap();
        db.add_project_member(project, bob, "member").unwrap();
        (AttachmentLinker::new(db.clone()), db, project, alice, bob)
    }

    #[tokio::test]
    async fn container_then_resource_then_message_resolves() {
        let (linker, db, project, alice, _) = setup();

        let content = linker.create_container(AttachmentKind::RoomMessage).await.unwrap();
        let resource = linker
            .attach_resource(content, "blobs/r1".into(), "plan.pdf".into(), MediaKind::File, 512, alice)
            .await
            .unwrap();
        db.insert_room_message(project, alice, None, Some(content)).unwrap();

        assert_eq!(
            linker.resolve_owning_project(resource.resource_id).await.unwrap(),
            project
        );
    }

    #[tokio::test]
    async fn task_owned_container_resolves_through_task() {
        let (linker, db, project, alice, _) = setup();

        let task = db.create_task(project).unwrap();
        let content = linker.create_container(AttachmentKind::Task).await.unwrap();
        db.link_task_content(task, content).unwrap();
        let resource = linker
            .attach_resource(content, "blobs/r2".into(), "spec.txt".into(), MediaKind::File, 64, alice)
            .await
            .unwrap();

        assert_eq!(
            linker.resolve_owning_project(resource.resource_id).await.unwrap(),
            project
        );
    }

    #[tokio::test]
    async fn unclaimed_container_does_not_resolve() {
        let (linker, _, _, alice, _) = setup();

        let content = linker.create_container(AttachmentKind::PrivateMessage).await.unwrap();
        let resource = linker
            .attach_resource(content, "blobs/r3".into(), "x.png".into(), MediaKind::Image, 9, alice)
            .await
            .unwrap();

        assert!(matches!(
            linker.resolve_owning_project(resource.resource_id).await,
            Err(ChatError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn attach_to_missing_container_is_not_found() {
        let (linker, _, _, alice, _) = setup();

        let err = linker
            .attach_resource(9999, "blobs/r4".into(), "y.txt".into(), MediaKind::File, 1, alice)
            .await;
        assert!(matches!(err, Err(ChatError::NotFound("container"))));
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let (linker, _, _, _, _) = setup();
        assert!(matches!(
            linker.resolve_owning_project(1234).await,
            Err(ChatError::NotFound(_))
        ));
        assert!(matches!(linker.get_resource(1234).await, Err(ChatError::NotFound(_))));
    }
}
