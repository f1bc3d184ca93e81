use std::sync::Arc;

use crewdesk_db::Database;
use crewdesk_types::models::Identity;

use crate::error::ChatError;
use crate::run_blocking;

/// Membership gate in front of every chat operation.
///
/// A privileged identity (shared system key + asserted member id) bypasses
/// the check entirely — that trust is unconditional and lives at the API
/// boundary, which is where the key is verified.
pub struct AccessGuard {
    db: Arc<Database>,
}

impl AccessGuard {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Owner or member of the project. Re-evaluated on every call, never
    /// cached.
    pub async fn can_access(&self, identity: Identity, project_id: i64) -> Result<bool, ChatError> {
        if identity.privileged {
            return Ok(true);
        }
        run_blocking(&self.db, move |db| {
            db.is_project_member(project_id, identity.member_id)
        })
        .await
    }

    /// Errors with `Unauthorized` (generic, no existence leakage) when the
    /// caller may not touch the project.
    pub async fn require_project(
        &self,
        identity: Identity,
        project_id: i64,
    ) -> Result<(), ChatError> {
        if self.can_access(identity, project_id).await? {
            Ok(())
        } else {
            Err(ChatError::Unauthorized)
        }
    }
}
