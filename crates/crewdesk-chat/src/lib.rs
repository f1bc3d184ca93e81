pub mod error;
pub mod guard;
pub mod linker;
pub mod service;

pub use error::ChatError;
pub use guard::AccessGuard;
pub use linker::AttachmentLinker;
pub use service::ChatService;

use std::sync::Arc;

use crewdesk_db::Database;

/// Run a database closure off the async runtime. The rusqlite connection is
/// behind a mutex and must never be held across an await, so every store
/// access funnels through here.
pub(crate) async fn run_blocking<T, F>(db: &Arc<Database>, f: F) -> Result<T, ChatError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| ChatError::Internal(anyhow::anyhow!("spawn_blocking join error: {e}")))?
        .map_err(ChatError::Internal)
}
