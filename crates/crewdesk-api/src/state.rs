use std::sync::Arc;

use crewdesk_chat::{AccessGuard, AttachmentLinker, ChatService};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub chat: ChatService,
    pub guard: AccessGuard,
    pub linker: AttachmentLinker,
    pub auth: AuthConfig,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Shared system credential for privileged service-to-service calls.
    /// `None` disables the bypass entirely.
    pub api_key: Option<String>,
}
