use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crewdesk_api::middleware::require_identity;
use crewdesk_api::state::{AppState, AppStateInner, AuthConfig};
use crewdesk_api::{chat, resources};
use crewdesk_chat::{AccessGuard, AttachmentLinker, ChatService};
use crewdesk_db::Database;
use crewdesk_gateway::connection;
use crewdesk_gateway::dispatcher::Dispatcher;

#[derive(Clone)]
struct GatewayState {
    dispatcher: Dispatcher,
    db: Arc<Database>,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewdesk=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("CREWDESK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let api_key = std::env::var("CREWDESK_API_KEY").ok();
    let db_path = std::env::var("CREWDESK_DB_PATH").unwrap_or_else(|_| "crewdesk.db".into());
    let host = std::env::var("CREWDESK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CREWDESK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let dispatcher = Dispatcher::new();
    let app_state: AppState = Arc::new(AppStateInner {
        chat: ChatService::new(db.clone(), dispatcher.clone()),
        guard: AccessGuard::new(db.clone()),
        linker: AttachmentLinker::new(db.clone()),
        auth: AuthConfig { jwt_secret: jwt_secret.clone(), api_key },
    });

    let gateway_state = GatewayState {
        dispatcher,
        db,
        jwt_secret,
    };

    // Routes — everything REST-shaped requires a resolved identity.
    let api_routes = Router::new()
        .route("/projects/{project_id}/chat", get(chat::latest_room_message))
        .route("/projects/{project_id}/chat", post(chat::send_room_message))
        .route("/projects/{project_id}/chat/messages", get(chat::room_messages))
        .route("/projects/{project_id}/chat/pin", get(chat::pinned_room_messages))
        .route("/projects/{project_id}/chat-search", get(chat::search_messages))
        .route(
            "/projects/{project_id}/chat-private/{other_id}",
            get(chat::latest_private_message),
        )
        .route(
            "/projects/{project_id}/chat-private/{other_id}",
            post(chat::send_private_message),
        )
        .route(
            "/projects/{project_id}/chat-private/{other_id}/messages",
            get(chat::private_messages),
        )
        .route(
            "/projects/{project_id}/chat-private/{other_id}/pin",
            get(chat::pinned_private_messages),
        )
        .route("/mark-as-read/{message_id}", post(chat::mark_read))
        .route("/message/{message_id}/pin/{kind}", post(chat::pin_message))
        .route("/message/{message_id}/unpin/{kind}", post(chat::unpin_message))
        .route("/contents", post(resources::create_container))
        .route("/contents/{content_id}/resources", post(resources::attach_resource))
        .route("/resources/{resource_id}", get(resources::get_resource))
        .route("/resources/{resource_id}/download", get(resources::download_resource))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_identity))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(gateway_state);

    let app = Router::new()
        .merge(api_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Crewdesk server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.db, state.jwt_secret)
    })
}
