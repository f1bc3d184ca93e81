use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use crewdesk_db::Database;
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};

use crewdesk_types::events::{GatewayCommand, GatewayEvent};
use crewdesk_types::models::Claims;

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a single WebSocket connection. The client must open with an
/// Identify command carrying a valid JWT; it then subscribes to the project
/// rooms it wants pushes for. Private messages need no subscription — they
/// arrive over this connection's own user channel, so another user's private
/// stream is unreachable by construction.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    // Step 1: Wait for Identify command with JWT
    let member_id = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(id) => id,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    info!("member {} connected to gateway", member_id);

    // Step 2: Send Ready event
    let ready = GatewayEvent::Ready { member_id };
    match serde_json::to_string(&ready) {
        Ok(text) => {
            if sender.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        Err(e) => {
            warn!("failed to encode Ready event: {}", e);
            return;
        }
    }

    // Register the per-user targeted channel (private delivery) and join the
    // room-event bus.
    let (conn_id, mut user_rx) = dispatcher.register_user_channel(member_id).await;
    let mut broadcast_rx = dispatcher.subscribe();

    // Per-connection room subscriptions (shared between send and recv tasks).
    let subscriptions: Arc<std::sync::RwLock<HashSet<i64>>> =
        Arc::new(std::sync::RwLock::new(HashSet::new()));
    let send_subscriptions = subscriptions.clone();

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward room events (filtered by subscription) + targeted events to
    // the client, with heartbeat.
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("broadcast receiver lagged by {} events", n);
                            continue;
                        }
                        Err(_) => break,
                    };

                    if let Some(project_id) = event.project_id() {
                        let subs = send_subscriptions.read()
                            .expect("subscription lock poisoned");
                        if !subs.contains(&project_id) {
                            continue;
                        }
                    }

                    let Ok(text) = serde_json::to_string(&event) else { continue };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                result = user_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };
                    let Ok(text) = serde_json::to_string(&event) else { continue };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from the client
    let recv_subscriptions = subscriptions.clone();
    let recv_db = db.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(member_id, cmd, &recv_subscriptions, &recv_db).await;
                    }
                    Err(e) => {
                        warn!(
                            "member {} bad command: {} -- raw: {}",
                            member_id,
                            e,
                            log_excerpt(&text)
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister_user_channel(member_id, conn_id).await;
    info!("member {} disconnected from gateway", member_id);
}

async fn wait_for_identify(
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<i64> {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    let timeout = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    return Some(token_data.claims.sub);
                }
            }
        }
        None
    });

    timeout.await.ok().flatten()
}

async fn handle_command(
    member_id: i64,
    cmd: GatewayCommand,
    subscriptions: &Arc<std::sync::RwLock<HashSet<i64>>>,
    db: &Arc<Database>,
) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::Subscribe { project_ids } => {
            // Membership is re-checked per subscribe, never cached across
            // requests: a member removed from a project stops receiving
            // pushes on their next subscribe.
            let authorized = authorized_projects(db, member_id, project_ids).await;
            info!(
                "member {} subscribed to {} project rooms",
                member_id,
                authorized.len()
            );
            let mut subs = subscriptions.write().expect("subscription lock poisoned");
            subs.extend(authorized);
        }

        GatewayCommand::Unsubscribe { project_ids } => {
            let mut subs = subscriptions.write().expect("subscription lock poisoned");
            for id in project_ids {
                subs.remove(&id);
            }
        }
    }
}

/// First 200 chars of a raw client frame for logging. Cuts on a char
/// boundary so a multibyte payload cannot panic the recv task.
fn log_excerpt(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

async fn authorized_projects(db: &Arc<Database>, member_id: i64, project_ids: Vec<i64>) -> Vec<i64> {
    let db = db.clone();
    let checked = tokio::task::spawn_blocking(move || {
        let mut out = Vec::with_capacity(project_ids.len());
        for project_id in project_ids {
            match db.is_project_member(project_id, member_id) {
                Ok(true) => out.push(project_id),
                Ok(false) => {}
                Err(e) => warn!("membership check failed for project {}: {}", project_id, e),
            }
        }
        out
    })
    .await;

    match checked {
        Ok(out) => out,
        Err(e) => {
            warn!("spawn_blocking join error: {}", e);
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_excerpt_cuts_on_char_boundaries() {
        let short = "hello";
        assert_eq!(log_excerpt(short), "hello");

        // 300 two-byte chars: byte 200 falls mid-character, the cut must
        // land on the 200th char instead.
        let wide = "é".repeat(300);
        let excerpt = log_excerpt(&wide);
        assert_eq!(excerpt.chars().count(), 200);
        assert!(wide.starts_with(excerpt));
    }
}
