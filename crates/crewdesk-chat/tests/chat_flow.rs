//! End-to-end flow over the service layer: membership gating, send,
//! fan-out, history, and read state working together against one store.

use std::sync::Arc;

use crewdesk_chat::{AccessGuard, AttachmentLinker, ChatError, ChatService};
use crewdesk_db::queries::Page;
use crewdesk_db::Database;
use crewdesk_gateway::dispatcher::Dispatcher;
use crewdesk_types::events::GatewayEvent;
use crewdesk_types::models::{AttachmentKind, Identity, MediaKind};

struct World {
    service: ChatService,
    guard: AccessGuard,
    linker: AttachmentLinker,
    dispatcher: Dispatcher,
    project: i64,
    alice: i64,
    bob: i64,
    carol: i64,
}

fn world() -> World {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let alice = db.create_member("Alice", "alice@example.com", None).unwrap();
    let bob = db.create_member("Bob", "bob@example.com", None).unwrap();
    let carol = db.create_member("Carol", "carol@example.com", None).unwrap();
    let project = db.create_project("Apollo", alice).unwrap();
    db.add_project_member(project, bob, "member").unwrap();

    let dispatcher = Dispatcher::new();
    World {
        service: ChatService::new(db.clone(), dispatcher.clone()),
        guard: AccessGuard::new(db.clone()),
        linker: AttachmentLinker::new(db),
        dispatcher,
        project,
        alice,
        bob,
        carol,
    }
}

fn user(member_id: i64) -> Identity {
    Identity { member_id, privileged: false }
}

#[tokio::test]
async fn room_send_reaches_subscribed_member_and_excludes_outsiders() {
    let w = world();

    // Bob's connection is subscribed to the project room bus.
    let mut bob_bus = w.dispatcher.subscribe();

    // Carol is not a member: the guard rejects her before any query runs.
    assert!(matches!(
        w.guard.require_project(user(w.carol), w.project).await,
        Err(ChatError::Unauthorized)
    ));

    // Alice (owner) passes the guard and sends.
    w.guard.require_project(user(w.alice), w.project).await.unwrap();
    let sent = w
        .service
        .send_room_message(w.project, w.alice, Some("hello".into()), None)
        .await
        .unwrap();
    assert_eq!(sent.message_id, 1);
    assert_eq!(sent.sender.as_ref().unwrap().member_id, w.alice);

    // The push carries the same payload the sender got back.
    match bob_bus.recv().await.unwrap() {
        GatewayEvent::RoomMessageCreate { project_id, message } => {
            assert_eq!(project_id, w.project);
            assert_eq!(message, sent);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // History returns it oldest-first.
    let history = w.service.list_room_messages(w.project, Page::latest(10)).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].body.as_deref(), Some("hello"));
}

#[tokio::test]
async fn private_attachment_flow_with_read_watermark() {
    let w = world();

    // Container first, then the blob reference, then the owning message.
    let content = w.linker.create_container(AttachmentKind::PrivateMessage).await.unwrap();
    let resource = w
        .linker
        .attach_resource(content, "blobs/shot".into(), "shot.png".into(), MediaKind::Image, 4096, w.alice)
        .await
        .unwrap();

    let sent = w
        .service
        .send_private_message(w.project, w.alice, w.bob, None, Some(content))
        .await
        .unwrap();
    assert!(sent.body.is_none());
    assert_eq!(sent.resources, vec![resource.clone()]);
    assert!(!sent.is_read);

    // The ownership chain now resolves to the project, and members may
    // fetch the reference.
    let owner_project = w.linker.resolve_owning_project(resource.resource_id).await.unwrap();
    assert_eq!(owner_project, w.project);
    w.guard.require_project(user(w.bob), owner_project).await.unwrap();

    // Bob reads up to the message id; repeating changes nothing.
    assert_eq!(w.service.mark_read(w.bob, sent.message_id).await.unwrap(), 1);
    assert_eq!(w.service.mark_read(w.bob, sent.message_id).await.unwrap(), 0);

    let history = w
        .service
        .list_private_messages(w.project, w.bob, w.alice, Page::latest(10))
        .await
        .unwrap();
    assert!(history[0].is_read);
}
