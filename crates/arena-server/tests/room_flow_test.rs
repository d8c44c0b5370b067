//! Integration test for the room lifecycle.
//!
//! Drives `ServerDriver` through the same events the WebSocket runtime feeds
//! it, and resolves broadcasts against the driver's post-event state exactly
//! as the runtime does:
//! 1. Joining creates the room and reports its language to the joiner only
//! 2. Language changes reach every member
//! 3. Code and chat relays skip the sender
//! 4. The last leave deletes the room and forgets its language

use arena_proto::{ChatMessage, ClientEvent, Handshake, ServerMessage};
use arena_server::{DriverConfig, LogLevel, ServerAction, ServerDriver, ServerEvent};
use serde_json::json;

/// Expand actions into per-session deliveries, in emission order.
fn deliveries(driver: &ServerDriver, actions: &[ServerAction]) -> Vec<(u64, ServerMessage)> {
    let mut out = Vec::new();
    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, message } => {
                out.push((*session_id, message.clone()));
            },
            ServerAction::BroadcastToRoom { room_id, message, exclude_session } => {
                let mut sessions: Vec<u64> = driver
                    .sessions_in_room(room_id)
                    .filter(|s| Some(*s) != *exclude_session)
                    .collect();
                sessions.sort_unstable();
                out.extend(sessions.into_iter().map(|s| (s, message.clone())));
            },
            _ => {},
        }
    }
    out
}

/// Messages delivered to one session.
fn received_by(delivered: &[(u64, ServerMessage)], session: u64) -> Vec<ServerMessage> {
    delivered.iter().filter(|(s, _)| *s == session).map(|(_, m)| m.clone()).collect()
}

/// Check if any Log action contains a specific message substring.
fn has_log_containing(actions: &[ServerAction], substring: &str) -> bool {
    actions.iter().any(|a| match a {
        ServerAction::Log { message, .. } => message.contains(substring),
        _ => false,
    })
}

fn connect(driver: &mut ServerDriver, session_id: u64, username: &str) {
    driver
        .process_event(ServerEvent::ConnectionAccepted {
            session_id,
            handshake: Handshake::from_query(Some(&format!("username={username}&roomId=abc"))),
        })
        .unwrap();
}

fn frame(driver: &mut ServerDriver, session_id: u64, text: &str) -> Vec<ServerAction> {
    driver.process_event(ServerEvent::FrameReceived { session_id, text: text.to_string() }).unwrap()
}

fn users(names: &[&str]) -> ServerMessage {
    ServerMessage::ActiveUsers(names.iter().map(|n| (*n).to_string()).collect())
}

fn sorted_users(message: &ServerMessage) -> Vec<String> {
    match message {
        ServerMessage::ActiveUsers(list) => {
            let mut list = list.clone();
            list.sort();
            list
        },
        other => panic!("expected active-users, got {other:?}"),
    }
}

#[test]
fn test_room_lifecycle_two_members() {
    let mut driver = ServerDriver::new(DriverConfig::default());
    let alice = 1;
    let bob = 2;

    connect(&mut driver, alice, "alice");
    connect(&mut driver, bob, "bob");

    // Step 1: alice creates "abc" by joining it
    let actions = frame(&mut driver, alice, r#"{"event":"join-room","data":{"roomId":"abc"}}"#);
    let delivered = deliveries(&driver, &actions);
    assert_eq!(received_by(&delivered, alice), vec![
        ServerMessage::RoomLanguage("javascript".to_string()),
        users(&["alice"]),
    ]);
    assert!(received_by(&delivered, bob).is_empty());

    // Step 2: alice switches to python
    let actions = frame(
        &mut driver,
        alice,
        r#"{"event":"set-language","data":{"roomId":"abc","language":"python"}}"#,
    );
    let delivered = deliveries(&driver, &actions);
    assert_eq!(received_by(&delivered, alice), vec![ServerMessage::RoomLanguage(
        "python".to_string()
    )]);
    assert_eq!(driver.rooms().language("abc"), Some("python"));

    // Step 3: bob joins and learns the language exactly once
    let actions = frame(&mut driver, bob, r#"{"event":"join-room","data":{"roomId":"abc"}}"#);
    let delivered = deliveries(&driver, &actions);
    let to_bob = received_by(&delivered, bob);
    assert_eq!(to_bob.len(), 2);
    assert_eq!(to_bob[0], ServerMessage::RoomLanguage("python".to_string()));
    assert_eq!(sorted_users(&to_bob[1]), vec!["alice", "bob"]);

    let to_alice = received_by(&delivered, alice);
    assert_eq!(to_alice.len(), 1, "alice only sees the new member list");
    assert_eq!(sorted_users(&to_alice[0]), vec!["alice", "bob"]);

    // Step 4: alice leaves; bob sees the shrunken room
    let actions = frame(&mut driver, alice, r#"{"event":"leave-room","data":{"roomId":"abc"}}"#);
    let delivered = deliveries(&driver, &actions);
    assert_eq!(received_by(&delivered, bob), vec![users(&["bob"])]);
    assert!(received_by(&delivered, alice).is_empty());

    // Step 5: bob leaves; the room and its language are gone
    let actions = frame(&mut driver, bob, r#"{"event":"leave-room","data":{"roomId":"abc"}}"#);
    assert!(deliveries(&driver, &actions).is_empty());
    assert!(has_log_containing(&actions, "room deleted"));
    assert!(!driver.rooms().has_room("abc"));
    assert_eq!(driver.rooms().language("abc"), None);
}

#[test]
fn test_code_update_relayed_verbatim_to_others() {
    let mut driver = ServerDriver::default();
    connect(&mut driver, 1, "alice");
    connect(&mut driver, 2, "bob");
    connect(&mut driver, 3, "carol");
    frame(&mut driver, 1, r#"{"event":"join-room","data":{"roomId":"abc"}}"#);
    frame(&mut driver, 2, r#"{"event":"join-room","data":{"roomId":"abc"}}"#);
    frame(&mut driver, 3, r#"{"event":"join-room","data":{"roomId":"elsewhere"}}"#);

    let actions = frame(
        &mut driver,
        1,
        r#"{"event":"code-update","data":{"roomId":"abc","code":"print(1)","cursor":{"line":0}}}"#,
    );
    let delivered = deliveries(&driver, &actions);

    let expected = json!({"roomId": "abc", "code": "print(1)", "cursor": {"line": 0}});
    assert_eq!(delivered, vec![(
        2,
        ServerMessage::UpdateCode(expected.as_object().cloned().unwrap())
    )]);
}

#[test]
fn test_chat_message_carries_sender_identity() {
    let mut driver = ServerDriver::default();
    connect(&mut driver, 1, "alice");
    connect(&mut driver, 2, "bob");
    frame(&mut driver, 1, r#"{"event":"join-room","data":{"roomId":"abc"}}"#);
    frame(&mut driver, 2, r#"{"event":"join-room","data":{"roomId":"abc"}}"#);

    let actions = frame(
        &mut driver,
        1,
        r#"{"event":"send-message","data":{"roomId":"abc","message":"hello","username":"mallory"}}"#,
    );
    let delivered = deliveries(&driver, &actions);

    assert_eq!(delivered, vec![(
        2,
        ServerMessage::ReceiveMessage(ChatMessage {
            username: "alice".to_string(),
            message: "hello".to_string(),
        })
    )]);
}

#[test]
fn test_rejoin_is_idempotent() {
    let mut driver = ServerDriver::default();
    connect(&mut driver, 1, "alice");

    frame(&mut driver, 1, r#"{"event":"join-room","data":{"roomId":"abc"}}"#);
    let actions = frame(&mut driver, 1, r#"{"event":"join-room","data":{"roomId":"abc"}}"#);

    assert_eq!(received_by(&deliveries(&driver, &actions), 1), vec![
        ServerMessage::RoomLanguage("javascript".to_string()),
        users(&["alice"]),
    ]);
    assert_eq!(driver.rooms().members("abc").unwrap().len(), 1);
}

#[test]
fn test_stale_and_unknown_room_events_are_silent() {
    let mut driver = ServerDriver::default();
    connect(&mut driver, 1, "alice");

    let leave = frame(&mut driver, 1, r#"{"event":"leave-room","data":{"roomId":"ghost"}}"#);
    let language = frame(
        &mut driver,
        1,
        r#"{"event":"set-language","data":{"roomId":"ghost","language":"go"}}"#,
    );

    assert!(deliveries(&driver, &leave).is_empty());
    assert!(deliveries(&driver, &language).is_empty());
    assert_eq!(driver.rooms().room_count(), 0);
}

#[test]
fn test_malformed_frames_are_dropped_with_warning() {
    let mut driver = ServerDriver::default();
    connect(&mut driver, 1, "alice");

    for text in [
        "not json",
        r#"{"event":"join-room","data":"abc"}"#,
        r#"{"event":"join-room","data":{"roomId":""}}"#,
        r#"{"event":"set-language","data":{"roomId":"abc"}}"#,
        r#"{"event":"send-message","data":{"roomId":"abc"}}"#,
    ] {
        let actions = frame(&mut driver, 1, text);
        assert!(
            matches!(actions.as_slice(), [ServerAction::Log { level: LogLevel::Warn, .. }]),
            "{text} should only produce a warning, got {actions:?}"
        );
    }

    assert_eq!(driver.rooms().room_count(), 0);
}

#[test]
fn test_unknown_event_is_debug_only() {
    let mut driver = ServerDriver::default();
    connect(&mut driver, 1, "alice");

    let actions = frame(&mut driver, 1, r#"{"event":"run-code","data":{"roomId":"abc"}}"#);

    assert!(matches!(actions.as_slice(), [ServerAction::Log { level: LogLevel::Debug, .. }]));
}
