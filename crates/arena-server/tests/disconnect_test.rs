//! Integration tests for disconnect reconciliation.
//!
//! A closed connection must leave the rooms exactly as if its identity had
//! sent `leave-room` for each of them, without disturbing identities that
//! are still connected elsewhere.

use std::collections::BTreeSet;

use arena_proto::{ClientEvent, Handshake, ServerMessage};
use arena_server::{ServerAction, ServerDriver, ServerEvent};

fn connect(driver: &mut ServerDriver, session_id: u64, handshake: Handshake) {
    driver.process_event(ServerEvent::ConnectionAccepted { session_id, handshake }).unwrap();
}

fn join(driver: &mut ServerDriver, session_id: u64, room_id: &str) {
    driver
        .process_event(ServerEvent::EventReceived {
            session_id,
            event: ClientEvent::JoinRoom { room_id: room_id.to_string() },
        })
        .unwrap();
}

fn close(driver: &mut ServerDriver, session_id: u64, reason: &str) -> Vec<ServerAction> {
    driver
        .process_event(ServerEvent::ConnectionClosed { session_id, reason: reason.to_string() })
        .unwrap()
}

/// Rooms that received a member-list broadcast, with the list as a set.
fn member_broadcasts(actions: &[ServerAction]) -> Vec<(String, BTreeSet<String>)> {
    actions
        .iter()
        .filter_map(|a| match a {
            ServerAction::BroadcastToRoom {
                room_id,
                message: ServerMessage::ActiveUsers(users),
                ..
            } => Some((room_id.clone(), users.iter().cloned().collect())),
            _ => None,
        })
        .collect()
}

#[test]
fn test_disconnect_purges_all_joined_rooms() {
    let mut driver = ServerDriver::default();
    connect(&mut driver, 1, Handshake::with_identity("alice"));
    connect(&mut driver, 2, Handshake::with_identity("bob"));

    join(&mut driver, 1, "R1");
    join(&mut driver, 1, "R2");
    join(&mut driver, 2, "R2");
    join(&mut driver, 2, "R3");

    let actions = close(&mut driver, 1, "transport error: connection reset");

    // R1 emptied and was deleted; R2 survives with bob; R3 was never touched
    assert!(!driver.rooms().has_room("R1"));
    assert_eq!(member_broadcasts(&actions), vec![(
        "R2".to_string(),
        BTreeSet::from(["bob".to_string()])
    )]);
    assert_eq!(driver.rooms().rooms_of("alice").count(), 0);
    assert_eq!(driver.rooms().members("R3").unwrap().len(), 1);
    assert!(!driver.registry().has_session(1));
}

#[test]
fn test_disconnect_matches_explicit_leave() {
    let mut left = ServerDriver::default();
    let mut dropped = ServerDriver::default();

    for driver in [&mut left, &mut dropped] {
        connect(driver, 1, Handshake::with_identity("alice"));
        connect(driver, 2, Handshake::with_identity("bob"));
        join(driver, 1, "abc");
        join(driver, 2, "abc");
    }

    let leave_actions = left
        .process_event(ServerEvent::EventReceived {
            session_id: 1,
            event: ClientEvent::LeaveRoom { room_id: "abc".to_string() },
        })
        .unwrap();
    let close_actions = close(&mut dropped, 1, "connection closed");

    assert_eq!(member_broadcasts(&leave_actions), member_broadcasts(&close_actions));
    assert_eq!(left.rooms().members("abc"), dropped.rooms().members("abc"));
}

#[test]
fn test_shared_identity_survives_one_session_closing() {
    let mut driver = ServerDriver::default();
    connect(&mut driver, 1, Handshake::with_identity("alice"));
    connect(&mut driver, 2, Handshake::with_identity("alice"));
    connect(&mut driver, 3, Handshake::with_identity("bob"));

    join(&mut driver, 1, "abc");
    join(&mut driver, 2, "abc");
    join(&mut driver, 3, "abc");

    // Old tab closes; the new tab still holds alice's place
    let actions = close(&mut driver, 1, "connection closed");
    assert!(member_broadcasts(&actions).is_empty());
    assert!(driver.rooms().is_member("abc", "alice"));

    // Last alice session closes; now she leaves
    let actions = close(&mut driver, 2, "connection closed");
    assert_eq!(member_broadcasts(&actions), vec![(
        "abc".to_string(),
        BTreeSet::from(["bob".to_string()])
    )]);
}

#[test]
fn test_shared_identity_leaves_rooms_only_the_closed_session_held() {
    let mut driver = ServerDriver::default();
    connect(&mut driver, 1, Handshake::with_identity("alice"));
    connect(&mut driver, 2, Handshake::with_identity("alice"));
    connect(&mut driver, 3, Handshake::with_identity("bob"));

    join(&mut driver, 1, "shared");
    join(&mut driver, 2, "shared");
    join(&mut driver, 1, "private");
    join(&mut driver, 3, "private");

    let actions = close(&mut driver, 1, "connection closed");

    assert_eq!(member_broadcasts(&actions), vec![(
        "private".to_string(),
        BTreeSet::from(["bob".to_string()])
    )]);
    assert!(driver.rooms().is_member("shared", "alice"));
    assert!(!driver.rooms().is_member("private", "alice"));
}

#[test]
fn test_inert_session_takes_part_in_nothing() {
    let mut driver = ServerDriver::default();
    connect(&mut driver, 1, Handshake::from_query(Some("roomId=abc")));
    connect(&mut driver, 2, Handshake::with_identity("bob"));
    join(&mut driver, 2, "abc");

    let actions = driver
        .process_event(ServerEvent::FrameReceived {
            session_id: 1,
            text: r#"{"event":"join-room","data":{"roomId":"abc"}}"#.to_string(),
        })
        .unwrap();
    assert!(actions.iter().all(|a| matches!(a, ServerAction::Log { .. })));
    assert!(!driver.registry().is_subscribed(1, "abc"));

    let actions = close(&mut driver, 1, "connection closed");
    assert!(member_broadcasts(&actions).is_empty());
    assert_eq!(driver.rooms().members("abc").unwrap().len(), 1);
}

#[test]
fn test_disconnect_without_rooms_is_harmless() {
    let mut driver = ServerDriver::default();
    connect(&mut driver, 1, Handshake::with_identity("alice"));

    let actions = close(&mut driver, 1, "connection closed");

    assert!(member_broadcasts(&actions).is_empty());
    assert_eq!(driver.rooms().room_count(), 0);
    assert_eq!(driver.registry().session_count(), 0);
}
