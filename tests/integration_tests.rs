//! Integration tests for matchmaking and session persistence.
//!
//! These drive the session store and room registry together the way the
//! gateway and dispatcher do, asserting delivery targets as resolved
//! occupants rather than over live sockets.

use std::sync::atomic::{AtomicUsize, Ordering};

use typeduel_server::error::JoinGameError;
use typeduel_server::room::{Occupant, RoomCode, RoomRegistry};
use typeduel_server::session::SessionStore;

static NEXT_SOCKET: AtomicUsize = AtomicUsize::new(0);

/// A connected client as the gateway sees it: a session plus a socket.
fn connect(sessions: &SessionStore) -> Occupant {
    Occupant {
        session: sessions.create(),
        socket_id: format!("sock-{}", NEXT_SOCKET.fetch_add(1, Ordering::Relaxed)),
    }
}

#[test]
fn full_duel_lifecycle() {
    let sessions = SessionStore::in_memory();
    let rooms = RoomRegistry::new();

    // First player creates a game.
    let host = connect(&sessions);
    let code = rooms.create(host.clone()).unwrap();
    sessions.set_room(&host.session, Some(code.clone())).unwrap();

    // Second player joins with the code; the host is the one to signal.
    let guest = connect(&sessions);
    let waiting = rooms.join(&code, guest.clone()).unwrap();
    sessions.set_room(&guest.session, Some(code.clone())).unwrap();
    assert_eq!(waiting, Some(host.clone()));

    // Peer-directed events resolve to the other occupant, never the sender.
    assert_eq!(rooms.peer_of(&code, &host.socket_id), Some(guest.clone()));
    assert_eq!(rooms.peer_of(&code, &guest.socket_id), Some(host.clone()));

    // Room-directed events reach both occupants, sender included.
    let everyone = rooms.members_of(&code);
    assert_eq!(everyone.len(), 2);
    assert!(everyone.contains(&host));
    assert!(everyone.contains(&guest));

    // A third player is turned away.
    let third = connect(&sessions);
    assert_eq!(rooms.join(&code, third), Err(JoinGameError::RoomFull));
}

#[test]
fn disconnect_notifies_the_survivor_once_and_keeps_the_session() {
    let sessions = SessionStore::in_memory();
    let rooms = RoomRegistry::new();

    let host = connect(&sessions);
    let code = rooms.create(host.clone()).unwrap();
    sessions.set_room(&host.session, Some(code.clone())).unwrap();

    let guest = connect(&sessions);
    rooms.join(&code, guest.clone()).unwrap();
    sessions.set_room(&guest.session, Some(code.clone())).unwrap();

    // Host's transport drops: guest is the one to tell, exactly once.
    assert_eq!(rooms.leave(&code, &host.socket_id), Some(guest.clone()));
    assert_eq!(rooms.leave(&code, &host.socket_id), None);

    // No further events from the departed socket resolve to a target.
    assert_eq!(rooms.peer_of(&code, &host.socket_id), None);

    // The departed session's binding is intact for a future resume.
    assert_eq!(sessions.room_of(&host.session), Some(code));
}

#[test]
fn reconnect_resumes_the_room_without_a_fresh_join() {
    let sessions = SessionStore::in_memory();
    let rooms = RoomRegistry::new();

    let host = connect(&sessions);
    let code = rooms.create(host.clone()).unwrap();
    sessions.set_room(&host.session, Some(code.clone())).unwrap();

    let guest = connect(&sessions);
    rooms.join(&code, guest.clone()).unwrap();
    sessions.set_room(&guest.session, Some(code.clone())).unwrap();

    // Guest drops mid-match.
    assert_eq!(rooms.leave(&code, &guest.socket_id), Some(host.clone()));

    // Guest comes back presenting its old token: the gateway resolves the
    // session, finds the room binding, and rejoins with the new socket.
    let resumed = Occupant {
        session: guest.session,
        socket_id: "sock-resumed".to_owned(),
    };
    let bound_room = sessions.room_of(&guest.session).unwrap();
    assert_eq!(bound_room, code);
    assert!(rooms.rejoin(&bound_room, resumed.clone()));

    // The duel is whole again.
    assert_eq!(rooms.peer_of(&code, &host.socket_id), Some(resumed));
}

#[test]
fn stale_token_degrades_to_a_new_session() {
    use typeduel_server::session::SessionId;

    let sessions = SessionStore::in_memory();

    // Token from a previous process lifetime: parses, but resolves nowhere.
    let stale = SessionId::parse("3c9bb3fc-1d59-4a0e-bd9d-6a5e50ba2a1e").unwrap();
    assert!(sessions.lookup(&stale).is_none());

    // The gateway path: unresolvable means mint, never reject.
    let fresh = sessions.create();
    assert_ne!(fresh, stale);
    assert!(sessions.lookup(&fresh).is_some());
}

#[test]
fn codes_from_concurrent_creators_never_collide() {
    let sessions = SessionStore::in_memory();
    let rooms = std::sync::Arc::new(RoomRegistry::new());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let rooms = rooms.clone();
        let creator = connect(&sessions);
        handles.push(std::thread::spawn(move || {
            (0..50)
                .map(|_| rooms.create(creator.clone()).unwrap())
                .collect::<Vec<RoomCode>>()
        }));
    }

    let mut seen = std::collections::HashSet::new();
    for handle in handles {
        for code in handle.join().unwrap() {
            assert!(seen.insert(code));
        }
    }
    assert_eq!(rooms.room_count(), 400);
}

#[test]
fn racing_joiners_cannot_overfill_a_room() {
    let sessions = SessionStore::in_memory();
    let rooms = std::sync::Arc::new(RoomRegistry::new());

    let host = connect(&sessions);
    let code = rooms.create(host).unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let rooms = rooms.clone();
        let code = code.clone();
        let joiner = connect(&sessions);
        handles.push(std::thread::spawn(move || rooms.join(&code, joiner).is_ok()));
    }

    let admitted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(admitted, 1);
    assert_eq!(rooms.member_count(&code), 2);
}
