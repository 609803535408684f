//! Relay dispatcher: the fixed table of gameplay events and their fan-out.
//!
//! Every event is one of three shapes. Request/response events answer the
//! sender through an ack and touch matchmaking state. Peer-directed events
//! go to the other room occupant only. Room-directed events go to both
//! occupants, sender included. The relay never inspects gameplay payloads;
//! it resolves a target and forwards.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use socketioxide::extract::{AckSender, Data, SocketRef};
use socketioxide::SocketIo;
use tracing::{debug, error, info, warn};

use crate::error::RelayError;
use crate::protocol::{JoinAck, WordData};
use crate::room::{Occupant, RoomCode, RoomRegistry};
use crate::session::{SessionId, SessionStore};

/// Process-wide shared state, mutated only by the gateway and the handlers
/// below.
pub struct RelayState {
    pub io: SocketIo,
    pub sessions: SessionStore,
    pub rooms: RoomRegistry,
    /// Live connection gauge for the stats endpoint.
    pub connections: AtomicUsize,
}

impl RelayState {
    pub fn new(io: SocketIo) -> Self {
        Self {
            io,
            sessions: SessionStore::in_memory(),
            rooms: RoomRegistry::new(),
            connections: AtomicUsize::new(0),
        }
    }

    fn occupant(&self, session_id: SessionId, socket: &SocketRef) -> Occupant {
        Occupant {
            session: session_id,
            socket_id: socket.id.to_string(),
        }
    }
}

/// Bind the event table to an established connection.
pub fn register(socket: &SocketRef, session_id: SessionId, state: Arc<RelayState>) {
    {
        let state = state.clone();
        socket.on("createGame", move |socket: SocketRef, ack: AckSender| {
            let state = state.clone();
            async move { handle_create_game(socket, ack, session_id, state).await }
        });
    }

    {
        let state = state.clone();
        socket.on(
            "joinGame",
            move |socket: SocketRef, Data::<String>(code), ack: AckSender| {
                let state = state.clone();
                async move { handle_join_game(socket, ack, code, session_id, state).await }
            },
        );
    }

    {
        let state = state.clone();
        socket.on("ready", move |socket: SocketRef| {
            let state = state.clone();
            async move { forward_to_peer(&socket, session_id, &state, "opponentReady", &()) }
        });
    }

    {
        let state = state.clone();
        socket.on("start", move |socket: SocketRef| {
            let state = state.clone();
            async move { forward_to_room(&socket, session_id, &state, "start", &()) }
        });
    }

    {
        let state = state.clone();
        socket.on("newWord", move |socket: SocketRef, Data::<WordData>(word)| {
            let state = state.clone();
            async move { forward_to_peer(&socket, session_id, &state, "newWord", &word) }
        });
    }

    {
        let state = state.clone();
        socket.on("input", move |socket: SocketRef, Data::<String>(input)| {
            let state = state.clone();
            async move { forward_to_peer(&socket, session_id, &state, "input", &input) }
        });
    }

    {
        let state = state.clone();
        socket.on("clearedWord", move |socket: SocketRef, Data::<String>(word)| {
            let state = state.clone();
            async move {
                forward_to_peer(&socket, session_id, &state, "opponentClearedWord", &word)
            }
        });
    }

    {
        let state = state.clone();
        socket.on("iDiedSadge", move |socket: SocketRef| {
            let state = state.clone();
            async move { forward_to_peer(&socket, session_id, &state, "opponentDied", &()) }
        });
    }

    {
        let state = state.clone();
        socket.on("playAgain", move |socket: SocketRef| {
            let state = state.clone();
            async move { forward_to_room(&socket, session_id, &state, "playAgain", &()) }
        });
    }

    {
        let state = state.clone();
        socket.on_disconnect(move |socket: SocketRef| {
            let state = state.clone();
            async move { handle_disconnect(socket, session_id, state).await }
        });
    }
}

async fn handle_create_game(
    socket: SocketRef,
    ack: AckSender,
    session_id: SessionId,
    state: Arc<RelayState>,
) {
    let previous = state.sessions.room_of(&session_id);

    match state.rooms.create(state.occupant(session_id, &socket)) {
        Ok(code) => {
            if let Some(old) = previous {
                detach_from_room(&socket, &old, &state);
            }
            if let Err(err) = state.sessions.set_room(&session_id, Some(code.clone())) {
                warn!(session = %session_id, %err, "room created for unknown session");
            }
            info!(session = %session_id, room = %code, "game created");
            ack.send(&code).ok();
        }
        Err(err) => {
            error!(session = %session_id, %err, "room code allocation failed");
            socket.emit("error", &err.to_string()).ok();
        }
    }
}

async fn handle_join_game(
    socket: SocketRef,
    ack: AckSender,
    raw_code: String,
    session_id: SessionId,
    state: Arc<RelayState>,
) {
    let code = RoomCode::parse(&raw_code);
    let previous = state.sessions.room_of(&session_id);

    match state.rooms.join(&code, state.occupant(session_id, &socket)) {
        Ok(peer) => {
            if let Some(old) = previous.filter(|old| *old != code) {
                detach_from_room(&socket, &old, &state);
            }
            if let Err(err) = state.sessions.set_room(&session_id, Some(code.clone())) {
                warn!(session = %session_id, %err, "room joined by unknown session");
            }
            info!(session = %session_id, room = %code, "game joined");
            ack.send(&JoinAck::ok()).ok();
            if let Some(peer) = peer {
                emit_to(&state, &peer.socket_id, "getReady", &());
            }
        }
        Err(err) => {
            // Expected matchmaking outcome, not a failure.
            debug!(session = %session_id, room = %code, %err, "join rejected");
            ack.send(&JoinAck::from(err)).ok();
        }
    }
}

async fn handle_disconnect(socket: SocketRef, session_id: SessionId, state: Arc<RelayState>) {
    state.connections.fetch_sub(1, Ordering::Relaxed);

    // The session's room binding stays in place so a reconnect can resume;
    // only the dead socket leaves the membership set.
    if let Some(code) = state.sessions.room_of(&session_id) {
        if let Some(peer) = state.rooms.leave(&code, &socket.id.to_string()) {
            emit_to(&state, &peer.socket_id, "opponentLeft", &());
        }
    }
    info!(session = %session_id, socket = %socket.id, "connection closed");
}

/// Leave a previous room after moving to a new one, telling the abandoned
/// peer its opponent is gone.
fn detach_from_room(socket: &SocketRef, code: &RoomCode, state: &RelayState) {
    if let Some(peer) = state.rooms.leave(code, &socket.id.to_string()) {
        emit_to(state, &peer.socket_id, "opponentLeft", &());
    }
}

/// Peer-directed delivery: the other occupant only, never echoed back.
///
/// A sender without a room binding is committing a protocol violation and
/// gets a per-event rejection; a sender alone in its room simply has nobody
/// listening and the event is dropped.
fn forward_to_peer<T: Serialize>(
    socket: &SocketRef,
    session_id: SessionId,
    state: &RelayState,
    event: &str,
    payload: &T,
) {
    let Some(code) = state.sessions.room_of(&session_id) else {
        reject(socket, event, RelayError::NotInRoom);
        return;
    };
    if let Some(peer) = state.rooms.peer_of(&code, &socket.id.to_string()) {
        emit_to(state, &peer.socket_id, event, payload);
    }
}

/// Room-directed delivery: every occupant, sender included.
fn forward_to_room<T: Serialize>(
    socket: &SocketRef,
    session_id: SessionId,
    state: &RelayState,
    event: &str,
    payload: &T,
) {
    let Some(code) = state.sessions.room_of(&session_id) else {
        reject(socket, event, RelayError::NotInRoom);
        return;
    };
    for member in state.rooms.members_of(&code) {
        emit_to(state, &member.socket_id, event, payload);
    }
}

/// Drop an event that violates its precondition and tell the sender, and
/// only the sender, why. The connection stays up.
fn reject(socket: &SocketRef, event: &str, err: RelayError) {
    debug!(socket = %socket.id, event, %err, "event dropped");
    socket.emit("error", &err.to_string()).ok();
}

fn emit_to<T: Serialize>(state: &RelayState, socket_id: &str, event: &str, payload: &T) {
    if let Ok(sid) = socket_id.parse() {
        if let Some(target) = state.io.get_socket(sid) {
            if let Err(err) = target.emit(event, payload) {
                warn!(socket = %socket_id, event, "relay send failed: {err}");
            }
        }
    }
}
