//! Connection gateway: runs once per connection, before the relay sees it.
//!
//! Resolves or mints the session named by the handshake, transparently
//! re-subscribes a reconnecting client to its room, registers the relay
//! handlers, and finally tells the client which session it is bound to. An
//! invalid or stale token degrades to "new session"; establishment never
//! rejects a connection.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use socketioxide::extract::SocketRef;
use tracing::{debug, info, warn};

use crate::relay::{self, RelayState};
use crate::room::Occupant;
use crate::session::SessionId;

/// Establish a connection: the namespace connect handler.
pub async fn establish(socket: SocketRef, auth: serde_json::Value, state: Arc<RelayState>) {
    let presented = auth
        .get("sessionId")
        .and_then(serde_json::Value::as_str)
        .and_then(SessionId::parse);

    let session_id = match presented.filter(|id| state.sessions.lookup(id).is_some()) {
        Some(id) => {
            debug!(session = %id, socket = %socket.id, "session resumed");
            id
        }
        None => {
            let id = state.sessions.create();
            debug!(session = %id, socket = %socket.id, "session minted");
            id
        }
    };

    state.connections.fetch_add(1, Ordering::Relaxed);
    info!(session = %session_id, socket = %socket.id, "connection established");

    // Reconnects resume mid-match without a fresh joinGame.
    if let Some(code) = state.sessions.room_of(&session_id) {
        let occupant = Occupant {
            session: session_id,
            socket_id: socket.id.to_string(),
        };
        if state.rooms.rejoin(&code, occupant) {
            info!(session = %session_id, room = %code, "rejoined room after reconnect");
        } else {
            warn!(session = %session_id, room = %code, "room unavailable on reconnect");
        }
    }

    relay::register(&socket, session_id, state);

    // First server→client message: the token to persist for future
    // reconnects.
    socket.emit("session", &session_id.to_string()).ok();
}
