//! Session persistence across reconnects.
//!
//! A session is the identity a client keeps between transport connections.
//! The store is deliberately thin: it maps a server-minted token to the room
//! the session last joined, nothing more. Storage sits behind
//! [`SessionBackend`] so a single-instance deployment can run on the
//! in-process map while a multi-instance one swaps in a shared store.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RelayError;
use crate::room::RoomCode;

/// Server-minted identity token that outlives any single connection.
///
/// Always generated server-side from a v4 UUID; clients only ever echo it
/// back through the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    fn generate() -> Self {
        SessionId(Uuid::new_v4())
    }

    /// Parse a token presented by a client. Anything that is not a UUID is
    /// treated as unresolvable, not as an error.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(SessionId)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Room this session last joined. Not cleared on disconnect, so a
    /// reconnecting client can resume mid-match.
    pub room: Option<RoomCode>,
}

/// Storage interface behind the session store.
pub trait SessionBackend: Send + Sync + 'static {
    fn get(&self, id: &SessionId) -> Option<Session>;
    fn set(&self, id: SessionId, session: Session);
    fn delete(&self, id: &SessionId) -> Option<Session>;
}

/// Process-local backend. Grows monotonically: no eviction policy exists in
/// the current design.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: DashMap<SessionId, Session>,
}

impl SessionBackend for InMemoryBackend {
    fn get(&self, id: &SessionId) -> Option<Session> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    fn set(&self, id: SessionId, session: Session) {
        self.entries.insert(id, session);
    }

    fn delete(&self, id: &SessionId) -> Option<Session> {
        self.entries.remove(id).map(|(_, session)| session)
    }
}

/// The session store proper.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(InMemoryBackend::default()))
    }

    pub fn with_backend(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    /// Mint a fresh session and insert an empty record. Never fails; the
    /// regenerate loop only matters on a UUID collision.
    pub fn create(&self) -> SessionId {
        loop {
            let id = SessionId::generate();
            if self.backend.get(&id).is_none() {
                self.backend.set(id, Session::default());
                return id;
            }
        }
    }

    pub fn lookup(&self, id: &SessionId) -> Option<Session> {
        self.backend.get(id)
    }

    /// Room currently bound to the session, if any.
    pub fn room_of(&self, id: &SessionId) -> Option<RoomCode> {
        self.lookup(id).and_then(|session| session.room)
    }

    /// Update the room association of an existing session.
    pub fn set_room(&self, id: &SessionId, room: Option<RoomCode>) -> Result<(), RelayError> {
        if self.backend.get(id).is_none() {
            return Err(RelayError::UnknownSession(*id));
        }
        self.backend.set(*id, Session { room });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_ids_are_pairwise_distinct() {
        let store = SessionStore::in_memory();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(store.create()));
        }
    }

    #[test]
    fn lookup_of_unknown_id_misses() {
        let store = SessionStore::in_memory();
        let foreign = SessionId::generate();
        assert_eq!(store.lookup(&foreign), None);
    }

    #[test]
    fn set_room_requires_an_issued_session() {
        let store = SessionStore::in_memory();
        let foreign = SessionId::generate();
        assert_eq!(
            store.set_room(&foreign, None),
            Err(RelayError::UnknownSession(foreign))
        );

        let id = store.create();
        let code = RoomCode::parse("123456");
        store.set_room(&id, Some(code.clone())).unwrap();
        assert_eq!(store.room_of(&id), Some(code));
    }

    #[test]
    fn tokens_survive_a_display_parse_round_trip() {
        let store = SessionStore::in_memory();
        let id = store.create();
        assert_eq!(SessionId::parse(&id.to_string()), Some(id));
        assert_eq!(SessionId::parse("not-a-token"), None);
    }
}
