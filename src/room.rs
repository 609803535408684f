//! Two-party room registry and code allocation.
//!
//! A room is an owned membership set of at most two occupants, addressed by
//! a short numeric code. Rooms come into existence when a game is created
//! and vanish when the last occupant leaves; the registry itself is the
//! source of truth for membership rather than any transport-level grouping.

use std::fmt;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{JoinGameError, RelayError};
use crate::session::SessionId;

/// A duel is always exactly two participants.
pub const ROOM_CAPACITY: usize = 2;

/// Codes start at six digits; each width gets this many random draws before
/// the space widens by one digit.
const ATTEMPTS_PER_WIDTH: u32 = 64;
const MIN_CODE_WIDTH: u32 = 6;
const MAX_CODE_WIDTH: u32 = 9;

/// Short human-typeable room code.
///
/// Allocation draws six-digit values from [100000, 999999], but the type
/// keeps the raw string form so arbitrary client input (leading zeros,
/// widened codes) stays expressible as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Build a code from client input, trimming incidental whitespace.
    pub fn parse(raw: &str) -> Self {
        RoomCode(raw.trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One end of a duel: the persistent session plus the socket currently
/// bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub session: SessionId,
    pub socket_id: String,
}

/// A room and its occupants. Exists in the registry iff non-empty.
#[derive(Debug, Clone)]
pub struct Room {
    members: Vec<Occupant>,
}

impl Room {
    fn solo(first: Occupant) -> Self {
        let mut members = Vec::with_capacity(ROOM_CAPACITY);
        members.push(first);
        Room { members }
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= ROOM_CAPACITY
    }

    pub fn members(&self) -> &[Occupant] {
        &self.members
    }

    /// The other occupant, from the perspective of member `socket_id`.
    /// A socket that is not in the room has no peer.
    pub fn peer_of(&self, socket_id: &str) -> Option<Occupant> {
        if !self.members.iter().any(|m| m.socket_id == socket_id) {
            return None;
        }
        self.members.iter().find(|m| m.socket_id != socket_id).cloned()
    }
}

/// Process-wide registry of live rooms.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomCode, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh room with `first` as its only occupant and return the
    /// allocated code.
    ///
    /// Candidate codes are drawn at random and retried on collision with any
    /// live room. The retry budget is bounded: once a width is exhausted the
    /// code space widens by a digit, and running out entirely is an error
    /// rather than an unbounded loop.
    pub fn create(&self, first: Occupant) -> Result<RoomCode, RelayError> {
        let mut attempts = 0;
        for width in MIN_CODE_WIDTH..=MAX_CODE_WIDTH {
            for _ in 0..ATTEMPTS_PER_WIDTH {
                attempts += 1;
                let code = random_code(width);
                if let Entry::Vacant(slot) = self.rooms.entry(code.clone()) {
                    slot.insert(Room::solo(first));
                    return Ok(code);
                }
            }
        }
        Err(RelayError::CodeSpaceExhausted { attempts })
    }

    /// Join an existing room. On success returns the occupant that was
    /// already waiting, so the caller can signal it; `None` when the join
    /// was a same-session repeat and there is nobody new to tell.
    ///
    /// The capacity check and the insertion happen under one map guard, so
    /// two racing joiners cannot both land in the last slot.
    pub fn join(
        &self,
        code: &RoomCode,
        joiner: Occupant,
    ) -> Result<Option<Occupant>, JoinGameError> {
        match self.rooms.get_mut(code) {
            Some(mut room) => {
                if let Some(existing) = room
                    .members
                    .iter_mut()
                    .find(|m| m.session == joiner.session)
                {
                    // Same session joining its own room again: refresh the
                    // socket binding instead of eating the free slot.
                    existing.socket_id = joiner.socket_id;
                    return Ok(None);
                }
                if room.is_full() {
                    return Err(JoinGameError::RoomFull);
                }
                let peer = room.members.first().cloned();
                room.members.push(joiner);
                Ok(peer)
            }
            None => Err(JoinGameError::RoomDoesntExist),
        }
    }

    /// Reattach a reconnecting session to its old room.
    ///
    /// If a member with the same session id still lingers (the previous
    /// socket has not been torn down yet), its slot is taken over by the new
    /// socket instead of consuming the free one. Returns whether the
    /// occupant ended up in the room.
    pub fn rejoin(&self, code: &RoomCode, occupant: Occupant) -> bool {
        match self.rooms.get_mut(code) {
            Some(mut room) => {
                if let Some(stale) = room
                    .members
                    .iter_mut()
                    .find(|m| m.session == occupant.session)
                {
                    stale.socket_id = occupant.socket_id;
                    return true;
                }
                if room.is_full() {
                    return false;
                }
                room.members.push(occupant);
                true
            }
            None => false,
        }
    }

    /// Remove a socket from a room, dropping the room once it empties.
    ///
    /// Returns the remaining peer only when `socket_id` was actually a
    /// member and somebody is left to notify. A second call for
    /// the same socket yields nothing, which is what keeps `opponentLeft` a
    /// once-only signal.
    pub fn leave(&self, code: &RoomCode, socket_id: &str) -> Option<Occupant> {
        match self.rooms.entry(code.clone()) {
            Entry::Occupied(mut entry) => {
                let room = entry.get_mut();
                let before = room.members.len();
                room.members.retain(|m| m.socket_id != socket_id);
                if room.members.len() == before {
                    return None;
                }
                if room.members.is_empty() {
                    entry.remove();
                    None
                } else {
                    Some(entry.get().members[0].clone())
                }
            }
            Entry::Vacant(_) => None,
        }
    }

    /// The other occupant of `code`, from the perspective of `socket_id`.
    pub fn peer_of(&self, code: &RoomCode, socket_id: &str) -> Option<Occupant> {
        self.rooms.get(code).and_then(|room| room.peer_of(socket_id))
    }

    /// Snapshot of a room's membership, sender included.
    pub fn members_of(&self, code: &RoomCode) -> Vec<Occupant> {
        self.rooms
            .get(code)
            .map(|room| room.members().to_vec())
            .unwrap_or_default()
    }

    pub fn member_count(&self, code: &RoomCode) -> usize {
        self.rooms.get(code).map(|room| room.members().len()).unwrap_or(0)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

fn random_code(width: u32) -> RoomCode {
    let low = 10u64.pow(width - 1);
    let high = 10u64.pow(width) - 1;
    RoomCode(rand::thread_rng().gen_range(low..=high).to_string())
}
