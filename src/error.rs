//! Typed failures for matchmaking and relay dispatch.
//!
//! Matchmaking errors travel back to the requester inside the join
//! acknowledgement; relay errors are per-event rejections that never tear
//! down the connection.

use thiserror::Error;

use crate::session::SessionId;

/// Expected matchmaking outcomes reported through the `joinGame` ack.
///
/// The `Display` strings are the wire payload the web client matches on, so
/// they are part of the protocol and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinGameError {
    #[error("Room doesn't exist")]
    RoomDoesntExist,
    #[error("Room full")]
    RoomFull,
}

/// Per-event relay failures. Handlers drop the offending event, optionally
/// surface the message to the sender alone, and keep the connection alive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// A gameplay event arrived from a connection whose session is not
    /// bound to any room. Protocol violation by the sender.
    #[error("not in a room")]
    NotInRoom,

    /// A session id that was never issued by this process.
    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    /// Code allocation ran out of attempts at every permitted width. With a
    /// 900,000-value starting space this requires a pathological number of
    /// live rooms.
    #[error("no free room code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
}
