//! Wire vocabulary shared with the browser client.
//!
//! The relay never interprets gameplay payloads; the types here exist so
//! events deserialize cleanly and re-serialize field-for-field.

use serde::{Deserialize, Serialize};

use crate::error::JoinGameError;

/// Gameplay payload for `newWord`. Forwarded to the peer unmodified; only
/// the two clients assign meaning to the fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordData {
    pub word: String,
    /// Horizontal spawn position as a fraction of the play-field width.
    pub relxpos: f64,
    /// Lane index the word falls in.
    pub band: i32,
    #[serde(rename = "fromOpponent")]
    pub from_opponent: bool,
}

/// Ack payload for `joinGame`. The client expects either one of the
/// matchmaking error strings or literal `false` on success, so this
/// serializes untagged.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum JoinAck {
    Error(String),
    Success(bool),
}

impl JoinAck {
    pub fn ok() -> Self {
        JoinAck::Success(false)
    }
}

impl From<JoinGameError> for JoinAck {
    fn from(err: JoinGameError) -> Self {
        JoinAck::Error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_data_round_trips_client_field_names() {
        let json = r#"{"word":"keyboard","relxpos":0.42,"band":3,"fromOpponent":false}"#;
        let word: WordData = serde_json::from_str(json).unwrap();
        assert_eq!(word.word, "keyboard");
        assert_eq!(word.band, 3);
        assert!(!word.from_opponent);

        let back = serde_json::to_value(&word).unwrap();
        assert_eq!(back, serde_json::from_str::<serde_json::Value>(json).unwrap());
    }

    #[test]
    fn join_ack_success_is_literal_false() {
        let ack = serde_json::to_value(JoinAck::ok()).unwrap();
        assert_eq!(ack, serde_json::Value::Bool(false));
    }

    #[test]
    fn join_ack_errors_match_client_strings() {
        let ack = serde_json::to_value(JoinAck::from(JoinGameError::RoomDoesntExist)).unwrap();
        assert_eq!(ack, serde_json::Value::String("Room doesn't exist".into()));

        let ack = serde_json::to_value(JoinAck::from(JoinGameError::RoomFull)).unwrap();
        assert_eq!(ack, serde_json::Value::String("Room full".into()));
    }
}
