//! Wire protocol shared between the match server and its clients.
//!
//! Every datagram is a single JSON object tagged by a `type` field. Clients
//! send [`ClientMessage`]s, the server answers with [`ServerMessage`]s; the
//! per-tick [`GameStateSnapshot`] keeps the same shape on every tick so
//! clients can diff consecutive states.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Snapshot coordinates are rounded to this many decimal places.
pub const SNAPSHOT_DECIMALS: i32 = 3;

/// Largest datagram the transport accepts.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Rounds a coordinate the way snapshots publish it.
pub fn round_snapshot(value: f64) -> f64 {
    let factor = 10f64.powi(SNAPSHOT_DECIMALS);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputType {
    Up,
    Down,
    Space,
    StopUp,
    StopDown,
    StopSpace,
}

/// A single key event from a player.
///
/// `player_id` is the in-game seat. It is overwritten server-side from the
/// connection that sent the message, so whatever the client puts there is
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub timestamp: u64,
    #[serde(rename = "playerId", default)]
    pub player_id: usize,
}

impl UserInput {
    pub fn new(input_type: InputType, timestamp: u64, player_id: usize) -> Self {
        Self {
            input_type,
            timestamp,
            player_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Binds the sending address to an external player identifier.
    Join {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    UserInput {
        options: UserInput,
    },
    Leave,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("malformed message: {0}")]
    Malformed(String),
}

impl ClientMessage {
    const KNOWN_TYPES: [&'static str; 3] = ["join", "userInput", "leave"];

    /// Decodes a datagram, telling an unknown `type` apart from a broken body.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let message_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::Malformed("missing `type` field".to_string()))?;

        if !Self::KNOWN_TYPES.contains(&message_type) {
            return Err(ProtocolError::UnknownType(message_type.to_string()));
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub r: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddleState {
    pub a: f64,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallState {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub w: f64,
    pub h: f64,
    #[serde(rename = "doRot")]
    pub do_rot: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpState {
    pub id: u32,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

/// Serializable projection of one match, sent every tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSnapshot {
    pub balls: Vec<BallState>,
    pub paddles: Vec<PaddleState>,
    pub walls: Vec<WallState>,
    pub spawned_power_ups: Vec<PowerUpState>,
    pub scores: Vec<i64>,
    pub modifiers_state: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Acknowledges a join. The seat is only known once the match starts,
    /// as the player's index in the reference table.
    Joined {
        #[serde(rename = "waitingFor")]
        waiting_for: usize,
    },
    GameStarted {
        #[serde(rename = "referenceTable")]
        reference_table: Vec<String>,
    },
    GameState {
        data: GameStateSnapshot,
        #[serde(rename = "referenceTable")]
        reference_table: Vec<String>,
    },
    GameFinished {
        scores: Vec<i64>,
        results: Vec<u32>,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
