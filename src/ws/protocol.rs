//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::match_state::{MatchPhase, MatchState, Team};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Axis and button state for the current frame
    InputTick {
        /// Sequence number for client-side prediction reconciliation
        seq: u32,
        /// Forward/back axis (-1.0..1.0)
        #[serde(default)]
        move_forward: f32,
        /// Right/left axis (-1.0..1.0)
        #[serde(default)]
        move_right: f32,
        /// Absolute yaw delta in degrees (mouse)
        #[serde(default)]
        turn: f32,
        /// Normalized yaw rate (stick)
        #[serde(default)]
        turn_rate: f32,
        /// Absolute pitch delta in degrees (mouse)
        #[serde(default)]
        look_up: f32,
        /// Normalized pitch rate (stick)
        #[serde(default)]
        look_up_rate: f32,
        /// Jump pressed this frame
        #[serde(default)]
        jump: bool,
    },

    /// Charge ability request, one per button press
    Tackle,

    /// Ask the authority to start the round
    StartGame,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave current match
    LeaveMatch,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        user_id: Uuid,
        server_time: u64,
    },

    /// Confirmation of match join, sent when any player joins
    MatchJoined {
        match_id: Uuid,
        /// Players in the match at join time
        players: Vec<PlayerInfo>,
    },

    /// Player joined the match
    PlayerJoined {
        player: PlayerInfo,
    },

    /// Player left the match
    PlayerLeft {
        user_id: Uuid,
        reason: String,
    },

    /// Replicated state (sent at regular intervals)
    Snapshot {
        /// Server tick number
        tick: u64,
        match_state: MatchState,
        characters: Vec<CharacterSnapshot>,
    },

    /// Phase or winner changed, sent as soon as it happens
    MatchStateChanged {
        phase: MatchPhase,
        winning_team: Team,
        /// Team of every character at the time of the change
        teams: Vec<PlayerInfo>,
    },

    /// Match has ended
    MatchEnd {
        winning_team: Team,
        /// Chaser who tagged the victim, absent when the clock ran out
        tagged_by: Option<Uuid>,
        duration_secs: u32,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Player info for roster updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub user_id: Uuid,
    pub display_name: String,
    pub team: Team,
}

/// Replicated character fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub user_id: Uuid,
    pub team: Team,
    pub input_enabled: bool,
    pub charge_timer: f32,
    pub charge_cooldown_timer: f32,
    /// Position
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Control yaw in degrees
    pub yaw: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    /// Current speed cap (team base + powerup, or run speed while charging)
    pub max_speed: f32,
    /// Last processed input sequence
    pub last_input_seq: u32,
}
