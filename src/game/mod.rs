//! Game simulation modules

pub mod character;
pub mod r#match;
pub mod match_state;
pub mod physics;
pub mod snapshot;

pub use r#match::{GameMatch, MatchHandle, MatchRegistry};

use crate::ws::protocol::ClientMsg;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Player input received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub user_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Request to spawn a character, answered only to the requesting session
#[derive(Debug)]
pub struct JoinRequest {
    pub user_id: Uuid,
    pub display_name: String,
    pub reply: oneshot::Sender<Result<(), JoinError>>,
}

/// Why a match turned a player away
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Match already started")]
    MatchInProgress,

    #[error("Match is full")]
    MatchFull,
}

impl JoinError {
    /// Wire code sent in `ServerMsg::Error`
    pub fn code(&self) -> &'static str {
        match self {
            JoinError::MatchInProgress => "match_in_progress",
            JoinError::MatchFull => "match_full",
        }
    }
}

/// Input state for a single tick (processed from ClientMsg::InputTick)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    pub seq: u32,
    pub move_forward: f32,
    pub move_right: f32,
    pub turn: f32,
    pub turn_rate: f32,
    pub look_up: f32,
    pub look_up_rate: f32,
    pub jump: bool,
}
