//! Matchmaking - places connecting players into lobbies

pub mod service;

pub use service::MatchmakingService;
