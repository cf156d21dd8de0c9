//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::character::CharacterTuning;
use crate::game::match_state::MatchTimings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Allowed client origins for CORS (comma-separated), permissive when unset
    pub client_origin: Option<String>,
    /// Gameplay tuning shared by every match
    pub game: GameConfig,
}

/// Per-match gameplay settings
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    /// Players needed before the lobby countdown begins
    pub min_players: usize,
    /// Hard cap on players per match
    pub max_players: usize,
    /// Lobby countdown before StartGame is called (seconds)
    pub lobby_wait_secs: f32,
    pub timings: MatchTimings,
    pub character: CharacterTuning,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 8,
            lobby_wait_secs: 5.0,
            timings: MatchTimings::default(),
            character: CharacterTuning::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Render-style PORT wins over SERVER_ADDR
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let defaults = GameConfig::default();
        let timings = MatchTimings {
            setup_secs: parse_or(&lookup, "SETUP_SECS", defaults.timings.setup_secs)?,
            round_secs: parse_or(&lookup, "ROUND_SECS", defaults.timings.round_secs)?,
        };

        let base = defaults.character;
        let character = CharacterTuning {
            walk_speed: parse_or(&lookup, "WALK_SPEED", base.walk_speed)?,
            chaser_walk_speed: parse_or(&lookup, "CHASER_WALK_SPEED", base.chaser_walk_speed)?,
            run_speed: parse_or(&lookup, "RUN_SPEED", base.run_speed)?,
            powerup_speed: parse_or(&lookup, "POWERUP_SPEED", base.powerup_speed)?,
            charge_secs: parse_or(&lookup, "CHARGE_SECS", base.charge_secs)?,
            charge_cooldown_secs: parse_or(
                &lookup,
                "CHARGE_COOLDOWN_SECS",
                base.charge_cooldown_secs,
            )?,
            ..base
        };

        let game = GameConfig {
            min_players: parse_or(&lookup, "MIN_PLAYERS", defaults.min_players)?,
            max_players: parse_or(&lookup, "MAX_PLAYERS", defaults.max_players)?,
            lobby_wait_secs: parse_or(&lookup, "LOBBY_WAIT_SECS", defaults.lobby_wait_secs)?,
            timings,
            character,
        };

        if game.min_players == 0 || game.min_players > game.max_players {
            return Err(ConfigError::Invalid("MIN_PLAYERS"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                None | Some("") | Some("pretty") | Some("text") => false,
                Some("json") => true,
                Some(_) => return Err(ConfigError::Invalid("LOG_FORMAT")),
            },
            client_origin: lookup("CLIENT_ORIGIN").filter(|s| !s.trim().is_empty()),
            game,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
