//! Authoritative match state machine
//!
//! Owns the round lifecycle (Waiting -> Setup -> Playing -> Finished), the
//! phase countdown, team assignment and win attribution. Only the authority
//! mutates it; proxies receive the replicated [`MatchState`] and re-fire the
//! change notification locally.
//!
//! The server only ever runs the authority. `apply_replicated` and
//! [`PresentationHook`] are the client-side half of the contract and are
//! exercised by the tests here.

use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Match phase, progresses forward only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Lobby, players joining
    Waiting,
    /// Victim gets a head start, chasers are frozen
    Setup,
    /// Everybody moves, chasers try to tag the victim
    Playing,
    /// Round over, terminal
    Finished,
}

/// Team a character plays for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    #[default]
    Chaser,
    Victim,
}

/// Network role of a simulated object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetRole {
    /// The single writer of shared state (the server)
    Authority,
    /// Read-only replica fed by replication
    SimulatedProxy,
}

impl NetRole {
    pub fn is_authority(self) -> bool {
        matches!(self, NetRole::Authority)
    }
}

/// Replicated match fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub phase: MatchPhase,
    /// Seconds left in the current phase. Goes negative one tick past zero,
    /// which is what fires the next transition.
    pub time_until_next_phase: f32,
    pub winning_team: Team,
}

impl Default for MatchState {
    fn default() -> Self {
        Self {
            phase: MatchPhase::Waiting,
            time_until_next_phase: 0.0,
            winning_team: Team::Chaser,
        }
    }
}

/// Phase durations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchTimings {
    /// Head start granted to the victim
    pub setup_secs: f32,
    /// Length of the chase itself
    pub round_secs: f32,
}

impl Default for MatchTimings {
    fn default() -> Self {
        Self {
            setup_secs: 10.0,
            round_secs: 60.0 * 3.0,
        }
    }
}

/// Typed notification sent whenever the phase or winner changes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchStateChanged {
    pub phase: MatchPhase,
    pub winning_team: Team,
}

/// Observer for the rendering layer (team visuals, local HUD).
///
/// Kept apart from the typed event channel so game logic never depends on it.
pub trait PresentationHook: Send + Sync {
    fn match_state_changed(&self, event: &MatchStateChanged);
}

/// Query over the characters currently active in the world
pub trait CharacterRoster {
    /// Ids of every active character, in a stable order
    fn active_characters(&self) -> Vec<Uuid>;

    fn assign_team(&mut self, id: Uuid, team: Team);
}

/// Handle injected into character controllers
pub type SharedMatchState = Arc<RwLock<MatchStateMachine>>;

/// Non-owning link a character keeps to its match
pub type MatchLink = Weak<RwLock<MatchStateMachine>>;

pub struct MatchStateMachine {
    role: NetRole,
    state: MatchState,
    timings: MatchTimings,
    rng: ChaCha8Rng,
    /// Character that tagged the victim, if the round ended by a tag
    tagged_by: Option<Uuid>,
    events: broadcast::Sender<MatchStateChanged>,
    presentation: Vec<Box<dyn PresentationHook>>,
}

impl MatchStateMachine {
    pub fn new(role: NetRole, timings: MatchTimings, seed: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            role,
            state: MatchState::default(),
            timings,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tagged_by: None,
            events,
            presentation: Vec::new(),
        }
    }

    /// Wrap into the shared handle characters are constructed with
    pub fn into_shared(self) -> SharedMatchState {
        Arc::new(RwLock::new(self))
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn phase(&self) -> MatchPhase {
        self.state.phase
    }

    pub fn time_until_next_phase(&self) -> f32 {
        self.state.time_until_next_phase
    }

    pub fn winning_team(&self) -> Team {
        self.state.winning_team
    }

    pub fn tagged_by(&self) -> Option<Uuid> {
        self.tagged_by
    }

    /// Subscribe to the typed state-changed channel
    pub fn subscribe(&self) -> broadcast::Receiver<MatchStateChanged> {
        self.events.subscribe()
    }

    pub fn add_presentation_hook(&mut self, hook: Box<dyn PresentationHook>) {
        self.presentation.push(hook);
    }

    /// Pick the victim and enter Setup.
    ///
    /// Authority only, and only from `Waiting`. Anything else is a silent
    /// no-op. An empty roster also leaves the match waiting.
    pub fn start_game<R: CharacterRoster + ?Sized>(&mut self, roster: &mut R) {
        if !self.role.is_authority() || self.state.phase != MatchPhase::Waiting {
            debug!(role = ?self.role, phase = ?self.state.phase, "StartGame rejected");
            return;
        }

        let characters = roster.active_characters();
        if characters.is_empty() {
            warn!("StartGame with no active characters, staying in Waiting");
            return;
        }

        let victim_index = self.rng.gen_range(0..characters.len());
        for (index, id) in characters.iter().enumerate() {
            let team = if index == victim_index {
                Team::Victim
            } else {
                Team::Chaser
            };
            roster.assign_team(*id, team);
        }

        self.state.phase = MatchPhase::Setup;
        self.state.time_until_next_phase = self.timings.setup_secs;

        info!(
            victim = %characters[victim_index],
            players = characters.len(),
            "Match entering setup"
        );
        self.notify();
    }

    /// End the round because `winner` tagged the victim.
    ///
    /// The winning team is always recorded as `Chaser`; `winner` is kept
    /// only as the tagger for the end-of-match report.
    pub fn finish_game(&mut self, winner: Uuid) {
        if !self.role.is_authority() || self.state.phase != MatchPhase::Playing {
            debug!(role = ?self.role, phase = ?self.state.phase, "FinishGame rejected");
            return;
        }

        self.state.winning_team = Team::Chaser;
        self.state.phase = MatchPhase::Finished;
        self.state.time_until_next_phase = 0.0;
        self.tagged_by = Some(winner);

        info!(tagger = %winner, "Victim tagged, chasers win");
        self.notify();
    }

    /// Per-frame countdown and phase advance (authority only)
    pub fn advance(&mut self, dt: f32) {
        if !self.role.is_authority() {
            return;
        }

        if self.state.time_until_next_phase >= 0.0 {
            self.state.time_until_next_phase -= dt;
            return;
        }

        match self.state.phase {
            MatchPhase::Setup => {
                self.state.phase = MatchPhase::Playing;
                self.state.time_until_next_phase = self.timings.round_secs;
                info!("Chase is on");
                self.notify();
            }
            MatchPhase::Playing => {
                self.state.phase = MatchPhase::Finished;
                self.state.winning_team = Team::Victim;
                info!("Clock ran out, victim wins");
                self.notify();
            }
            MatchPhase::Waiting | MatchPhase::Finished => {}
        }
    }

    /// Apply authoritative fields on a proxy.
    ///
    /// A phase change re-fires the state-changed notification on the
    /// receiving side too.
    pub fn apply_replicated(&mut self, incoming: &MatchState) {
        if self.role.is_authority() {
            return;
        }

        let phase_changed = self.state.phase != incoming.phase;
        self.state = *incoming;
        if phase_changed {
            self.notify();
        }
    }

    fn notify(&self) {
        let event = MatchStateChanged {
            phase: self.state.phase,
            winning_team: self.state.winning_team,
        };

        // No receivers is fine
        let _ = self.events.send(event);

        for hook in &self.presentation {
            hook.match_state_changed(&event);
        }
    }
}
