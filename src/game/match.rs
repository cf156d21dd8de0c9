//! Match hosting and authoritative tick loop

use dashmap::DashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::util::time::{
    tick_delta, unix_millis, Timer, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS,
};
use crate::ws::protocol::{ClientMsg, PlayerInfo, ServerMsg};

use super::character::{CharacterController, ControlRotation};
use super::match_state::{
    CharacterRoster, MatchPhase, MatchStateChanged, MatchStateMachine, NetRole, SharedMatchState,
};
use super::physics::{HitInfo, PhysicsSystem};
use super::snapshot::{roster, state_changed_msg, SnapshotBuilder};
use super::{JoinError, JoinRequest, PlayerInput, TickInput};

/// Largest raw yaw/pitch delta accepted in one input frame (degrees)
const MAX_VIEW_DELTA_DEG: f32 = 180.0;

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub join_tx: mpsc::Sender<JoinRequest>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
    pub player_count: Arc<AtomicUsize>,
    /// Slots promised by matchmaking whose join has not been processed yet
    pub reserved: Arc<AtomicUsize>,
    pub match_state: SharedMatchState,
}

impl MatchHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> MatchPhase {
        self.match_state.read().phase()
    }

    /// Joined players plus outstanding reservations
    pub fn occupancy(&self) -> usize {
        self.player_count() + self.reserved.load(Ordering::Acquire)
    }

    /// Still in the lobby with a free slot
    pub fn is_joinable(&self, max_players: usize) -> bool {
        self.phase() == MatchPhase::Waiting && self.occupancy() < max_players
    }

    /// Hold a slot for a player who is about to send a join request
    pub fn reserve_slot(&self) {
        self.reserved.fetch_add(1, Ordering::AcqRel);
    }

    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            match_id: self.id,
            phase: self.phase(),
            players: self.player_count(),
        }
    }
}

/// Public view of a match for the HTTP API
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub match_id: Uuid,
    pub phase: MatchPhase,
    pub players: usize,
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_players(&self) -> usize {
        self.matches
            .iter()
            .map(|m| m.value().player_count())
            .sum()
    }

    /// Find a lobby that can still take a player
    pub fn find_joinable(&self, max_players: usize) -> Option<MatchHandle> {
        self.matches
            .iter()
            .find(|entry| entry.value().is_joinable(max_players))
            .map(|entry| entry.value().clone())
    }

    pub fn summaries(&self) -> Vec<MatchSummary> {
        let mut list: Vec<MatchSummary> = self
            .matches
            .iter()
            .map(|entry| entry.value().summary())
            .collect();
        list.sort_by_key(|s| s.match_id);
        list
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative game match
pub struct GameMatch {
    id: Uuid,
    config: GameConfig,
    match_state: SharedMatchState,
    state_events: broadcast::Receiver<MatchStateChanged>,
    characters: HashMap<Uuid, CharacterController>,
    inputs: HashMap<Uuid, TickInput>,
    spawn_rng: ChaCha8Rng,
    tick: u64,
    /// Seconds left before the lobby calls StartGame
    lobby_countdown: Option<f32>,
    started_at: Option<u64>,
    input_rx: mpsc::Receiver<PlayerInput>,
    join_rx: mpsc::Receiver<JoinRequest>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    player_count: Arc<AtomicUsize>,
    reserved: Arc<AtomicUsize>,
}

impl GameMatch {
    /// Create a new match
    pub fn new(id: Uuid, seed: u64, config: GameConfig) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (join_tx, join_rx) = mpsc::channel(32);
        let (snapshot_tx, _) = broadcast::channel(64);
        let player_count = Arc::new(AtomicUsize::new(0));
        let reserved = Arc::new(AtomicUsize::new(0));

        let machine = MatchStateMachine::new(NetRole::Authority, config.timings, seed);
        let state_events = machine.subscribe();
        let match_state = machine.into_shared();

        let handle = MatchHandle {
            id,
            input_tx,
            join_tx,
            snapshot_tx: snapshot_tx.clone(),
            player_count: player_count.clone(),
            reserved: reserved.clone(),
            match_state: match_state.clone(),
        };

        let snapshot_interval = SIMULATION_TPS / SNAPSHOT_TPS;
        let game_match = Self {
            id,
            config,
            match_state,
            state_events,
            characters: HashMap::new(),
            inputs: HashMap::new(),
            spawn_rng: ChaCha8Rng::seed_from_u64(seed.rotate_left(17)),
            tick: 0,
            lobby_countdown: None,
            started_at: None,
            input_rx,
            join_rx,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(snapshot_interval),
            player_count,
            reserved,
        };

        (game_match, handle)
    }

    fn phase(&self) -> MatchPhase {
        self.match_state.read().phase()
    }

    /// Run the authoritative tick loop
    pub async fn run(mut self) {
        info!(match_id = %self.id, "Match opened");

        let tick_duration = Duration::from_micros(TICK_DURATION_MICROS);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut had_players = false;

        loop {
            tick_interval.tick().await;
            let timer = Timer::new();

            // Drain input queue
            self.process_inputs();

            // Run simulation tick
            self.run_tick();

            // Build and broadcast snapshot if needed
            if self.snapshot_builder.should_send() {
                self.broadcast_snapshot();
            }

            if timer.elapsed_micros() > TICK_DURATION_MICROS {
                warn!(
                    match_id = %self.id,
                    tick = self.tick,
                    elapsed_us = timer.elapsed_micros(),
                    "Slow tick"
                );
            }

            if self.phase() == MatchPhase::Finished {
                info!(match_id = %self.id, "Match finished");
                break;
            }

            had_players |= !self.characters.is_empty();
            if had_players && self.characters.is_empty() {
                info!(match_id = %self.id, "All players left, closing match");
                break;
            }
        }

        self.broadcast_snapshot();

        let machine = self.match_state.read();
        let duration_secs = self
            .started_at
            .map(|start| (unix_millis().saturating_sub(start) / 1000) as u32)
            .unwrap_or(0);
        let _ = self.snapshot_tx.send(ServerMsg::MatchEnd {
            winning_team: machine.winning_team(),
            tagged_by: machine.tagged_by(),
            duration_secs,
        });
    }

    /// Process pending joins, then all pending inputs from players
    fn process_inputs(&mut self) {
        while let Ok(request) = self.join_rx.try_recv() {
            let outcome = self.handle_join(request.user_id, request.display_name);
            self.release_reservation();
            if let Err(e) = outcome {
                debug!(match_id = %self.id, user_id = %request.user_id, code = e.code(), "Join refused");
            }
            // The session may already be gone
            let _ = request.reply.send(outcome);
        }

        while let Ok(input) = self.input_rx.try_recv() {
            match input.msg {
                ClientMsg::InputTick {
                    seq,
                    move_forward,
                    move_right,
                    turn,
                    turn_rate,
                    look_up,
                    look_up_rate,
                    jump,
                } => {
                    let axes = [move_forward, move_right, turn, turn_rate, look_up, look_up_rate];
                    if axes.iter().any(|v| !v.is_finite()) {
                        warn!(user_id = %input.user_id, seq, "Dropped input with non-finite axis");
                        continue;
                    }

                    let tick_input = TickInput {
                        seq,
                        move_forward: move_forward.clamp(-1.0, 1.0),
                        move_right: move_right.clamp(-1.0, 1.0),
                        turn: turn.clamp(-MAX_VIEW_DELTA_DEG, MAX_VIEW_DELTA_DEG),
                        turn_rate: turn_rate.clamp(-1.0, 1.0),
                        look_up: look_up.clamp(-MAX_VIEW_DELTA_DEG, MAX_VIEW_DELTA_DEG),
                        look_up_rate: look_up_rate.clamp(-1.0, 1.0),
                        jump,
                    };
                    self.handle_input(input.user_id, tick_input);
                }
                ClientMsg::Tackle => {
                    if let Some(character) = self.characters.get_mut(&input.user_id) {
                        character.request_charge();
                    }
                }
                ClientMsg::StartGame => {
                    if self.characters.contains_key(&input.user_id) {
                        debug!(match_id = %self.id, user_id = %input.user_id, "StartGame requested");
                        self.match_state.write().start_game(&mut self.characters);
                    }
                }
                ClientMsg::Ping { t } => {
                    let _ = self.snapshot_tx.send(ServerMsg::Pong { t });
                }
                ClientMsg::LeaveMatch => {
                    self.handle_leave(input.user_id);
                }
            }
        }
    }

    /// Give back one matchmaking reservation, never going below zero
    fn release_reservation(&self) {
        let _ = self
            .reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Spawn a character for a joining player
    fn handle_join(&mut self, user_id: Uuid, display_name: String) -> Result<(), JoinError> {
        if self.characters.contains_key(&user_id) {
            warn!(user_id = %user_id, "Player already in match");
            return Ok(());
        }

        if self.phase() != MatchPhase::Waiting {
            return Err(JoinError::MatchInProgress);
        }

        if self.characters.len() >= self.config.max_players {
            return Err(JoinError::MatchFull);
        }

        let mut character = CharacterController::new(
            user_id,
            display_name,
            NetRole::Authority,
            self.config.character,
            Some(&self.match_state),
        );

        let angle = self.spawn_rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = self.spawn_rng.gen_range(300.0..1200.0_f32);
        character.movement.x = angle.cos() * distance;
        character.movement.y = angle.sin() * distance;
        // Face the arena center
        character.possess(ControlRotation {
            yaw: (angle.to_degrees() + 180.0).rem_euclid(360.0),
            pitch: 0.0,
        });
        character.begin_play();

        let player_info = PlayerInfo {
            user_id,
            display_name: character.display_name().to_string(),
            team: character.team(),
        };

        self.characters.insert(user_id, character);
        self.inputs.insert(user_id, TickInput::default());
        self.player_count
            .store(self.characters.len(), Ordering::Release);

        // Notify all players of the new player
        let _ = self.snapshot_tx.send(ServerMsg::PlayerJoined {
            player: player_info,
        });

        let _ = self.snapshot_tx.send(ServerMsg::MatchJoined {
            match_id: self.id,
            players: roster(&self.characters),
        });

        info!(
            match_id = %self.id,
            user_id = %user_id,
            player_count = self.characters.len(),
            "Player joined match"
        );
        Ok(())
    }

    /// Keep the newest input per player
    fn handle_input(&mut self, user_id: Uuid, input: TickInput) {
        if let Some(current) = self.inputs.get_mut(&user_id) {
            if input.seq > current.seq {
                *current = input;
            }
        }
    }

    /// Handle player leave
    fn handle_leave(&mut self, user_id: Uuid) {
        let Some(character) = self.characters.remove(&user_id) else {
            return;
        };
        self.inputs.remove(&user_id);
        self.player_count
            .store(self.characters.len(), Ordering::Release);

        let _ = self.snapshot_tx.send(ServerMsg::PlayerLeft {
            user_id,
            reason: "disconnected".to_string(),
        });

        info!(
            match_id = %self.id,
            user_id = %user_id,
            team = ?character.team(),
            "Player left match"
        );
    }

    /// Run a single simulation tick
    fn run_tick(&mut self) {
        let dt = tick_delta();
        self.tick += 1;

        self.update_lobby(dt);
        self.match_state.write().advance(dt);

        self.apply_inputs(dt);
        for character in self.characters.values_mut() {
            character.advance(dt);
            PhysicsSystem::integrate(&mut character.movement, dt);
        }

        self.resolve_contacts();
        self.flush_state_events();
    }

    /// Lobby countdown, calls StartGame once enough players are in
    fn update_lobby(&mut self, dt: f32) {
        if self.phase() != MatchPhase::Waiting {
            self.lobby_countdown = None;
            return;
        }

        if self.characters.len() < self.config.min_players {
            if self.lobby_countdown.take().is_some() {
                debug!(match_id = %self.id, "Lobby countdown cancelled");
            }
            return;
        }

        let remaining = self
            .lobby_countdown
            .get_or_insert(self.config.lobby_wait_secs);
        *remaining -= dt;
        if *remaining <= 0.0 {
            self.lobby_countdown = None;
            self.match_state.write().start_game(&mut self.characters);
        }
    }

    fn apply_inputs(&mut self, dt: f32) {
        for (user_id, input) in self.inputs.iter_mut() {
            let Some(character) = self.characters.get_mut(user_id) else {
                continue;
            };

            character.move_forward(input.move_forward);
            character.move_right(input.move_right);
            if input.turn != 0.0 {
                character.add_controller_yaw_input(input.turn);
            }
            if input.turn_rate != 0.0 {
                character.turn_at_rate(input.turn_rate, dt);
            }
            if input.look_up != 0.0 {
                character.add_controller_pitch_input(input.look_up);
            }
            if input.look_up_rate != 0.0 {
                character.look_up_at_rate(input.look_up_rate, dt);
            }
            if input.jump {
                character.jump();
            }

            // Deltas and presses are consumed once
            input.turn = 0.0;
            input.look_up = 0.0;
            input.jump = false;
        }
    }

    /// Separate overlapping characters and report the hits
    fn resolve_contacts(&mut self) {
        let ids = self.characters.active_characters();
        let mut contacts: Vec<(Uuid, Uuid, HitInfo)> = Vec::new();

        for (i, a_id) in ids.iter().enumerate() {
            for b_id in &ids[i + 1..] {
                let a = &self.characters[a_id];
                let b = &self.characters[b_id];
                if let Some(hit) = PhysicsSystem::check_capsule_contact(&a.movement, &b.movement) {
                    contacts.push((*a_id, *b_id, hit));
                }
            }
        }

        for (a_id, b_id, hit) in contacts {
            let impulse = (hit.normal.0 * hit.penetration, hit.normal.1 * hit.penetration);
            let mirrored = HitInfo {
                normal: (-hit.normal.0, -hit.normal.1),
                penetration: hit.penetration,
            };

            if let (Some(a), Some(b)) = (self.characters.get(&a_id), self.characters.get(&b_id)) {
                a.on_hit(b, impulse, &hit);
                b.on_hit(a, (-impulse.0, -impulse.1), &mirrored);
            }

            let mut a_move = self.characters[&a_id].movement.clone();
            let mut b_move = self.characters[&b_id].movement.clone();
            PhysicsSystem::resolve_contact(&mut a_move, &mut b_move, &hit);
            if let Some(a) = self.characters.get_mut(&a_id) {
                a.movement = a_move;
            }
            if let Some(b) = self.characters.get_mut(&b_id) {
                b.movement = b_move;
            }
        }
    }

    /// Forward state-changed events to clients as reliable messages
    fn flush_state_events(&mut self) {
        loop {
            match self.state_events.try_recv() {
                Ok(event) => {
                    if event.phase == MatchPhase::Playing {
                        self.started_at = Some(unix_millis());
                    }
                    info!(
                        match_id = %self.id,
                        phase = ?event.phase,
                        winning_team = ?event.winning_team,
                        "Match state changed"
                    );
                    let _ = self
                        .snapshot_tx
                        .send(state_changed_msg(&event, &self.characters));
                    self.snapshot_builder.force_next();
                }
                Err(TryRecvError::Lagged(n)) => {
                    warn!(match_id = %self.id, skipped = n, "State events lagged");
                }
                Err(_) => break,
            }
        }
    }

    fn broadcast_snapshot(&mut self) {
        let seqs: HashMap<Uuid, u32> = self
            .inputs
            .iter()
            .map(|(id, input)| (*id, input.seq))
            .collect();
        let match_state = self.match_state.read().state();
        let snapshot = self
            .snapshot_builder
            .build(self.tick, match_state, &self.characters, &seqs);

        // Broadcast to all connected clients
        let _ = self.snapshot_tx.send(snapshot);
    }
}
