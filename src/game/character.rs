//! Per-player character controller
//!
//! Gates movement on the match phase and on the charge ability, runs the
//! charge dash, and reports tags to the match state machine.
//!
//! On the server every character is the authority. The proxy path
//! (`drain_requests`, `apply_replicated`) is what a client build drives and
//! is covered by the tests below.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::match_state::{
    CharacterRoster, MatchLink, MatchPhase, NetRole, SharedMatchState, Team,
};
use super::physics::{HitInfo, MovementComponent, MovementSink};
use crate::ws::protocol::CharacterSnapshot;

/// Movement and ability tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterTuning {
    pub walk_speed: f32,
    pub chaser_walk_speed: f32,
    pub run_speed: f32,
    /// Flat bonus added on top of the team speed every tick
    pub powerup_speed: f32,
    /// Forced dash duration
    pub charge_secs: f32,
    /// Time before steering comes back, counted from the start of the dash
    pub charge_cooldown_secs: f32,
    /// Degrees per second at full turn rate input
    pub base_turn_rate: f32,
    /// Degrees per second at full look rate input
    pub base_look_up_rate: f32,
    /// Yaw input divisor while a charge is running
    pub charge_turn_divisor: f32,
}

impl Default for CharacterTuning {
    fn default() -> Self {
        Self {
            walk_speed: 600.0,
            chaser_walk_speed: 500.0,
            run_speed: 1000.0,
            powerup_speed: 0.0,
            charge_secs: 5.0,
            charge_cooldown_secs: 7.0,
            base_turn_rate: 45.0,
            base_look_up_rate: 45.0,
            charge_turn_divisor: 8.0,
        }
    }
}

impl CharacterTuning {
    /// Base walk speed for a team, without the powerup bonus
    pub fn base_speed_for(&self, team: Team) -> f32 {
        match team {
            Team::Chaser => self.chaser_walk_speed,
            Team::Victim => self.walk_speed,
        }
    }
}

/// View rotation of the possessing controller, in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlRotation {
    pub yaw: f32,
    pub pitch: f32,
}

impl ControlRotation {
    /// Planar forward axis for the current yaw
    pub fn forward(&self) -> (f32, f32) {
        let yaw = self.yaw.to_radians();
        (yaw.cos(), yaw.sin())
    }

    /// Planar right axis for the current yaw
    pub fn right(&self) -> (f32, f32) {
        let yaw = self.yaw.to_radians();
        (-yaw.sin(), yaw.cos())
    }
}

/// Ability request a proxy hands to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityRequest {
    Charge,
}

pub struct CharacterController {
    id: Uuid,
    display_name: String,
    role: NetRole,
    tuning: CharacterTuning,

    // Replicated, authority-written
    team: Team,
    input_enabled: bool,
    charge_timer: f32,
    charge_cooldown_timer: f32,

    pub movement: MovementComponent,
    controller: Option<ControlRotation>,
    match_state: Option<MatchLink>,
    outbox: Vec<AbilityRequest>,
}

impl CharacterController {
    pub fn new(
        id: Uuid,
        display_name: String,
        role: NetRole,
        tuning: CharacterTuning,
        match_state: Option<&SharedMatchState>,
    ) -> Self {
        Self {
            id,
            display_name,
            role,
            tuning,
            team: Team::Chaser,
            input_enabled: true,
            charge_timer: 0.0,
            charge_cooldown_timer: 0.0,
            movement: MovementComponent::default(),
            controller: None,
            match_state: match_state.map(Arc::downgrade),
            outbox: Vec::new(),
        }
    }

    /// Spawn-time setup
    pub fn begin_play(&mut self) {
        if !self.role.is_authority() {
            return;
        }
        self.movement.max_walk_speed = self.tuning.walk_speed;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn team(&self) -> Team {
        self.team
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn charge_timer(&self) -> f32 {
        self.charge_timer
    }

    pub fn charge_cooldown_timer(&self) -> f32 {
        self.charge_cooldown_timer
    }

    pub fn max_speed(&self) -> f32 {
        self.movement.max_walk_speed
    }

    pub fn control_rotation(&self) -> Option<ControlRotation> {
        self.controller
    }

    /// Attach a controller; unpossessed characters ignore steering
    pub fn possess(&mut self, rotation: ControlRotation) {
        self.controller = Some(rotation);
    }

    pub fn unpossess(&mut self) {
        self.controller = None;
    }

    /// Team is written only by StartGame
    pub(crate) fn assign_team(&mut self, team: Team) {
        self.team = team;
    }

    fn current_phase(&self) -> Option<MatchPhase> {
        let shared = self.match_state.as_ref()?.upgrade()?;
        let phase = shared.read().phase();
        Some(phase)
    }

    /// Whether this character may act right now.
    ///
    /// `check_only_state` skips the charge lockout and looks at the match
    /// phase alone. Without a reachable match everything is allowed.
    pub fn is_movement_enabled(&self, check_only_state: bool) -> bool {
        if !check_only_state && !self.input_enabled {
            return false;
        }

        match self.current_phase() {
            Some(phase) => match self.team {
                Team::Victim => matches!(phase, MatchPhase::Setup | MatchPhase::Playing),
                Team::Chaser => phase == MatchPhase::Playing,
            },
            None => true,
        }
    }

    pub fn move_forward(&mut self, value: f32) {
        if value == 0.0 || !self.is_movement_enabled(false) {
            return;
        }
        if let Some(rotation) = self.controller {
            self.movement.add_movement_input(rotation.forward(), value);
        }
    }

    pub fn move_right(&mut self, value: f32) {
        if value == 0.0 || !self.is_movement_enabled(false) {
            return;
        }
        if let Some(rotation) = self.controller {
            self.movement.add_movement_input(rotation.right(), value);
        }
    }

    /// Rate-based turn (analog stick), `rate` is normalized
    pub fn turn_at_rate(&mut self, rate: f32, dt: f32) {
        if self.is_movement_enabled(false) {
            self.add_controller_yaw_input(rate * self.tuning.base_turn_rate * dt);
        }
    }

    /// Rate-based look up/down, `rate` is normalized
    pub fn look_up_at_rate(&mut self, rate: f32, dt: f32) {
        if self.is_movement_enabled(false) {
            self.add_controller_pitch_input(rate * self.tuning.base_look_up_rate * dt);
        }
    }

    /// Raw yaw delta. Stays available during the charge lockout but is
    /// slowed while the dash runs.
    pub fn add_controller_yaw_input(&mut self, value: f32) {
        if !self.is_movement_enabled(true) {
            return;
        }
        let divisor = if self.charge_timer > 0.0 {
            self.tuning.charge_turn_divisor
        } else {
            1.0
        };
        if let Some(rotation) = self.controller.as_mut() {
            rotation.yaw = (rotation.yaw + value / divisor).rem_euclid(360.0);
        }
    }

    pub fn add_controller_pitch_input(&mut self, value: f32) {
        if !self.is_movement_enabled(true) {
            return;
        }
        if let Some(rotation) = self.controller.as_mut() {
            rotation.pitch = (rotation.pitch + value).clamp(-89.0, 89.0);
        }
    }

    pub fn jump(&mut self) {
        if self.is_movement_enabled(false) {
            self.movement.jump();
        }
    }

    /// Tackle button.
    ///
    /// On the authority the request is validated and executed in place. A
    /// proxy only queues it for the transport and changes nothing locally.
    pub fn request_charge(&mut self) {
        if !self.role.is_authority() {
            self.outbox.push(AbilityRequest::Charge);
            return;
        }

        if Self::validate_charge() {
            self.execute_charge();
        }
    }

    /// Requests waiting to be sent to the authority
    pub fn drain_requests(&mut self) -> Vec<AbilityRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Request-level validation, independent of live state
    fn validate_charge() -> bool {
        true
    }

    fn execute_charge(&mut self) {
        if !self.is_movement_enabled(true) || self.team != Team::Chaser {
            debug!(character = %self.id, team = ?self.team, "Charge rejected");
            return;
        }

        self.charge_timer = self.tuning.charge_secs;
        self.charge_cooldown_timer = self.tuning.charge_cooldown_secs;
        self.input_enabled = false;
        self.movement.max_walk_speed = self.tuning.run_speed;

        debug!(character = %self.id, "Charge started");
    }

    /// Per-frame update. Speed cap is rebuilt from scratch each call.
    pub fn advance(&mut self, dt: f32) {
        if self.charge_cooldown_timer > 0.0 {
            self.movement.max_walk_speed = self.tuning.run_speed;

            if let Some(rotation) = self.controller {
                // Forced dash, fades out with the charge timer
                self.movement
                    .add_movement_input(rotation.forward(), self.charge_timer);
            }

            if self.charge_timer > 0.0 {
                self.charge_timer -= dt;
            } else {
                self.charge_timer = 0.0;
            }

            self.charge_cooldown_timer -= dt;
        } else {
            self.input_enabled = true;
            self.movement.max_walk_speed = self.tuning.base_speed_for(self.team);
        }

        self.movement.max_walk_speed += self.tuning.powerup_speed;
    }

    /// Contact with another character. Authority only.
    pub fn on_hit(&self, other: &CharacterController, _impulse: (f32, f32), _hit: &HitInfo) {
        if !self.role.is_authority() || self.team == Team::Victim {
            return;
        }

        let Some(shared) = self.match_state.as_ref().and_then(|link| link.upgrade()) else {
            return;
        };

        if shared.read().phase() != MatchPhase::Playing {
            return;
        }

        if other.team == Team::Victim {
            info!(chaser = %self.id, victim = %other.id, "Victim tagged");
            shared.write().finish_game(self.id);
        }
    }

    /// Replicated view for observers
    pub fn snapshot(&self, last_input_seq: u32) -> CharacterSnapshot {
        let rotation = self.control_rotation().unwrap_or_default();
        CharacterSnapshot {
            user_id: self.id,
            team: self.team,
            input_enabled: self.input_enabled,
            charge_timer: self.charge_timer,
            charge_cooldown_timer: self.charge_cooldown_timer,
            x: self.movement.x,
            y: self.movement.y,
            z: self.movement.z,
            yaw: rotation.yaw,
            vel_x: self.movement.vel_x,
            vel_y: self.movement.vel_y,
            max_speed: self.movement.max_walk_speed,
            last_input_seq,
        }
    }

    /// Apply authoritative fields on a proxy
    pub fn apply_replicated(&mut self, snapshot: &CharacterSnapshot) {
        if self.role.is_authority() || snapshot.user_id != self.id {
            return;
        }

        self.team = snapshot.team;
        self.input_enabled = snapshot.input_enabled;
        self.charge_timer = snapshot.charge_timer;
        self.charge_cooldown_timer = snapshot.charge_cooldown_timer;
        self.movement.x = snapshot.x;
        self.movement.y = snapshot.y;
        self.movement.z = snapshot.z;
        self.movement.vel_x = snapshot.vel_x;
        self.movement.vel_y = snapshot.vel_y;
    }
}

impl CharacterRoster for HashMap<Uuid, CharacterController> {
    fn active_characters(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.keys().copied().collect();
        ids.sort();
        ids
    }

    fn assign_team(&mut self, id: Uuid, team: Team) {
        if let Some(character) = self.get_mut(&id) {
            character.assign_team(team);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::match_state::{MatchStateMachine, MatchTimings};

    const DT: f32 = 1.0;

    fn shared_match() -> SharedMatchState {
        MatchStateMachine::new(NetRole::Authority, MatchTimings::default(), 3).into_shared()
    }

    fn character(shared: Option<&SharedMatchState>, team: Team) -> CharacterController {
        let mut c = CharacterController::new(
            Uuid::new_v4(),
            "tester".to_string(),
            NetRole::Authority,
            CharacterTuning::default(),
            shared,
        );
        c.assign_team(team);
        c.possess(ControlRotation::default());
        c.begin_play();
        c
    }

    /// Drive the shared match into `phase` with a throwaway roster
    fn enter_phase(shared: &SharedMatchState, phase: MatchPhase) {
        let mut roster: HashMap<Uuid, CharacterController> = HashMap::new();
        let filler = character(None, Team::Chaser);
        roster.insert(filler.id(), filler);

        let mut machine = shared.write();
        if phase == MatchPhase::Waiting {
            return;
        }
        machine.start_game(&mut roster);
        while machine.phase() != phase {
            machine.advance(1.0);
        }
    }

    fn hit() -> HitInfo {
        HitInfo {
            normal: (1.0, 0.0),
            penetration: 1.0,
        }
    }

    #[test]
    fn begin_play_sets_walk_speed() {
        let c = character(None, Team::Chaser);
        assert_eq!(c.max_speed(), 600.0);
        assert!(c.input_enabled());
    }

    #[test]
    fn movement_gate_by_team_and_phase() {
        let cases = [
            (MatchPhase::Waiting, false, false),
            (MatchPhase::Setup, true, false),
            (MatchPhase::Playing, true, true),
            (MatchPhase::Finished, false, false),
        ];

        for (phase, victim_moves, chaser_moves) in cases {
            let shared = shared_match();
            enter_phase(&shared, phase);
            let victim = character(Some(&shared), Team::Victim);
            let chaser = character(Some(&shared), Team::Chaser);

            assert_eq!(victim.is_movement_enabled(false), victim_moves, "victim in {:?}", phase);
            assert_eq!(chaser.is_movement_enabled(false), chaser_moves, "chaser in {:?}", phase);
        }
    }

    #[test]
    fn disabled_input_blocks_full_check_in_every_phase() {
        let phases = [
            MatchPhase::Waiting,
            MatchPhase::Setup,
            MatchPhase::Playing,
            MatchPhase::Finished,
        ];

        for phase in phases {
            let shared = shared_match();
            enter_phase(&shared, phase);

            for team in [Team::Victim, Team::Chaser] {
                let mut c = character(Some(&shared), team);
                let phase_allows = c.is_movement_enabled(true);
                c.input_enabled = false;

                assert!(!c.is_movement_enabled(false), "{:?} in {:?}", team, phase);
                // The state-only check ignores the lockout
                assert_eq!(c.is_movement_enabled(true), phase_allows, "{:?} in {:?}", team, phase);
            }
        }

        // Also without a reachable match
        let mut orphan = character(None, Team::Victim);
        orphan.input_enabled = false;
        assert!(!orphan.is_movement_enabled(false));
    }

    #[test]
    fn fail_open_without_match() {
        let c = character(None, Team::Chaser);
        assert!(c.is_movement_enabled(false));

        let shared = shared_match();
        let orphan = character(Some(&shared), Team::Chaser);
        drop(shared);
        assert!(orphan.is_movement_enabled(false));
    }

    #[test]
    fn move_inputs_respect_gate_and_controller() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Setup);

        let mut chaser = character(Some(&shared), Team::Chaser);
        chaser.move_forward(1.0);
        assert_eq!(chaser.movement.pending_input(), (0.0, 0.0));

        let mut victim = character(Some(&shared), Team::Victim);
        victim.move_forward(1.0);
        victim.move_right(0.0);
        let (x, y) = victim.movement.pending_input();
        assert!((x - 1.0).abs() < 1e-6 && y.abs() < 1e-6);

        victim.unpossess();
        victim.move_right(1.0);
        let (x2, y2) = victim.movement.pending_input();
        assert_eq!((x2, y2), (x, y));
    }

    #[test]
    fn charge_sets_timers_and_run_speed() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Playing);
        let mut c = character(Some(&shared), Team::Chaser);

        c.request_charge();

        assert_eq!(c.charge_timer(), 5.0);
        assert_eq!(c.charge_cooldown_timer(), 7.0);
        assert!(!c.input_enabled());
        assert_eq!(c.max_speed(), 1000.0);
    }

    #[test]
    fn charge_sequence_over_cooldown() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Playing);
        let mut c = character(Some(&shared), Team::Chaser);
        c.request_charge();

        for second in 1..=7 {
            c.advance(DT);
            assert!(c.charge_timer() >= 0.0);
            if second < 5 {
                assert!(c.charge_timer() > 0.0, "still charging after {}s", second);
            } else {
                assert_eq!(c.charge_timer(), 0.0, "clamped after {}s", second);
            }
            assert!(!c.input_enabled());
            assert_eq!(c.max_speed(), 1000.0);
        }

        // Cooldown hit zero on the last step, next tick restores control
        assert!(c.charge_cooldown_timer() <= 0.0);
        c.advance(DT);
        assert!(c.input_enabled());
        assert_eq!(c.max_speed(), 500.0);
    }

    #[test]
    fn speed_includes_powerup_without_compounding() {
        let tuning = CharacterTuning {
            powerup_speed: 100.0,
            ..CharacterTuning::default()
        };
        let mut c = CharacterController::new(
            Uuid::new_v4(),
            "fast".to_string(),
            NetRole::Authority,
            tuning,
            None,
        );
        c.assign_team(Team::Victim);

        for _ in 0..5 {
            c.advance(DT);
            assert_eq!(c.max_speed(), 700.0);
        }

        c.request_charge();
        assert_eq!(c.charge_timer(), 0.0, "victims cannot charge");

        c.assign_team(Team::Chaser);
        c.request_charge();
        c.advance(DT);
        assert_eq!(c.max_speed(), 1100.0);
    }

    #[test]
    fn charge_rejected_for_victim_or_frozen_chaser() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Playing);
        let mut victim = character(Some(&shared), Team::Victim);
        victim.request_charge();
        assert_eq!(victim.charge_timer(), 0.0);
        assert_eq!(victim.charge_cooldown_timer(), 0.0);
        assert!(victim.input_enabled());
        assert_eq!(victim.max_speed(), 600.0);

        let setup = shared_match();
        enter_phase(&setup, MatchPhase::Setup);
        let mut frozen = character(Some(&setup), Team::Chaser);
        frozen.request_charge();
        assert_eq!(frozen.charge_timer(), 0.0);
        assert!(frozen.input_enabled());
    }

    #[test]
    fn charge_can_be_reissued_during_lockout() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Playing);
        let mut c = character(Some(&shared), Team::Chaser);
        c.request_charge();
        c.advance(DT);
        c.advance(DT);

        // State-only check ignores the lockout, last write wins
        c.request_charge();
        assert_eq!(c.charge_timer(), 5.0);
        assert_eq!(c.charge_cooldown_timer(), 7.0);
    }

    #[test]
    fn dash_pushes_forward_while_charging() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Playing);
        let mut c = character(Some(&shared), Team::Chaser);
        c.request_charge();
        c.advance(0.1);
        let (x, _) = c.movement.pending_input();
        assert!((x - 5.0).abs() < 1e-5);
    }

    #[test]
    fn yaw_slowed_while_charging() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Playing);
        let mut c = character(Some(&shared), Team::Chaser);

        c.add_controller_yaw_input(16.0);
        assert_eq!(c.control_rotation().unwrap().yaw, 16.0);

        c.request_charge();
        c.add_controller_yaw_input(16.0);
        assert_eq!(c.control_rotation().unwrap().yaw, 18.0);

        // Rate turning needs the full gate and is blocked by the lockout
        c.turn_at_rate(1.0, 1.0);
        assert_eq!(c.control_rotation().unwrap().yaw, 18.0);
    }

    #[test]
    fn look_inputs_follow_gate() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Waiting);
        let mut c = character(Some(&shared), Team::Chaser);
        c.look_up_at_rate(1.0, 1.0);
        c.add_controller_pitch_input(10.0);
        assert_eq!(c.control_rotation().unwrap().pitch, 0.0);

        let playing = shared_match();
        enter_phase(&playing, MatchPhase::Playing);
        let mut c = character(Some(&playing), Team::Chaser);
        c.look_up_at_rate(1.0, 0.5);
        assert_eq!(c.control_rotation().unwrap().pitch, 22.5);
    }

    #[test]
    fn jump_is_gated() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Setup);
        let mut chaser = character(Some(&shared), Team::Chaser);
        chaser.jump();
        crate::game::physics::PhysicsSystem::integrate(&mut chaser.movement, 0.1);
        assert_eq!(chaser.movement.z, 0.0);

        let mut victim = character(Some(&shared), Team::Victim);
        victim.jump();
        crate::game::physics::PhysicsSystem::integrate(&mut victim.movement, 0.1);
        assert!(victim.movement.z > 0.0);
    }

    #[test]
    fn chaser_tagging_victim_finishes_once() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Playing);
        let mut rx = shared.read().subscribe();

        let chaser = character(Some(&shared), Team::Chaser);
        let victim = character(Some(&shared), Team::Victim);

        chaser.on_hit(&victim, (0.0, 0.0), &hit());
        chaser.on_hit(&victim, (0.0, 0.0), &hit());

        let machine = shared.read();
        assert_eq!(machine.phase(), MatchPhase::Finished);
        assert_eq!(machine.winning_team(), Team::Chaser);
        assert_eq!(machine.tagged_by(), Some(chaser.id()));

        let finished: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|e| e.phase == MatchPhase::Finished)
            .collect();
        assert_eq!(finished.len(), 1);
    }

    #[test]
    fn hits_that_do_not_tag() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Playing);
        let chaser = character(Some(&shared), Team::Chaser);
        let other_chaser = character(Some(&shared), Team::Chaser);
        let victim = character(Some(&shared), Team::Victim);

        victim.on_hit(&chaser, (0.0, 0.0), &hit());
        chaser.on_hit(&other_chaser, (0.0, 0.0), &hit());
        assert_eq!(shared.read().phase(), MatchPhase::Playing);

        let setup = shared_match();
        enter_phase(&setup, MatchPhase::Setup);
        let chaser = character(Some(&setup), Team::Chaser);
        let victim = character(Some(&setup), Team::Victim);
        chaser.on_hit(&victim, (0.0, 0.0), &hit());
        assert_eq!(setup.read().phase(), MatchPhase::Setup);
    }

    #[test]
    fn proxy_queues_charge_without_local_change() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Playing);
        let mut proxy = CharacterController::new(
            Uuid::new_v4(),
            "remote".to_string(),
            NetRole::SimulatedProxy,
            CharacterTuning::default(),
            Some(&shared),
        );

        proxy.request_charge();

        assert_eq!(proxy.charge_timer(), 0.0);
        assert!(proxy.input_enabled());
        assert_eq!(proxy.drain_requests(), vec![AbilityRequest::Charge]);
        assert!(proxy.drain_requests().is_empty());
    }

    #[test]
    fn proxy_applies_replicated_fields() {
        let shared = shared_match();
        enter_phase(&shared, MatchPhase::Playing);
        let mut server = character(Some(&shared), Team::Chaser);
        server.request_charge();

        let mut proxy = CharacterController::new(
            server.id(),
            "remote".to_string(),
            NetRole::SimulatedProxy,
            CharacterTuning::default(),
            None,
        );
        proxy.apply_replicated(&server.snapshot(4));

        assert_eq!(proxy.team(), Team::Chaser);
        assert!(!proxy.input_enabled());
        assert_eq!(proxy.charge_timer(), 5.0);
        assert_eq!(proxy.charge_cooldown_timer(), 7.0);
    }

    #[test]
    fn roster_assigns_by_id() {
        let mut roster: HashMap<Uuid, CharacterController> = HashMap::new();
        for _ in 0..3 {
            let c = character(None, Team::Chaser);
            roster.insert(c.id(), c);
        }
        let ids = roster.active_characters();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);

        roster.assign_team(ids[1], Team::Victim);
        assert_eq!(roster[&ids[1]].team(), Team::Victim);
    }
}
