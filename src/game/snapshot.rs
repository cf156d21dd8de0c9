//! Replication of authoritative state to observers

use std::collections::HashMap;
use uuid::Uuid;

use crate::ws::protocol::{CharacterSnapshot, PlayerInfo, ServerMsg};

use super::character::CharacterController;
use super::match_state::{MatchState, MatchStateChanged};

/// Builds periodic snapshots for network transmission
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (phase changes, tags)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a full snapshot message
    pub fn build(
        &self,
        tick: u64,
        match_state: MatchState,
        characters: &HashMap<Uuid, CharacterController>,
        input_seqs: &HashMap<Uuid, u32>,
    ) -> ServerMsg {
        let mut snapshots: Vec<CharacterSnapshot> = characters
            .values()
            .map(|c| c.snapshot(input_seqs.get(&c.id()).copied().unwrap_or(0)))
            .collect();
        snapshots.sort_by_key(|s| s.user_id);

        ServerMsg::Snapshot {
            tick,
            match_state,
            characters: snapshots,
        }
    }
}

/// Roster with current teams, ordered by id
pub fn roster(characters: &HashMap<Uuid, CharacterController>) -> Vec<PlayerInfo> {
    let mut players: Vec<PlayerInfo> = characters
        .values()
        .map(|c| PlayerInfo {
            user_id: c.id(),
            display_name: c.display_name().to_string(),
            team: c.team(),
        })
        .collect();
    players.sort_by_key(|p| p.user_id);
    players
}

/// Reliable notification for a phase/winner change
pub fn state_changed_msg(
    event: &MatchStateChanged,
    characters: &HashMap<Uuid, CharacterController>,
) -> ServerMsg {
    ServerMsg::MatchStateChanged {
        phase: event.phase,
        winning_team: event.winning_team,
        teams: roster(characters),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::character::CharacterTuning;
    use crate::game::match_state::{MatchPhase, NetRole, Team};

    fn characters(count: usize) -> HashMap<Uuid, CharacterController> {
        (0..count)
            .map(|i| {
                let id = Uuid::new_v4();
                let c = CharacterController::new(
                    id,
                    format!("p{}", i),
                    NetRole::Authority,
                    CharacterTuning::default(),
                    None,
                );
                (id, c)
            })
            .collect()
    }

    #[test]
    fn interval_gates_sending() {
        let mut builder = SnapshotBuilder::new(3);
        let sent: Vec<bool> = (0..6).map(|_| builder.should_send()).collect();
        assert_eq!(sent, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn force_next_sends_immediately() {
        let mut builder = SnapshotBuilder::new(10);
        assert!(!builder.should_send());
        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn snapshot_carries_replicated_fields() {
        let chars = characters(3);
        let seqs: HashMap<Uuid, u32> = chars.keys().map(|id| (*id, 9)).collect();
        let state = MatchState {
            phase: MatchPhase::Setup,
            time_until_next_phase: 4.5,
            winning_team: Team::Chaser,
        };

        let msg = SnapshotBuilder::new(2).build(42, state, &chars, &seqs);

        match msg {
            ServerMsg::Snapshot {
                tick,
                match_state,
                characters,
            } => {
                assert_eq!(tick, 42);
                assert_eq!(match_state, state);
                assert_eq!(characters.len(), 3);
                assert!(characters.windows(2).all(|w| w[0].user_id < w[1].user_id));
                for c in &characters {
                    assert_eq!(c.last_input_seq, 9);
                    assert!(c.input_enabled);
                    assert_eq!(c.team, Team::Chaser);
                    assert_eq!(c.charge_timer, 0.0);
                    assert_eq!(c.charge_cooldown_timer, 0.0);
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn state_change_lists_teams() {
        let chars = characters(2);
        let event = MatchStateChanged {
            phase: MatchPhase::Finished,
            winning_team: Team::Victim,
        };
        match state_changed_msg(&event, &chars) {
            ServerMsg::MatchStateChanged {
                phase,
                winning_team,
                teams,
            } => {
                assert_eq!(phase, MatchPhase::Finished);
                assert_eq!(winning_team, Team::Victim);
                assert_eq!(teams.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
