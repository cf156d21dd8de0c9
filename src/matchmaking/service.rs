//! Matchmaking service - finds or opens a lobby for each player

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::game::{GameMatch, MatchHandle, MatchRegistry};

/// Matchmaking service
pub struct MatchmakingService {
    registry: Arc<MatchRegistry>,
    config: GameConfig,
    /// Serializes lobby selection so two players never race into a new match
    assign_lock: Mutex<()>,
}

impl MatchmakingService {
    pub fn new(registry: Arc<MatchRegistry>, config: GameConfig) -> Self {
        Self {
            registry,
            config,
            assign_lock: Mutex::new(()),
        }
    }

    /// Pick a lobby for `user_id` and reserve a slot in it, opening a new
    /// match when none has room. The reservation is released once the match
    /// processes the player's join request.
    pub async fn assign(&self, user_id: Uuid) -> MatchHandle {
        let _guard = self.assign_lock.lock().await;

        let handle = match self.registry.find_joinable(self.config.max_players) {
            Some(handle) => {
                info!(user_id = %user_id, match_id = %handle.id, "Assigned to open lobby");
                handle
            }
            None => {
                let handle = self.create_match();
                info!(user_id = %user_id, match_id = %handle.id, "Assigned to new lobby");
                handle
            }
        };

        handle.reserve_slot();
        handle
    }

    /// Create a match and spawn its tick loop
    fn create_match(&self) -> MatchHandle {
        let match_id = Uuid::new_v4();
        let seed = rand::random::<u64>();

        let (game_match, handle) = GameMatch::new(match_id, seed, self.config.clone());
        self.registry.insert(handle.clone());

        info!(match_id = %match_id, seed, "Created new match");

        let registry = self.registry.clone();
        tokio::spawn(async move {
            game_match.run().await;

            // Cleanup after match ends
            registry.remove(&match_id);
            info!(match_id = %match_id, "Match removed from registry");
        });

        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn service(max_players: usize) -> (MatchmakingService, Arc<MatchRegistry>) {
        let registry = Arc::new(MatchRegistry::new());
        let config = GameConfig {
            min_players: max_players,
            max_players,
            ..GameConfig::default()
        };
        (MatchmakingService::new(registry.clone(), config), registry)
    }

    #[tokio::test]
    async fn players_share_a_lobby_until_full() {
        let (service, registry) = service(2);

        let first = service.assign(Uuid::new_v4()).await;
        let second = service.assign(Uuid::new_v4()).await;
        assert_eq!(first.id, second.id);
        assert_eq!(first.occupancy(), 2);
        assert_eq!(registry.active_matches(), 1);

        let third = service.assign(Uuid::new_v4()).await;
        assert_ne!(third.id, first.id);
        assert_eq!(registry.active_matches(), 2);
    }

    #[tokio::test]
    async fn burst_of_assignments_never_overfills() {
        let (service, registry) = service(2);

        // None of these joins reach a tick before the next assignment
        let mut per_match: HashMap<Uuid, usize> = HashMap::new();
        for _ in 0..5 {
            let handle = service.assign(Uuid::new_v4()).await;
            *per_match.entry(handle.id).or_default() += 1;
        }

        assert!(per_match.values().all(|&n| n <= 2), "{:?}", per_match);
        assert_eq!(per_match.len(), 3);
        assert_eq!(registry.active_matches(), 3);
    }
}
