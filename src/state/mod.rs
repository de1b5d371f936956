mod game;
mod round;
mod score;
pub mod selection;
pub mod statement;
mod vote;

pub use round::start_round;
pub use score::{score_ledger, ScoreEntry, Tally};
pub use statement::StatementPool;
pub use vote::record_vote;

use crate::auth::{Session, SessionRegistry};
use crate::config::AppConfig;
use crate::error::{GameError, GameResult};
use crate::store::{GameRepository, InMemoryRepository};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Shared application state
///
/// Every mutation of a game runs as load, change a copy, save, while holding
/// that game's lock. Games never share a lock.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn GameRepository>,
    pub statements: Arc<StatementPool>,
    pub sessions: SessionRegistry,
    pub default_secs_per_round: u32,
    game_locks: Arc<Mutex<HashMap<GameId, Arc<Mutex<()>>>>>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn GameRepository>,
        statements: StatementPool,
        config: &AppConfig,
    ) -> Self {
        Self {
            repo,
            statements: Arc::new(statements),
            sessions: SessionRegistry::new(config.session_ttl),
            default_secs_per_round: config.default_secs_per_round,
            game_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// In-memory store, built-in statements, default config
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryRepository::new()),
            StatementPool::builtin(),
            &AppConfig::default(),
        )
    }

    /// Serialize state changes for one game.
    ///
    /// Entries nobody holds or waits on (only the map's own `Arc` left) are
    /// dropped here, so the map tracks busy games rather than every game.
    pub(crate) async fn lock_game(&self, game_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.game_locks.lock().await;
            locks.retain(|id, lock| id == game_id || Arc::strong_count(lock) > 1);
            locks.entry(game_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Load the caller's game for a change, checking they belong to it
    pub(crate) async fn load_for(&self, session: &Session) -> GameResult<Game> {
        let game = self.repo.get_available(&session.game_id).await?;
        if game.player(&session.player_id).is_none() {
            return Err(GameError::not_found("Player", session.player_id.clone()));
        }
        Ok(game)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory()
    }
}
