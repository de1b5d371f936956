//! Persistence for games.
//!
//! The `GameRepository` trait hides the storage backend. A game is loaded and
//! saved as one aggregate (roster, rounds, votes); `save` must be
//! all-or-nothing so that a round opening or a vote with its resolution is
//! never half-written.

mod memory;
mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;

use crate::error::{GameError, GameResult, StoreError};
use crate::types::{Game, GameStatus};

#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Load a game, returning None if it does not exist.
    async fn get(&self, game_id: &str) -> Result<Option<Game>, StoreError>;

    /// Look a game up by the token embedded in its join link.
    async fn find_by_join_token(&self, join_token: &str) -> Result<Option<Game>, StoreError>;

    /// Store a game (upsert semantics, atomic).
    async fn save(&self, game: &Game) -> Result<(), StoreError>;

    /// Load a game that exists and has not finished yet.
    async fn get_available(&self, game_id: &str) -> GameResult<Game> {
        let game = self
            .get(game_id)
            .await?
            .ok_or_else(|| GameError::not_found("Game", game_id))?;

        if game.status == GameStatus::Finished {
            return Err(GameError::GameFinished(game.id));
        }
        Ok(game)
    }
}
