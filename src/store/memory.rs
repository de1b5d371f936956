//! In-memory implementation of `GameRepository`.
//!
//! All games live in a `HashMap` and are lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::GameRepository;
use crate::error::StoreError;
use crate::types::{Game, GameId};

pub struct InMemoryRepository {
    games: RwLock<HashMap<GameId, Game>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameRepository for InMemoryRepository {
    async fn get(&self, game_id: &str) -> Result<Option<Game>, StoreError> {
        Ok(self.games.read().await.get(game_id).cloned())
    }

    async fn find_by_join_token(&self, join_token: &str) -> Result<Option<Game>, StoreError> {
        Ok(self
            .games
            .read()
            .await
            .values()
            .find(|g| g.join_token == join_token)
            .cloned())
    }

    async fn save(&self, game: &Game) -> Result<(), StoreError> {
        let mut games = self.games.write().await;
        if games
            .values()
            .any(|g| g.join_token == game.join_token && g.id != game.id)
        {
            return Err(StoreError::JoinTokenTaken(game.join_token.clone()));
        }

        // Whole-aggregate swap, so readers never see a partial update
        games.insert(game.id.clone(), game.clone());
        Ok(())
    }
}
