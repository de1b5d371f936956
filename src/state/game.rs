use super::AppState;
use crate::auth::Session;
use crate::error::{GameError, GameResult, StoreError};
use crate::types::*;
use rand::Rng;

/// Safe character set for join codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 8;

/// Generate a random join code
fn generate_join_token() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Trim a display name and check its length
pub(crate) fn validate_name(name: &str) -> GameResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::Validation("Player name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(GameError::Validation(format!(
            "Player name is longer than {} characters",
            MAX_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

/// Append a player to the roster. The first player becomes the game master.
pub(crate) fn add_player_to(game: &mut Game, name: &str) -> GameResult<Player> {
    let name = validate_name(name)?;
    if game.players.iter().any(|p| p.name == name) {
        return Err(GameError::UniquePlayerName(name));
    }

    let player = Player {
        id: ulid::Ulid::new().to_string(),
        game_id: game.id.clone(),
        name,
        score: 0,
        is_master: game.players.is_empty(),
        joined_at: chrono::Utc::now(),
    };
    game.players.push(player.clone());
    Ok(player)
}

impl AppState {
    /// Create a new game with `master_name` as its first player and master
    pub async fn create_game(
        &self,
        master_name: &str,
        secs_per_round: Option<u32>,
    ) -> GameResult<(Game, Player)> {
        self.create_game_with(master_name, secs_per_round, generate_join_token)
            .await
    }

    /// `create_game` with the join code source supplied by the caller.
    ///
    /// The store rejects a code another game already owns, so a clash is
    /// retried with the next code instead of checked up front.
    pub(crate) async fn create_game_with(
        &self,
        master_name: &str,
        secs_per_round: Option<u32>,
        mut next_join_token: impl FnMut() -> String + Send,
    ) -> GameResult<(Game, Player)> {
        let secs_per_round = secs_per_round.unwrap_or(self.default_secs_per_round);
        if secs_per_round == 0 {
            return Err(GameError::Validation(
                "secs_per_round must be positive".to_string(),
            ));
        }

        let mut game = Game {
            id: ulid::Ulid::new().to_string(),
            status: GameStatus::Pending,
            secs_per_round,
            join_token: String::new(),
            created_at: chrono::Utc::now(),
            players: Vec::new(),
            rounds: Vec::new(),
        };
        let master = add_player_to(&mut game, master_name)?;

        loop {
            game.join_token = next_join_token();
            match self.repo.save(&game).await {
                Ok(()) => break,
                Err(StoreError::JoinTokenTaken(code)) => {
                    tracing::debug!("Join code {} already taken, drawing another", code);
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!("Created game {} (master: {})", game.id, master.name);
        Ok((game, master))
    }

    /// Get a game, finished or not
    pub async fn get_game(&self, game_id: &str) -> GameResult<Game> {
        self.repo
            .get(game_id)
            .await?
            .ok_or_else(|| GameError::not_found("Game", game_id))
    }

    /// Add a player to a running or pending game
    pub async fn add_player(&self, game_id: &str, name: &str) -> GameResult<Player> {
        let _guard = self.lock_game(game_id).await;
        let mut game = self.repo.get_available(game_id).await?;

        let player = add_player_to(&mut game, name)?;
        self.repo.save(&game).await?;

        tracing::info!("Player {} joined game {}", player.name, game.id);
        Ok(player)
    }

    /// Join through the token of a join link
    pub async fn join_game(&self, join_token: &str, name: &str) -> GameResult<(Game, Player)> {
        let game = self
            .repo
            .find_by_join_token(join_token)
            .await?
            .ok_or_else(|| GameError::not_found("Game", join_token))?;

        let player = self.add_player(&game.id, name).await?;
        let game = self.get_game(&game.id).await?;
        Ok((game, player))
    }

    /// End the game. Only the master may do this, and not while a round is open.
    pub async fn finish_game(&self, session: &Session) -> GameResult<Game> {
        if !session.is_master {
            return Err(GameError::Unauthorized("finish the game"));
        }

        let _guard = self.lock_game(&session.game_id).await;
        let mut game = self.load_for(session).await?;

        if game.active_round().is_some() {
            return Err(GameError::RoundInProgress);
        }

        game.status = GameStatus::Finished;
        self.repo.save(&game).await?;

        tracing::info!("Game {} finished after {} rounds", game.id, game.rounds.len());
        Ok(game)
    }
}
