use crate::state::{ScoreEntry, Tally};
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Body of `POST /game`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGamePayload {
    pub player_name: String,
    #[serde(default)]
    pub secs_per_round: Option<u32>,
}

/// Body of `POST /game/join/{join_token}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinPayload {
    pub player_name: String,
}

/// Body of `POST /game/rounds/{round_id}/votes`
///
/// `verdict` is true when the voter agrees with the statement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VotePayload {
    pub verdict: bool,
}

/// Public view of a game (rounds are served separately)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameView {
    pub id: GameId,
    pub status: GameStatus,
    pub secs_per_round: u32,
    pub join_link: String,
    pub players: Vec<Player>,
    pub rounds_played: usize,
}

impl From<&Game> for GameView {
    fn from(game: &Game) -> Self {
        Self {
            id: game.id.clone(),
            status: game.status,
            secs_per_round: game.secs_per_round,
            join_link: game.join_link(),
            players: game.players.clone(),
            rounds_played: game.rounds.len(),
        }
    }
}

/// Response to creating or joining a game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedGame {
    pub game: GameView,
    pub player: Player,
    /// Bearer token for every later request
    pub token: String,
}

/// A round together with its running tally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundView {
    #[serde(flatten)]
    pub round: Round,
    pub tally: Tally,
}

impl From<Round> for RoundView {
    fn from(round: Round) -> Self {
        Self {
            tally: Tally::of(&round),
            round,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBoard {
    pub game_id: GameId,
    pub scores: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub msg: String,
}
