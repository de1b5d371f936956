use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type GameId = String;
pub type PlayerId = String;
pub type RoundId = String;
pub type VoteId = String;
pub type StatementId = String;

/// Fewest players a game needs before a round can open
pub const MIN_PLAYERS: usize = 3;

/// Longest accepted display name (in characters)
pub const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Pending,
    Running,
    Finished,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Pending => "PENDING",
            GameStatus::Running => "RUNNING",
            GameStatus::Finished => "FINISHED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(GameStatus::Pending),
            "RUNNING" => Some(GameStatus::Running),
            "FINISHED" => Some(GameStatus::Finished),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    Open,
    Resolved,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Open => "OPEN",
            RoundStatus::Resolved => "RESOLVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(RoundStatus::Open),
            "RESOLVED" => Some(RoundStatus::Resolved),
            _ => None,
        }
    }
}

/// Which side of the statement a vote backs.
///
/// On the wire a vote is a plain boolean: `true` agrees with the statement
/// and therefore backs the `for` participant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    For,
    Against,
}

impl From<bool> for Side {
    fn from(agrees: bool) -> Self {
        if agrees {
            Side::For
        } else {
            Side::Against
        }
    }
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::For => "for",
            Side::Against => "against",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "for" => Some(Side::For),
            "against" => Some(Side::Against),
            _ => None,
        }
    }
}

/// Outcome of a resolved round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    For,
    Against,
    Draw,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::For => "for",
            Verdict::Against => "against",
            Verdict::Draw => "draw",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "for" => Some(Verdict::For),
            "against" => Some(Verdict::Against),
            "draw" => Some(Verdict::Draw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Statement {
    pub id: StatementId,
    pub assertion: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub game_id: GameId,
    pub name: String,
    pub score: u32,
    pub is_master: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub id: VoteId,
    pub round_id: RoundId,
    pub player_id: PlayerId,
    pub side: Side,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Round {
    pub id: RoundId,
    pub game_id: GameId,
    pub number: u32,
    pub statement: Statement,
    pub player_for: PlayerId,
    pub player_against: PlayerId,
    pub status: RoundStatus,
    pub votes: Vec<Vote>,
    pub verdict: Option<Verdict>,
    /// Votes needed to resolve, frozen when the round opens (roster size - 2)
    pub eligible_voters: u32,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Round {
    pub fn is_open(&self) -> bool {
        self.status == RoundStatus::Open
    }

    pub fn is_participant(&self, player_id: &str) -> bool {
        self.player_for == player_id || self.player_against == player_id
    }

    pub fn has_voted(&self, player_id: &str) -> bool {
        self.votes.iter().any(|v| v.player_id == player_id)
    }

    /// Participant backing the given side
    pub fn participant(&self, side: Side) -> &PlayerId {
        match side {
            Side::For => &self.player_for,
            Side::Against => &self.player_against,
        }
    }
}

/// A game session: roster, rounds and their votes.
///
/// Rounds and votes refer to players by id only; the game owns every record
/// and nothing points back up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Game {
    pub id: GameId,
    pub status: GameStatus,
    /// Advisory timer for the presentation layer, never enforced here
    pub secs_per_round: u32,
    pub join_token: String,
    pub created_at: DateTime<Utc>,
    /// Join order
    pub players: Vec<Player>,
    /// Chronological, append-only
    pub rounds: Vec<Round>,
}

impl Game {
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn master(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_master)
    }

    pub fn round(&self, round_id: &str) -> Option<&Round> {
        self.rounds.iter().find(|r| r.id == round_id)
    }

    pub fn round_mut(&mut self, round_id: &str) -> Option<&mut Round> {
        self.rounds.iter_mut().find(|r| r.id == round_id)
    }

    pub fn active_round(&self) -> Option<&Round> {
        self.rounds.iter().find(|r| r.is_open())
    }

    pub fn join_link(&self) -> String {
        format!("/game/join/{}", self.join_token)
    }
}
