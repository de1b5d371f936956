//! Picks who debates next.
//!
//! Players who have debated least go first; between the two picked, the one
//! who has argued the `for` side less often takes it this time. Every sort is
//! stable, so remaining ties fall back to join order and the pick is fully
//! deterministic.

use crate::error::{GameError, GameResult};
use crate::types::{Game, PlayerId, MIN_PLAYERS};
use std::collections::HashMap;

/// Participation history of one player within a game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub player_id: PlayerId,
    pub rounds_played: u32,
    pub times_for: u32,
    pub times_against: u32,
    pub score: u32,
}

impl Candidate {
    fn new(player_id: PlayerId, score: u32) -> Self {
        Self {
            player_id,
            rounds_played: 0,
            times_for: 0,
            times_against: 0,
            score,
        }
    }
}

/// Build one candidate per roster entry (in roster order) from every round of
/// the game, open or resolved.
pub fn round_candidates(game: &Game) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = game
        .players
        .iter()
        .map(|p| Candidate::new(p.id.clone(), p.score))
        .collect();

    let index: HashMap<&str, usize> = game
        .players
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();

    for round in &game.rounds {
        if let Some(&i) = index.get(round.player_for.as_str()) {
            candidates[i].rounds_played += 1;
            candidates[i].times_for += 1;
        }
        if let Some(&i) = index.get(round.player_against.as_str()) {
            candidates[i].rounds_played += 1;
            candidates[i].times_against += 1;
        }
    }

    candidates
}

/// Returns `(player_for, player_against)`
pub fn select_participants(candidates: &[Candidate]) -> GameResult<(PlayerId, PlayerId)> {
    if candidates.len() < MIN_PLAYERS {
        return Err(GameError::InsufficientPlayers {
            required: MIN_PLAYERS,
            found: candidates.len(),
        });
    }

    let mut by_participation: Vec<&Candidate> = candidates.iter().collect();
    by_participation.sort_by_key(|c| c.rounds_played);

    let mut pair = [by_participation[0], by_participation[1]];
    pair.sort_by_key(|c| c.times_for);

    Ok((pair[0].player_id.clone(), pair[1].player_id.clone()))
}
