use super::score::resolve_round;
use super::AppState;
use crate::auth::Session;
use crate::error::{GameError, GameResult};
use crate::types::*;

/// Record `voter_id`'s vote in a round of `game`.
///
/// When the vote completes the quorum the round is resolved in the same call,
/// so a stored round never has a full ballot box while still OPEN.
pub fn record_vote(
    game: &mut Game,
    round_id: &str,
    voter_id: &str,
    side: Side,
) -> GameResult<Round> {
    if game.player(voter_id).is_none() {
        return Err(GameError::not_found("Player", voter_id));
    }

    let Game {
        players, rounds, ..
    } = game;
    let round = rounds
        .iter_mut()
        .find(|r| r.id == round_id)
        .ok_or_else(|| GameError::not_found("Round", round_id))?;

    if !round.is_open() {
        return Err(GameError::RoundClosed(round.id.clone()));
    }
    if round.is_participant(voter_id) {
        return Err(GameError::ParticipantCannotVote);
    }
    if round.has_voted(voter_id) {
        return Err(GameError::DuplicateVote);
    }

    round.votes.push(Vote {
        id: ulid::Ulid::new().to_string(),
        round_id: round.id.clone(),
        player_id: voter_id.to_string(),
        side,
        cast_at: chrono::Utc::now(),
    });

    if round.votes.len() >= round.eligible_voters as usize {
        resolve_round(round, players);
    }

    Ok(round.clone())
}

impl AppState {
    /// Cast the caller's vote; may resolve the round
    pub async fn cast_vote(&self, session: &Session, round_id: &str, side: Side) -> GameResult<Round> {
        let _guard = self.lock_game(&session.game_id).await;
        let mut game = self.load_for(session).await?;

        let round = record_vote(&mut game, round_id, &session.player_id, side)?;
        self.repo.save(&game).await?;

        tracing::debug!(
            "Vote in round {} of game {}: {}/{}",
            round.number,
            game.id,
            round.votes.len(),
            round.eligible_voters
        );
        Ok(round)
    }
}
