use super::selection::{round_candidates, select_participants};
use super::{AppState, StatementPool};
use crate::auth::Session;
use crate::error::{GameError, GameResult};
use crate::types::*;
use rand::Rng;
use std::collections::HashSet;

/// Open the next round of `game`.
///
/// Picks the debate pair and a statement the game has not used yet, then
/// appends the round as OPEN. `game` is left untouched on error.
pub fn start_round<R: Rng + ?Sized>(
    game: &mut Game,
    pool: &StatementPool,
    rng: &mut R,
) -> GameResult<Round> {
    if game.players.len() < MIN_PLAYERS {
        return Err(GameError::InsufficientPlayers {
            required: MIN_PLAYERS,
            found: game.players.len(),
        });
    }
    if game.active_round().is_some() {
        return Err(GameError::RoundInProgress);
    }

    let (player_for, player_against) = select_participants(&round_candidates(game))?;

    let used: HashSet<StatementId> = game
        .rounds
        .iter()
        .map(|r| r.statement.id.clone())
        .collect();
    let statement = pool.next_statement_with(&used, rng)?;

    let round = Round {
        id: ulid::Ulid::new().to_string(),
        game_id: game.id.clone(),
        number: game.rounds.len() as u32 + 1,
        statement,
        player_for,
        player_against,
        status: RoundStatus::Open,
        votes: Vec::new(),
        verdict: None,
        eligible_voters: (game.players.len() - 2) as u32,
        created_at: chrono::Utc::now(),
        resolved_at: None,
    };

    game.rounds.push(round.clone());
    if game.status == GameStatus::Pending {
        game.status = GameStatus::Running;
    }
    Ok(round)
}

impl AppState {
    /// Open a new round in the caller's game (master only)
    pub async fn open_round(&self, session: &Session) -> GameResult<Round> {
        if !session.is_master {
            return Err(GameError::Unauthorized("start a round"));
        }

        let _guard = self.lock_game(&session.game_id).await;
        let mut game = self.load_for(session).await?;

        let round = start_round(&mut game, &self.statements, &mut rand::rng())?;
        self.repo.save(&game).await?;

        tracing::info!(
            "Opened round {} of game {}: \"{}\" ({} for, {} against)",
            round.number,
            game.id,
            round.statement.assertion,
            round.player_for,
            round.player_against
        );
        Ok(round)
    }

    /// Most recently created round, whatever its status
    pub async fn current_round(&self, game_id: &str) -> GameResult<Option<Round>> {
        let game = self.get_game(game_id).await?;
        Ok(game.rounds.last().cloned())
    }

    /// Every round of the game, oldest first
    pub async fn all_rounds(&self, game_id: &str) -> GameResult<Vec<Round>> {
        Ok(self.get_game(game_id).await?.rounds)
    }

    pub async fn get_round(&self, game_id: &str, round_id: &str) -> GameResult<Round> {
        let game = self.get_game(game_id).await?;
        game.round(round_id)
            .cloned()
            .ok_or_else(|| GameError::not_found("Round", round_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::game_with_players;
    use crate::state::game::add_player_to;
    use crate::state::record_vote;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn game_of(names: &[&str]) -> Game {
        let mut game = Game {
            id: "g1".to_string(),
            status: GameStatus::Pending,
            secs_per_round: 90,
            join_token: "ABCDEFGH".to_string(),
            created_at: chrono::Utc::now(),
            players: Vec::new(),
            rounds: Vec::new(),
        };
        for name in names {
            add_player_to(&mut game, name).unwrap();
        }
        game
    }

    fn id_of(game: &Game, name: &str) -> PlayerId {
        game.players.iter().find(|p| p.name == name).unwrap().id.clone()
    }

    #[test]
    fn test_start_round_requires_three_players() {
        let pool = StatementPool::builtin();
        let mut rng = StdRng::seed_from_u64(1);

        for names in [&["A"][..], &["A", "B"][..]] {
            let mut game = game_of(names);
            let result = start_round(&mut game, &pool, &mut rng);
            assert!(matches!(
                result,
                Err(GameError::InsufficientPlayers { required: 3, .. })
            ));
            assert!(game.rounds.is_empty());
        }
    }

    #[test]
    fn test_first_round_of_fresh_game() {
        let pool = StatementPool::builtin();
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = game_of(&["A", "B", "C"]);

        let round = start_round(&mut game, &pool, &mut rng).unwrap();
        assert_eq!(round.number, 1);
        assert_eq!(round.status, RoundStatus::Open);
        assert_eq!(round.player_for, id_of(&game, "A"));
        assert_eq!(round.player_against, id_of(&game, "B"));
        assert_eq!(round.eligible_voters, 1);
        assert!(round.votes.is_empty());
        assert!(round.verdict.is_none());
        assert_eq!(game.status, GameStatus::Running);
        assert!(pool.get(&round.statement.id).is_some());
    }

    #[test]
    fn test_second_round_waits_for_resolution() {
        let pool = StatementPool::builtin();
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = game_of(&["A", "B", "C"]);

        let round = start_round(&mut game, &pool, &mut rng).unwrap();
        for _ in 0..3 {
            let result = start_round(&mut game, &pool, &mut rng);
            assert!(matches!(result, Err(GameError::RoundInProgress)));
        }
        assert_eq!(game.rounds.len(), 1);

        let c = id_of(&game, "C");
        record_vote(&mut game, &round.id, &c, Side::For).unwrap();
        let next = start_round(&mut game, &pool, &mut rng).unwrap();
        assert_eq!(next.number, 2);
    }

    #[test]
    fn test_statements_are_not_reused() {
        let pool = StatementPool::builtin();
        let mut rng = StdRng::seed_from_u64(9);
        let mut game = game_of(&["A", "B", "C"]);

        for _ in 0..pool.len() {
            let round = start_round(&mut game, &pool, &mut rng).unwrap();
            let voter = game
                .players
                .iter()
                .find(|p| !round.is_participant(&p.id))
                .unwrap()
                .id
                .clone();
            record_vote(&mut game, &round.id, &voter, Side::For).unwrap();
        }

        let used: HashSet<_> = game.rounds.iter().map(|r| r.statement.id.clone()).collect();
        assert_eq!(used.len(), pool.len());

        let result = start_round(&mut game, &pool, &mut rng);
        assert!(matches!(result, Err(GameError::PoolExhausted)));
        assert_eq!(game.rounds.len(), pool.len());
    }

    #[test]
    fn test_participation_rotates() {
        let pool = StatementPool::builtin();
        let mut rng = StdRng::seed_from_u64(3);
        let mut game = game_of(&["A", "B", "C"]);
        let (a, b, c) = (id_of(&game, "A"), id_of(&game, "B"), id_of(&game, "C"));

        let expected = [
            (a.clone(), b.clone()), // all fresh, roster order
            (c.clone(), a.clone()), // C never played; A comes before B
            (b.clone(), c.clone()), // B and C played once, B had fewer `for`s
        ];
        for (player_for, player_against) in expected {
            let round = start_round(&mut game, &pool, &mut rng).unwrap();
            assert_eq!(round.player_for, player_for);
            assert_eq!(round.player_against, player_against);
            let voter = game
                .players
                .iter()
                .find(|p| !round.is_participant(&p.id))
                .unwrap()
                .id
                .clone();
            record_vote(&mut game, &round.id, &voter, Side::Against).unwrap();
        }
    }

    #[tokio::test]
    async fn test_open_round_is_master_only() {
        let state = AppState::in_memory();
        let (game, sessions) = game_with_players(&state, &["A", "B", "C"]).await;

        let result = state.open_round(&sessions[1]).await;
        assert!(matches!(result, Err(GameError::Unauthorized(_))));
        assert!(state.current_round(&game.id).await.unwrap().is_none());

        let round = state.open_round(&sessions[0]).await.unwrap();
        let current = state.current_round(&game.id).await.unwrap().unwrap();
        assert_eq!(current.id, round.id);
        assert_eq!(state.get_round(&game.id, &round.id).await.unwrap(), round);
    }

    #[tokio::test]
    async fn test_open_round_persists_nothing_on_failure() {
        let state = AppState::in_memory();
        let (game, sessions) = game_with_players(&state, &["A", "B"]).await;

        let result = state.open_round(&sessions[0]).await;
        assert!(matches!(result, Err(GameError::InsufficientPlayers { .. })));

        let stored = state.get_game(&game.id).await.unwrap();
        assert!(stored.rounds.is_empty());
        assert_eq!(stored.status, GameStatus::Pending);
    }

    #[tokio::test]
    async fn test_current_round_stays_after_resolution() {
        let state = AppState::in_memory();
        let (game, sessions) = game_with_players(&state, &["A", "B", "C"]).await;
        let round = state.open_round(&sessions[0]).await.unwrap();
        state
            .cast_vote(&sessions[2], &round.id, Side::For)
            .await
            .unwrap();

        let current = state.current_round(&game.id).await.unwrap().unwrap();
        assert_eq!(current.id, round.id);
        assert_eq!(current.status, RoundStatus::Resolved);

        let missing = state.get_round(&game.id, "nope").await;
        assert!(matches!(missing, Err(GameError::NotFound { kind: "Round", .. })));
    }
}
