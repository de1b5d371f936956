use crate::error::GameResult;
use crate::state::AppState;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Vote counts of a round
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tally {
    pub for_votes: u32,
    pub against_votes: u32,
}

impl Tally {
    pub fn of(round: &Round) -> Self {
        round.votes.iter().fold(Self::default(), |mut tally, vote| {
            match vote.side {
                Side::For => tally.for_votes += 1,
                Side::Against => tally.against_votes += 1,
            }
            tally
        })
    }

    pub fn verdict(&self) -> Verdict {
        use std::cmp::Ordering;

        match self.for_votes.cmp(&self.against_votes) {
            Ordering::Greater => Verdict::For,
            Ordering::Less => Verdict::Against,
            Ordering::Equal => Verdict::Draw,
        }
    }
}

/// Close the round and award its point.
///
/// This is the only place scores change. A majority gives the winning
/// participant one point; a draw gives nobody anything.
pub(crate) fn resolve_round(round: &mut Round, players: &mut [Player]) -> Verdict {
    let tally = Tally::of(round);
    let verdict = tally.verdict();

    let winner = match verdict {
        Verdict::For => Some(round.participant(Side::For)),
        Verdict::Against => Some(round.participant(Side::Against)),
        Verdict::Draw => None,
    };
    if let Some(winner) = winner {
        if let Some(player) = players.iter_mut().find(|p| &p.id == winner) {
            player.score += 1;
        }
    }

    round.status = RoundStatus::Resolved;
    round.verdict = Some(verdict);
    round.resolved_at = Some(chrono::Utc::now());

    tracing::info!(
        "Round {} resolved: {:?} ({} for, {} against)",
        round.id,
        verdict,
        tally.for_votes,
        tally.against_votes
    );
    verdict
}

/// One line of the score board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub score: u32,
    pub is_master: bool,
}

/// Current scores in roster order
pub fn score_ledger(game: &Game) -> Vec<ScoreEntry> {
    game.players
        .iter()
        .map(|p| ScoreEntry {
            player_id: p.id.clone(),
            name: p.name.clone(),
            score: p.score,
            is_master: p.is_master,
        })
        .collect()
}

impl AppState {
    pub async fn get_score(&self, game_id: &str) -> GameResult<Vec<ScoreEntry>> {
        let game = self.get_game(game_id).await?;
        Ok(score_ledger(&game))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_with(sides: &[Side]) -> Round {
        Round {
            id: "r1".to_string(),
            game_id: "g1".to_string(),
            number: 1,
            statement: Statement {
                id: "s01".to_string(),
                assertion: "Marriage is no longer necessary".to_string(),
                language: "en".to_string(),
            },
            player_for: "a".to_string(),
            player_against: "b".to_string(),
            status: RoundStatus::Open,
            votes: sides
                .iter()
                .enumerate()
                .map(|(i, side)| Vote {
                    id: format!("v{}", i),
                    round_id: "r1".to_string(),
                    player_id: format!("voter{}", i),
                    side: *side,
                    cast_at: chrono::Utc::now(),
                })
                .collect(),
            verdict: None,
            eligible_voters: sides.len() as u32,
            created_at: chrono::Utc::now(),
            resolved_at: None,
        }
    }

    fn players() -> Vec<Player> {
        ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, id)| Player {
                id: id.to_string(),
                game_id: "g1".to_string(),
                name: id.to_uppercase(),
                score: 0,
                is_master: i == 0,
                joined_at: chrono::Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_tally_verdicts() {
        use Side::*;

        assert_eq!(Tally::of(&round_with(&[For, For])).verdict(), Verdict::For);
        assert_eq!(
            Tally::of(&round_with(&[Against, For, Against])).verdict(),
            Verdict::Against
        );
        assert_eq!(
            Tally::of(&round_with(&[For, Against])).verdict(),
            Verdict::Draw
        );
        assert_eq!(Tally::of(&round_with(&[])).verdict(), Verdict::Draw);
    }

    #[test]
    fn test_resolve_awards_exactly_one_point() {
        use Side::*;

        for (sides, expected) in [
            (vec![For], [1, 0, 0]),
            (vec![Against], [0, 1, 0]),
            (vec![For, Against, For], [1, 0, 0]),
            (vec![Against, Against, For], [0, 1, 0]),
        ] {
            let mut round = round_with(&sides);
            let mut players = players();
            resolve_round(&mut round, &mut players);

            let scores: Vec<u32> = players.iter().map(|p| p.score).collect();
            assert_eq!(scores, expected);
            assert_eq!(round.status, RoundStatus::Resolved);
        }
    }

    #[test]
    fn test_draw_awards_nothing() {
        let mut round = round_with(&[Side::For, Side::Against]);
        let mut players = players();

        let verdict = resolve_round(&mut round, &mut players);
        assert_eq!(verdict, Verdict::Draw);
        assert_eq!(round.verdict, Some(Verdict::Draw));
        assert!(players.iter().all(|p| p.score == 0));
    }

    #[test]
    fn test_score_ledger_keeps_roster_order() {
        let mut players = players();
        players[2].score = 4;
        let game = Game {
            id: "g1".to_string(),
            status: GameStatus::Running,
            secs_per_round: 90,
            join_token: "ABCDEFGH".to_string(),
            created_at: chrono::Utc::now(),
            players,
            rounds: Vec::new(),
        };

        let ledger = score_ledger(&game);
        let names: Vec<_> = ledger.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(ledger[2].score, 4);
        assert!(ledger[0].is_master);
    }
}
