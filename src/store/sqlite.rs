//! SQLite implementation of `GameRepository`.
//!
//! Games, players, rounds and votes are kept in four id-keyed tables. Rows
//! belonging to a game cascade on delete. `save` writes the whole aggregate in
//! one transaction: players and rounds are upserted, votes are insert-only.
//!
//! # Schema Versioning
//!
//! The `schema_version` table records the applied schema. Bump
//! `CURRENT_SCHEMA_VERSION` and extend `run_migrations()` when the layout
//! changes.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::GameRepository;
use crate::error::StoreError;
use crate::types::*;

const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed game repository.
///
/// rusqlite is synchronous, so every call runs on
/// `tokio::task::spawn_blocking`.
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

fn storage(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
    move |e| StoreError::storage(operation, e.to_string())
}

impl SqliteRepository {
    /// Open (or create) the database at `path` and bring its schema up to date.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();
        let is_in_memory = path_str == ":memory:";

        if !is_in_memory {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref).map_err(storage("open database"))?;

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(storage("set journal_mode"))?;
        if !journal_mode.eq_ignore_ascii_case("wal")
            && !(is_in_memory && journal_mode.eq_ignore_ascii_case("memory"))
        {
            warn!(
                "SQLite kept journal_mode '{}' instead of WAL for {}",
                journal_mode, path_str
            );
        }

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(storage("configure database"))?;

        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage("get schema version"))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Throwaway database, mostly for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), StoreError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(StoreError::storage(
                "schema version",
                format!(
                    "Database schema version {} is newer than supported version {}",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS games (
                    id TEXT PRIMARY KEY,
                    status TEXT NOT NULL,
                    secs_per_round INTEGER NOT NULL,
                    join_token TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS players (
                    id TEXT PRIMARY KEY,
                    game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    score INTEGER NOT NULL DEFAULT 0,
                    is_master INTEGER NOT NULL DEFAULT 0,
                    joined_at TEXT NOT NULL,
                    UNIQUE (game_id, name)
                );

                CREATE TABLE IF NOT EXISTS rounds (
                    id TEXT PRIMARY KEY,
                    game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                    number INTEGER NOT NULL,
                    statement_id TEXT NOT NULL,
                    statement_text TEXT NOT NULL,
                    statement_language TEXT NOT NULL,
                    player_for_id TEXT NOT NULL REFERENCES players(id),
                    player_against_id TEXT NOT NULL REFERENCES players(id),
                    status TEXT NOT NULL,
                    verdict TEXT,
                    eligible_voters INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    resolved_at TEXT,
                    UNIQUE (game_id, number)
                );

                CREATE TABLE IF NOT EXISTS votes (
                    id TEXT PRIMARY KEY,
                    round_id TEXT NOT NULL REFERENCES rounds(id) ON DELETE CASCADE,
                    player_id TEXT NOT NULL REFERENCES players(id),
                    position INTEGER NOT NULL,
                    side TEXT NOT NULL,
                    cast_at TEXT NOT NULL,
                    UNIQUE (round_id, player_id)
                );
                "#,
            )
            .map_err(storage("migration v1"))?;
        }

        conn.execute(
            "INSERT INTO schema_version (id, version) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET version = excluded.version",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(storage("record schema version"))?;

        Ok(())
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StoreError::storage("lock connection", "mutex poisoned"))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::storage("spawn_blocking", e.to_string()))?
    }
}

#[async_trait]
impl GameRepository for SqliteRepository {
    async fn get(&self, game_id: &str) -> Result<Option<Game>, StoreError> {
        let game_id = game_id.to_string();
        self.with_conn(move |conn| load_game(conn, &game_id)).await
    }

    async fn find_by_join_token(&self, join_token: &str) -> Result<Option<Game>, StoreError> {
        let join_token = join_token.to_string();
        self.with_conn(move |conn| {
            let game_id: Option<String> = conn
                .query_row(
                    "SELECT id FROM games WHERE join_token = ?1",
                    params![join_token],
                    |row| row.get(0),
                )
                .optional()
                .map_err(storage("find game by join token"))?;

            match game_id {
                Some(id) => load_game(conn, &id),
                None => Ok(None),
            }
        })
        .await
    }

    async fn save(&self, game: &Game) -> Result<(), StoreError> {
        let game = game.clone();
        self.with_conn(move |conn| write_game(conn, &game)).await
    }
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt(format!("timestamp '{}'", value)))
}

fn corrupt(what: &str, value: &str) -> StoreError {
    StoreError::Corrupt(format!("{} '{}'", what, value))
}

struct RoundRow {
    id: String,
    number: u32,
    statement_id: String,
    statement_text: String,
    statement_language: String,
    player_for: String,
    player_against: String,
    status: String,
    verdict: Option<String>,
    eligible_voters: u32,
    created_at: String,
    resolved_at: Option<String>,
}

fn load_game(conn: &Connection, game_id: &str) -> Result<Option<Game>, StoreError> {
    let row: Option<(String, u32, String, String)> = conn
        .query_row(
            "SELECT status, secs_per_round, join_token, created_at FROM games WHERE id = ?1",
            params![game_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()
        .map_err(storage("load game"))?;

    let Some((status, secs_per_round, join_token, created_at)) = row else {
        return Ok(None);
    };

    let mut stmt = conn
        .prepare(
            "SELECT id, name, score, is_master, joined_at FROM players
             WHERE game_id = ?1 ORDER BY position",
        )
        .map_err(storage("load players"))?;
    let player_rows = stmt
        .query_map(params![game_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, String>(4)?,
            ))
        })
        .map_err(storage("load players"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(storage("load players"))?;

    let players = player_rows
        .into_iter()
        .map(|(id, name, score, is_master, joined_at)| {
            Ok(Player {
                id,
                game_id: game_id.to_string(),
                name,
                score,
                is_master,
                joined_at: parse_ts(&joined_at)?,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    let mut stmt = conn
        .prepare(
            "SELECT id, number, statement_id, statement_text, statement_language,
                    player_for_id, player_against_id, status, verdict, eligible_voters,
                    created_at, resolved_at
             FROM rounds WHERE game_id = ?1 ORDER BY number",
        )
        .map_err(storage("load rounds"))?;
    let round_rows = stmt
        .query_map(params![game_id], |row| {
            Ok(RoundRow {
                id: row.get(0)?,
                number: row.get(1)?,
                statement_id: row.get(2)?,
                statement_text: row.get(3)?,
                statement_language: row.get(4)?,
                player_for: row.get(5)?,
                player_against: row.get(6)?,
                status: row.get(7)?,
                verdict: row.get(8)?,
                eligible_voters: row.get(9)?,
                created_at: row.get(10)?,
                resolved_at: row.get(11)?,
            })
        })
        .map_err(storage("load rounds"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(storage("load rounds"))?;

    let mut rounds = Vec::with_capacity(round_rows.len());
    for r in round_rows {
        let votes = load_votes(conn, &r.id)?;
        rounds.push(Round {
            status: RoundStatus::parse(&r.status)
                .ok_or_else(|| corrupt("round status", &r.status))?,
            verdict: match r.verdict {
                Some(v) => Some(Verdict::parse(&v).ok_or_else(|| corrupt("verdict", &v))?),
                None => None,
            },
            created_at: parse_ts(&r.created_at)?,
            resolved_at: r.resolved_at.as_deref().map(parse_ts).transpose()?,
            id: r.id,
            game_id: game_id.to_string(),
            number: r.number,
            statement: Statement {
                id: r.statement_id,
                assertion: r.statement_text,
                language: r.statement_language,
            },
            player_for: r.player_for,
            player_against: r.player_against,
            votes,
            eligible_voters: r.eligible_voters,
        });
    }

    Ok(Some(Game {
        id: game_id.to_string(),
        status: GameStatus::parse(&status).ok_or_else(|| corrupt("game status", &status))?,
        secs_per_round,
        join_token,
        created_at: parse_ts(&created_at)?,
        players,
        rounds,
    }))
}

fn load_votes(conn: &Connection, round_id: &str) -> Result<Vec<Vote>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, player_id, side, cast_at FROM votes
             WHERE round_id = ?1 ORDER BY position",
        )
        .map_err(storage("load votes"))?;
    let rows = stmt
        .query_map(params![round_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(storage("load votes"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(storage("load votes"))?;

    rows.into_iter()
        .map(|(id, player_id, side, cast_at)| {
            Ok(Vote {
                id,
                round_id: round_id.to_string(),
                player_id,
                side: Side::parse(&side).ok_or_else(|| corrupt("vote side", &side))?,
                cast_at: parse_ts(&cast_at)?,
            })
        })
        .collect()
}

fn write_game(conn: &mut Connection, game: &Game) -> Result<(), StoreError> {
    let tx = conn.transaction().map_err(storage("begin transaction"))?;

    tx.execute(
        "INSERT INTO games (id, status, secs_per_round, join_token, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            secs_per_round = excluded.secs_per_round",
        params![
            game.id,
            game.status.as_str(),
            game.secs_per_round,
            game.join_token,
            game.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref err, Some(ref msg))
            if err.code == rusqlite::ErrorCode::ConstraintViolation
                && msg.contains("games.join_token") =>
        {
            StoreError::JoinTokenTaken(game.join_token.clone())
        }
        e => StoreError::storage("save game", e.to_string()),
    })?;

    for (position, player) in game.players.iter().enumerate() {
        tx.execute(
            "INSERT INTO players (id, game_id, position, name, score, is_master, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET score = excluded.score",
            params![
                player.id,
                game.id,
                position as i64,
                player.name,
                player.score,
                player.is_master,
                player.joined_at.to_rfc3339(),
            ],
        )
        .map_err(storage("save player"))?;
    }

    for round in &game.rounds {
        tx.execute(
            "INSERT INTO rounds (id, game_id, number, statement_id, statement_text,
                                 statement_language, player_for_id, player_against_id,
                                 status, verdict, eligible_voters, created_at, resolved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                verdict = excluded.verdict,
                resolved_at = excluded.resolved_at",
            params![
                round.id,
                game.id,
                round.number,
                round.statement.id,
                round.statement.assertion,
                round.statement.language,
                round.player_for,
                round.player_against,
                round.status.as_str(),
                round.verdict.map(|v| v.as_str()),
                round.eligible_voters,
                round.created_at.to_rfc3339(),
                round.resolved_at.map(|ts| ts.to_rfc3339()),
            ],
        )
        .map_err(storage("save round"))?;

        for (position, vote) in round.votes.iter().enumerate() {
            tx.execute(
                "INSERT INTO votes (id, round_id, player_id, position, side, cast_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    vote.id,
                    round.id,
                    vote.player_id,
                    position as i64,
                    vote.side.as_str(),
                    vote.cast_at.to_rfc3339(),
                ],
            )
            .map_err(storage("save vote"))?;
        }
    }

    tx.commit().map_err(storage("commit"))
}
