//! HTTP API endpoints.
//!
//! Every route under `/game` except create and join expects an
//! `Authorization: Bearer <token>` header with the token handed out when the
//! caller created or joined their game.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::auth::Session;
use crate::error::{ErrorKind, GameError, GameResult};
use crate::protocol::*;
use crate::state::AppState;
use crate::types::{Game, Player, Side};

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match (&self, self.kind()) {
            (
                GameError::RoundInProgress
                | GameError::DuplicateVote
                | GameError::UniquePlayerName(_),
                _,
            ) => StatusCode::CONFLICT,
            (_, ErrorKind::Validation) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::DomainRule) => StatusCode::UNPROCESSABLE_ENTITY,
            (_, ErrorKind::Unauthenticated) => StatusCode::UNAUTHORIZED,
            (_, ErrorKind::Authorization) => StatusCode::FORBIDDEN,
            (_, ErrorKind::NotFound) => StatusCode::NOT_FOUND,
            (_, ErrorKind::Storage) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let msg = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
            "Internal storage error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            code: self.code().to_string(),
            msg,
        };
        (status, Json(body)).into_response()
    }
}

/// `Json` whose rejections (bad shape, wrong content type) surface as
/// `GameError::Validation`
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = GameError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(GameError::Validation(rejection.body_text())),
        }
    }
}

/// Build the router with all game routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/game", post(create_game).get(get_game))
        .route("/game/join/{join_token}", post(join_game))
        .route("/game/finish", post(finish_game))
        .route("/game/rounds", post(open_round).get(list_rounds))
        .route("/game/round", get(current_round))
        .route("/game/rounds/{round_id}/votes", post(cast_vote))
        .route("/game/score", get(get_score))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Issue a session for a freshly added player
async fn joined(state: &AppState, game: &Game, player: Player) -> JoinedGame {
    let token = state.sessions.issue(Session::for_player(&player)).await;
    JoinedGame {
        game: GameView::from(game),
        player,
        token,
    }
}

/// Create a game; the caller becomes its master.
///
/// POST /game
async fn create_game(
    State(state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<NewGamePayload>,
) -> GameResult<(StatusCode, Json<JoinedGame>)> {
    let (game, master) = state
        .create_game(&payload.player_name, payload.secs_per_round)
        .await?;
    let body = joined(&state, &game, master).await;
    Ok((StatusCode::CREATED, Json(body)))
}

/// POST /game/join/{join_token}
async fn join_game(
    State(state): State<Arc<AppState>>,
    Path(join_token): Path<String>,
    ValidJson(payload): ValidJson<JoinPayload>,
) -> GameResult<(StatusCode, Json<JoinedGame>)> {
    let (game, player) = state.join_game(&join_token, &payload.player_name).await?;
    let body = joined(&state, &game, player).await;
    Ok((StatusCode::CREATED, Json(body)))
}

/// GET /game
async fn get_game(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> GameResult<Json<GameView>> {
    let game = state.get_game(&session.game_id).await?;
    Ok(Json(GameView::from(&game)))
}

/// POST /game/finish
async fn finish_game(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> GameResult<Json<GameView>> {
    let game = state.finish_game(&session).await?;
    Ok(Json(GameView::from(&game)))
}

/// Open the next round (master only).
///
/// POST /game/rounds
async fn open_round(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> GameResult<(StatusCode, Json<RoundView>)> {
    let round = state.open_round(&session).await?;
    Ok((StatusCode::CREATED, Json(round.into())))
}

/// GET /game/rounds
async fn list_rounds(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> GameResult<Json<Vec<RoundView>>> {
    let rounds = state.all_rounds(&session.game_id).await?;
    Ok(Json(rounds.into_iter().map(RoundView::from).collect()))
}

/// Latest round, open or resolved; `null` before the first round.
///
/// GET /game/round
async fn current_round(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> GameResult<Json<Option<RoundView>>> {
    let round = state.current_round(&session.game_id).await?;
    Ok(Json(round.map(RoundView::from)))
}

/// POST /game/rounds/{round_id}/votes
async fn cast_vote(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(round_id): Path<String>,
    ValidJson(payload): ValidJson<VotePayload>,
) -> GameResult<Json<RoundView>> {
    let round = state
        .cast_vote(&session, &round_id, Side::from(payload.verdict))
        .await?;
    Ok(Json(round.into()))
}

/// GET /game/score
async fn get_score(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> GameResult<Json<ScoreBoard>> {
    let scores = state.get_score(&session.game_id).await?;
    Ok(Json(ScoreBoard {
        game_id: session.game_id,
        scores,
    }))
}
