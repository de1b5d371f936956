//! Bearer-token sessions for players

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::error::GameError;
use crate::state::AppState;
use crate::types::{GameId, Player, PlayerId};

const TOKEN_LENGTH: usize = 32;

/// The caller of a game operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub is_master: bool,
}

impl Session {
    pub fn for_player(player: &Player) -> Self {
        Self {
            game_id: player.game_id.clone(),
            player_id: player.id.clone(),
            is_master: player.is_master,
        }
    }
}

/// Issued session tokens, kept in memory until they expire
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    /// Map of token to (session, issued at)
    sessions: Arc<RwLock<HashMap<String, (Session, Instant)>>>,
    ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(3 * 60 * 60))
    }
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Issue a fresh token for `session`, dropping expired ones on the way
    pub async fn issue(&self, session: Session) -> String {
        let token = generate_token();
        let ttl = self.ttl;
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, (_, issued)| issued.elapsed() < ttl);
        sessions.insert(token.clone(), (session, Instant::now()));
        token
    }

    /// Number of tokens currently held
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Look a token up. Expired tokens are dropped.
    pub async fn resolve(&self, token: &str) -> Option<Session> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some((session, issued)) if issued.elapsed() < self.ttl => {
                    return Some(session.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }

        tracing::debug!("Session token expired");
        self.sessions.write().await.remove(token);
        None
    }

}

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = GameError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(GameError::Unauthenticated)?;
        state
            .sessions
            .resolve(token)
            .await
            .ok_or(GameError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn session() -> Session {
        Session {
            game_id: "g1".to_string(),
            player_id: "p1".to_string(),
            is_master: true,
        }
    }

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/game");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_issue_and_resolve() {
        let registry = SessionRegistry::default();
        let token = registry.issue(session()).await;

        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(registry.resolve(&token).await, Some(session()));
        assert_eq!(registry.resolve("unknown").await, None);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let registry = SessionRegistry::default();
        let a = registry.issue(session()).await;
        let b = registry.issue(session()).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_expired_tokens_are_rejected() {
        let registry = SessionRegistry::new(Duration::ZERO);
        let token = registry.issue(session()).await;

        assert_eq!(registry.resolve(&token).await, None);
        assert!(registry.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_issue_evicts_abandoned_tokens() {
        let registry = SessionRegistry::new(Duration::from_millis(200));
        for _ in 0..5 {
            registry.issue(session()).await;
        }
        assert_eq!(registry.len().await, 5);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let fresh = registry.issue(session()).await;

        // None of the old tokens was presented again
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.resolve(&fresh).await, Some(session()));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[tokio::test]
    async fn test_extractor() {
        let state = Arc::new(AppState::in_memory());
        let token = state.sessions.issue(session()).await;

        let mut parts = parts_with(Some(&format!("Bearer {}", token)));
        let extracted = Session::from_request_parts(&mut parts, &state).await;
        assert_eq!(extracted.unwrap(), session());

        let mut parts = parts_with(Some("Bearer wrong"));
        let rejected = Session::from_request_parts(&mut parts, &state).await;
        assert!(matches!(rejected, Err(GameError::Unauthenticated)));
    }
}
