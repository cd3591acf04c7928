use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tradenexus_core::domain::session::LoginState;

pub const SESSION_HEADER: &str = "x-session-token";

const DEFAULT_TTL: Duration = Duration::from_secs(12 * 60 * 60);
const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug, Clone)]
struct Entry {
    state: LoginState,
    created_at: Instant,
}

/// In-memory session table. Tokens are opaque v4 UUIDs that expire after a
/// fixed lifetime; restarting the process logs everyone out.
///
/// The table is bounded: creating a session past the cap first drops expired
/// entries, then the oldest one.
#[derive(Debug, Clone)]
pub struct Sessions {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for Sessions {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl Sessions {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub async fn create(&self, state: LoginState) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        if inner.len() >= self.max_sessions {
            inner.retain(|_, e| now.duration_since(e.created_at) < self.ttl);
        }
        if inner.len() >= self.max_sessions {
            let oldest = inner
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(t, _)| t.clone());
            if let Some(oldest) = oldest {
                inner.remove(&oldest);
                tracing::debug!("session table full; evicted oldest session");
            }
        }

        inner.insert(
            token.clone(),
            Entry {
                state,
                created_at: now,
            },
        );
        token
    }

    /// Unknown and expired tokens resolve to `LoggedOut`.
    pub async fn get(&self, token: &str) -> LoginState {
        let inner = self.inner.read().await;
        match inner.get(token) {
            Some(e) if e.created_at.elapsed() < self.ttl => e.state.clone(),
            _ => LoginState::LoggedOut,
        }
    }

    pub async fn remove(&self, token: &str) -> bool {
        self.inner.write().await.remove(token).is_some()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
