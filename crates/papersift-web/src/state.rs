use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

use papersift_core::{ModelBackend, Pipeline, Session};

/// Request/response header carrying the session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// How long a session may go unused before it is evicted.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

const SESSION_ID_LEN: usize = 24;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub pipeline: Pipeline,
    /// Backend behind the `/api/ollama-*` proxy endpoints.
    pub proxy_model: Arc<dyn ModelBackend>,
    pub sessions: SessionStore,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(pipeline: Pipeline, proxy_model: Arc<dyn ModelBackend>) -> Self {
        Self {
            pipeline,
            proxy_model,
            sessions: SessionStore::default(),
        }
    }
}

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_used: Instant,
}

/// In-memory sessions keyed by id. Each session is locked for the duration
/// of one request, so concurrent requests on the same session run one at a
/// time. Sessions unused for longer than the idle timeout are dropped.
pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SESSION_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    /// Look up a live session and mark it used. Never creates one.
    pub fn get(&self, id: Option<&str>) -> Option<(String, Arc<Mutex<Session>>)> {
        self.touch(id?, Instant::now())
    }

    /// Look up `id`, or start a new session under a fresh id when `id` is
    /// missing, unknown or expired.
    pub fn resolve(&self, id: Option<&str>) -> (String, Arc<Mutex<Session>>) {
        let now = Instant::now();
        if let Some(found) = id.and_then(|id| self.touch(id, now)) {
            return found;
        }

        let id: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(SESSION_ID_LEN)
            .collect();
        let session = Arc::new(Mutex::new(Session::new()));
        self.sessions.insert(
            id.clone(),
            SessionEntry {
                session: session.clone(),
                last_used: now,
            },
        );
        tracing::info!(session = %id, "session created");
        (id, session)
    }

    fn touch(&self, id: &str, now: Instant) -> Option<(String, Arc<Mutex<Session>>)> {
        let mut entry = self.sessions.get_mut(id)?;
        if now.saturating_duration_since(entry.last_used) >= self.idle_timeout {
            return None;
        }
        entry.last_used = now;
        Some((id.to_string(), entry.session.clone()))
    }

    /// Drop every session idle since before `now - idle_timeout`. Returns
    /// how many were removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| now.saturating_duration_since(entry.last_used) < self.idle_timeout);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::info!(evicted, remaining = self.sessions.len(), "idle sessions evicted");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Periodically evict idle sessions for as long as the state is alive.
pub fn spawn_session_reaper(state: &SharedState, period: Duration) -> tokio::task::JoinHandle<()> {
    let weak = Arc::downgrade(state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(state) = weak.upgrade() else { break };
            state.sessions.evict_idle(Instant::now());
        }
    })
}
