use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::models::SessionSummary;

use super::broadcast::send_current_state;
use super::handle::{ConnectionHandle, SessionId};
use super::session::Session;

pub type SharedSession = Arc<Mutex<Session>>;

/// Counters reported by the diagnostics endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub sessions: usize,
    pub connections: usize,
    pub claimed: usize,
}

/// All live sessions, keyed by id.
///
/// Lock order is registry first, then session. Code holding a session lock
/// never takes the registry lock, and attach/detach keep the registry write
/// lock across the membership change so a session is never left empty in the
/// map or removed twice.
#[derive(Clone, Default)]
pub struct Registry {
    sessions: Arc<RwLock<HashMap<SessionId, SharedSession>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the handle to its session, creating the session on first join,
    /// and queue the current state for the new member only.
    pub async fn attach(&self, handle: &ConnectionHandle) -> SharedSession {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(handle.session_id.clone())
            .or_insert_with(|| {
                info!(session = %handle.session_id, "creating session");
                Arc::new(Mutex::new(Session::new(handle.session_id.clone())))
            })
            .clone();

        {
            let mut guard = session.lock().await;
            guard.add_member(handle.clone());
            // Queued under the session lock so no broadcast can overtake it.
            send_current_state(&guard, handle);
            info!(
                session = %handle.session_id,
                conn = %handle.id,
                members = guard.member_count(),
                "registered connection"
            );
        }

        session
    }

    /// Remove the handle from its session and drop the session once empty.
    /// Safe to call more than once.
    pub async fn detach(&self, handle: &ConnectionHandle) {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get(&handle.session_id).cloned() else {
            return;
        };

        let mut guard = session.lock().await;
        if !guard.remove_member(handle) {
            debug!(session = %handle.session_id, conn = %handle.id, "connection already detached");
            return;
        }
        if guard.is_empty() {
            info!(session = %handle.session_id, "deleting session");
            sessions.remove(&handle.session_id);
        }
    }

    pub async fn lookup(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn summary(&self, session_id: &str) -> Option<SessionSummary> {
        let session = self.lookup(session_id).await?;
        let guard = session.lock().await;
        Some(guard.summary())
    }

    pub async fn stats(&self) -> RegistryStats {
        let sessions = self.sessions.read().await;
        let mut stats = RegistryStats {
            sessions: sessions.len(),
            ..Default::default()
        };
        for session in sessions.values() {
            let guard = session.lock().await;
            stats.connections += guard.member_count();
            if guard.is_claimed() {
                stats.claimed += 1;
            }
        }
        stats
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop every session. Intended for tests.
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}
