//! # Session Store Module
//!
//! Process-wide table of in-flight dialogs keyed by Telegram user id.
//! Entries are replaced wholesale on every write and are evicted once they
//! have been idle longer than the configured timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::dialogue::Session;

#[derive(Debug, Clone)]
struct Tracked {
    session: Session,
    touched_at: Instant,
}

/// Lock-guarded in-memory session table
///
/// A single mutex guards the whole table; contention is low because each
/// operation holds it only for a map access.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<u64, Tracked>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Current session of a user. Expired sessions read as absent; a live
    /// session read counts as activity and restarts its idle clock.
    pub async fn get(&self, user_id: u64) -> Option<Session> {
        self.get_at(user_id, Instant::now()).await
    }

    pub async fn get_at(&self, user_id: u64, now: Instant) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let tracked = sessions.get_mut(&user_id)?;
        if self.is_expired(tracked, now) {
            sessions.remove(&user_id);
            debug!(user_id, "Dropped expired session on read");
            return None;
        }
        tracked.touched_at = now;
        Some(tracked.session.clone())
    }

    /// Replace the session of a user
    pub async fn put(&self, user_id: u64, session: Session) {
        self.put_at(user_id, session, Instant::now()).await
    }

    pub async fn put_at(&self, user_id: u64, session: Session, now: Instant) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            user_id,
            Tracked {
                session,
                touched_at: now,
            },
        );
    }

    /// Remove the session of a user, returning whether one existed
    pub async fn delete(&self, user_id: u64) -> bool {
        self.sessions.lock().await.remove(&user_id).is_some()
    }

    /// Evict every session idle for longer than the timeout
    pub async fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now()).await
    }

    pub async fn evict_idle_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, tracked| !self.is_expired(tracked, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    fn is_expired(&self, tracked: &Tracked, now: Instant) -> bool {
        now.saturating_duration_since(tracked.touched_at) > self.idle_timeout
    }
}

/// Evict abandoned dialogs every `interval` until the task is aborted
pub fn spawn_sweeper(store: Arc<SessionStore>, interval: Duration) -> JoinHandle<()> {
    info!(
        idle_timeout_secs = store.idle_timeout().as_secs(),
        interval_secs = interval.as_secs(),
        "Starting session sweeper"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            store.evict_idle().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::Stage;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(store.get(1).await.is_none());

        store.put(1, Session::new(1, Stage::AwaitingTitle)).await;
        assert_eq!(store.get(1).await.unwrap().stage, Stage::AwaitingTitle);

        assert!(store.delete(1).await);
        assert!(!store.delete(1).await);
        assert!(store.get(1).await.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_wholesale() {
        let store = SessionStore::new(Duration::from_secs(60));
        store
            .put(
                1,
                Session::new(
                    1,
                    Stage::AwaitingCategory {
                        title: "Night Song".to_string(),
                    },
                ),
            )
            .await;
        store.put(1, Session::new(1, Stage::EditSelectSong)).await;

        let session = store.get(1).await.unwrap();
        assert_eq!(session.stage, Stage::EditSelectSong);
        assert_eq!(session.title(), None);
    }

    #[tokio::test]
    async fn test_expired_session_reads_as_absent() {
        let store = SessionStore::new(Duration::from_secs(60));
        let start = Instant::now();
        store
            .put_at(1, Session::new(1, Stage::AwaitingTitle), start)
            .await;

        // A live read restarts the idle clock
        assert!(store.get_at(1, start + Duration::from_secs(30)).await.is_some());
        assert!(store.get_at(1, start + Duration::from_secs(80)).await.is_some());
        assert!(store.get_at(1, start + Duration::from_secs(141)).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_fresh_sessions() {
        let store = SessionStore::new(Duration::from_secs(60));
        let start = Instant::now();
        store
            .put_at(1, Session::new(1, Stage::AwaitingTitle), start)
            .await;
        store
            .put_at(
                2,
                Session::new(2, Stage::EditSelectSong),
                start + Duration::from_secs(50),
            )
            .await;

        let evicted = store.evict_idle_at(start + Duration::from_secs(90)).await;
        assert_eq!(evicted, 1);
        assert_eq!(store.len().await, 1);
        assert!(store
            .get_at(2, start + Duration::from_secs(90))
            .await
            .is_some());
    }
}
