//! Session transcript store.
//!
//! Transcripts live in a bounded cache keyed by session id. Each transcript
//! sits behind its own async mutex, so requests sharing a session id run one
//! after another while unrelated sessions proceed in parallel.
//!
//! A locked transcript must outlive its cache entry: the cache may evict or
//! drop it mid-request. Every slot handed out is also tracked weakly in a
//! `live` map, so a later request for the same id joins the slot still held
//! by an in-flight request instead of starting a parallel one, and a guard
//! puts its slot back into the cache when it is released.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use manasik_core::{Transcript, Turn};

pub type SessionId = String;

type Slot = Arc<Mutex<Transcript>>;

/// Eviction limits for the session cache.
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// A session untouched for this long is dropped.
    pub idle_ttl: Duration,
    /// Upper bound on the number of live sessions.
    pub max_sessions: u64,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(3600),
            max_sessions: 10_000,
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<SessionId, Slot>,
    live: Arc<std::sync::Mutex<HashMap<SessionId, Weak<Mutex<Transcript>>>>>,
    system_prompt: Arc<str>,
    max_sessions: u64,
}

/// Exclusive access to one session's transcript. Dropping it releases the
/// session for the next request and leaves the transcript in the store.
pub struct SessionGuard {
    transcript: OwnedMutexGuard<Transcript>,
    slot: Slot,
    session_id: SessionId,
    store: SessionStore,
}

impl Deref for SessionGuard {
    type Target = Transcript;

    fn deref(&self) -> &Transcript {
        &self.transcript
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.store.pin(&self.session_id, &self.slot);
    }
}

impl SessionStore {
    pub fn new(system_prompt: impl Into<String>, config: SessionStoreConfig) -> Self {
        let system_prompt: String = system_prompt.into();
        Self {
            sessions: Cache::builder()
                .max_capacity(config.max_sessions)
                .time_to_idle(config.idle_ttl)
                .eviction_policy(EvictionPolicy::lru())
                .build(),
            live: Arc::new(std::sync::Mutex::new(HashMap::new())),
            system_prompt: system_prompt.into(),
            max_sessions: config.max_sessions,
        }
    }

    /// Lock the transcript for `session_id`, creating it if needed.
    ///
    /// A new or reset transcript holds exactly the system instruction. The
    /// reset happens under the session lock, so it cannot race with another
    /// request's appends.
    pub async fn get_or_create(&self, session_id: &str, reset: bool) -> SessionGuard {
        let slot = self.slot(session_id);
        let mut transcript = slot.clone().lock_owned().await;

        // Evicted while we waited; make it reachable again.
        self.pin(session_id, &slot);

        if transcript.is_empty() {
            transcript.reset(&self.system_prompt);
            debug!(session_id, "Created session");
        } else if reset {
            transcript.reset(&self.system_prompt);
            debug!(session_id, "Reset session");
        }

        SessionGuard {
            transcript,
            slot,
            session_id: session_id.to_string(),
            store: self.clone(),
        }
    }

    /// Copy of a session's turns, or `None` if the session is unknown.
    /// Waits for any in-flight request on that session to finish.
    pub async fn snapshot(&self, session_id: &str) -> Option<Vec<Turn>> {
        let slot = self.sessions.get(session_id)?;
        let transcript = slot.lock().await;
        Some(transcript.turns().to_vec())
    }

    /// Drop a session. Returns whether it existed.
    ///
    /// A request still running on the session puts it back when it finishes.
    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            debug!(session_id, "Removed session");
        }
        removed
    }

    /// Number of live sessions.
    pub fn len(&self) -> u64 {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Weak<Mutex<Transcript>>>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve the slot for `session_id`: the cached one, else one still held
    /// by a request, else a fresh empty transcript.
    fn slot(&self, session_id: &str) -> Slot {
        let mut live = self.live();

        if let Some(slot) = self.sessions.get(session_id) {
            live.insert(session_id.to_string(), Arc::downgrade(&slot));
            return slot;
        }

        // Flush expired entries so only slots held by a request survive.
        self.sessions.run_pending_tasks();
        let slot = live
            .get(session_id)
            .and_then(Weak::upgrade)
            .unwrap_or_else(|| Arc::new(Mutex::new(Transcript::new())));

        live.insert(session_id.to_string(), Arc::downgrade(&slot));
        self.sessions.insert(session_id.to_string(), slot.clone());

        if live.len() as u64 > self.max_sessions {
            live.retain(|_, weak| weak.strong_count() > 0);
        }
        slot
    }

    /// Put `slot` back into the cache if it was evicted or removed.
    fn pin(&self, session_id: &str, slot: &Slot) {
        let _live = self.live();
        match self.sessions.get(session_id) {
            Some(current) if Arc::ptr_eq(&current, slot) => {}
            None => {
                self.sessions.insert(session_id.to_string(), slot.clone());
                debug!(session_id, "Restored evicted session");
            }
            Some(_) => warn!(session_id, "Session slot replaced while held"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manasik_core::Role;

    const PROMPT: &str = "You are a scholar of the rites of Hajj and Umrah.";

    fn store() -> SessionStore {
        SessionStore::new(PROMPT, SessionStoreConfig::default())
    }

    #[tokio::test]
    async fn test_fresh_session_starts_with_system_prompt() {
        let store = store();
        let transcript = store.get_or_create("s1", false).await;

        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.turns()[0].role(), Role::System);
        assert_eq!(transcript.turns()[0].content(), PROMPT);
    }

    #[tokio::test]
    async fn test_existing_session_returned_unchanged() {
        let store = store();
        {
            let mut transcript = store.get_or_create("s1", false).await;
            transcript.push(Turn::user("What is Ihram?"));
        }

        let transcript = store.get_or_create("s1", false).await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[1].content(), "What is Ihram?");
    }

    #[tokio::test]
    async fn test_reset_discards_history() {
        let store = store();
        {
            let mut transcript = store.get_or_create("s1", false).await;
            transcript.push(Turn::user("What is Ihram?"));
            transcript.push(Turn::assistant("The sacred state of the pilgrim."));
        }

        let transcript = store.get_or_create("s1", true).await;
        assert_eq!(transcript.turns(), &[Turn::system(PROMPT)]);
    }

    #[tokio::test]
    async fn test_reset_of_unknown_session_creates_it() {
        let store = store();
        let transcript = store.get_or_create("fresh", true).await;
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_same_session_requests_are_serialised() {
        let store = store();
        let mut held = store.get_or_create("s1", false).await;

        let contender = store.clone();
        let waiting = tokio::spawn(async move {
            let transcript = contender.get_or_create("s1", false).await;
            transcript.len()
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        held.push(Turn::user("first"));
        drop(held);

        // The waiter sees the append made while it was blocked.
        assert_eq!(waiting.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_other_sessions_not_blocked() {
        let store = store();
        let _held = store.get_or_create("s1", false).await;

        let other = tokio::time::timeout(Duration::from_secs(1), store.get_or_create("s2", false))
            .await
            .expect("s2 should not wait on s1");
        assert_eq!(other.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_and_remove() {
        let store = store();
        assert!(store.snapshot("s1").await.is_none());

        drop(store.get_or_create("s1", false).await);
        assert_eq!(store.snapshot("s1").await.map(|t| t.len()), Some(1));
        assert_eq!(store.len(), 1);

        assert!(store.remove("s1"));
        assert!(!store.remove("s1"));
        assert!(store.snapshot("s1").await.is_none());
        assert!(store.is_empty());
    }

    fn bounded(max_sessions: u64) -> SessionStore {
        SessionStore::new(
            PROMPT,
            SessionStoreConfig {
                idle_ttl: Duration::from_secs(3600),
                max_sessions,
            },
        )
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recent_session() {
        let store = bounded(2);
        for id in ["s1", "s2", "s3"] {
            drop(store.get_or_create(id, false).await);
        }

        assert_eq!(store.len(), 2);
        assert!(store.snapshot("s1").await.is_none());
        assert!(store.snapshot("s3").await.is_some());
    }

    #[tokio::test]
    async fn test_evicted_session_still_serialised_while_held() {
        let store = bounded(1);
        let mut held = store.get_or_create("s1", false).await;

        // Push s1 out of the cache while its request is in flight.
        for id in ["x", "y", "z"] {
            drop(store.get_or_create(id, false).await);
            store.len();
        }

        let second =
            tokio::time::timeout(Duration::from_millis(200), store.get_or_create("s1", false))
                .await;
        assert!(second.is_err(), "second s1 request ran alongside the first");

        held.push(Turn::user("What is Sa'i?"));
        drop(held);

        let transcript = store.get_or_create("s1", false).await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[1].content(), "What is Sa'i?");
    }

    #[tokio::test]
    async fn test_remove_while_held_keeps_request_result() {
        let store = store();
        let mut held = store.get_or_create("s1", false).await;

        assert!(store.remove("s1"));
        let contender = store.clone();
        let waiting = tokio::spawn(async move {
            let transcript = contender.get_or_create("s1", false).await;
            transcript.len()
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        held.push(Turn::user("first"));
        held.push(Turn::assistant("reply"));
        drop(held);

        assert_eq!(waiting.await.unwrap(), 3);
        assert_eq!(store.snapshot("s1").await.map(|t| t.len()), Some(3));
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::new(
            PROMPT,
            SessionStoreConfig {
                idle_ttl: Duration::from_millis(50),
                max_sessions: 100,
            },
        );
        drop(store.get_or_create("s1", false).await);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.snapshot("s1").await.is_none());
    }
}
