//! Process-lifetime conversation sessions keyed by `ConversationKey`.
//!
//! Sessions are created lazily on first reference and shared as `Arc`s, so a
//! key observes one `Session` identity for as long as it stays live. Growth is
//! bounded by a capacity (least-recently-used eviction) and an idle TTL.

use crate::config::SessionConfig;
use crate::{ConversationKey, Speaker, Turn};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Eviction policy for the store.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Maximum live sessions; 0 means unbounded.
    pub capacity: usize,
    pub idle_ttl: Option<Duration>,
    pub max_history: usize,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionPolicy {
    fn from(cfg: &SessionConfig) -> Self {
        Self {
            capacity: cfg.capacity,
            idle_ttl: (cfg.idle_ttl_secs > 0).then(|| Duration::from_secs(cfg.idle_ttl_secs)),
            max_history: cfg.max_history,
        }
    }
}

/// Running context of one conversation.
#[derive(Debug)]
pub struct Session {
    key: ConversationKey,
    created_at: i64,
    max_history: usize,
    history: Mutex<VecDeque<Turn>>,
}

impl Session {
    fn new(key: ConversationKey, max_history: usize) -> Self {
        Self {
            key,
            created_at: chrono::Utc::now().timestamp(),
            max_history,
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Append a turn, dropping the oldest ones beyond `max_history`.
    pub async fn record(&self, speaker: Speaker, text: &str) {
        let mut history = self.history.lock().await;
        history.push_back(Turn::new(speaker, text));
        while history.len() > self.max_history {
            history.pop_front();
        }
    }

    /// Snapshot of the retained turns, oldest first.
    pub async fn history(&self) -> Vec<Turn> {
        self.history.lock().await.iter().cloned().collect()
    }

    pub async fn turn_count(&self) -> usize {
        self.history.lock().await.len()
    }
}

/// Idle sessions purged per insert at most; the rest go on later inserts or
/// when their own key is looked up again.
const PURGE_BUDGET: usize = 32;

/// Recency stamp; the sequence number breaks ties between equal instants.
type Stamp = (Instant, u64);

struct Entry {
    session: Arc<Session>,
    stamp: Stamp,
}

/// Sessions plus their recency order, oldest first.
#[derive(Default)]
struct Entries {
    by_key: HashMap<ConversationKey, Entry>,
    by_age: BTreeMap<Stamp, ConversationKey>,
    next_seq: u64,
}

impl Entries {
    fn stamp(&mut self, now: Instant) -> Stamp {
        self.next_seq += 1;
        (now, self.next_seq)
    }

    fn touch(&mut self, key: &ConversationKey, now: Instant) -> Option<Arc<Session>> {
        let stamp = self.stamp(now);
        let entry = self.by_key.get_mut(key)?;
        self.by_age.remove(&entry.stamp);
        entry.stamp = stamp;
        self.by_age.insert(stamp, key.clone());
        Some(entry.session.clone())
    }

    fn insert(&mut self, key: &ConversationKey, session: Arc<Session>, now: Instant) {
        let stamp = self.stamp(now);
        self.by_age.insert(stamp, key.clone());
        if let Some(old) = self.by_key.insert(key.clone(), Entry { session, stamp }) {
            self.by_age.remove(&old.stamp);
        }
    }

    fn remove(&mut self, key: &ConversationKey) {
        if let Some(entry) = self.by_key.remove(key) {
            self.by_age.remove(&entry.stamp);
        }
    }

    fn last_seen(&self, key: &ConversationKey) -> Option<Instant> {
        self.by_key.get(key).map(|e| e.stamp.0)
    }

    /// Drop and return the least recently used session key.
    fn pop_oldest(&mut self) -> Option<ConversationKey> {
        let (_, key) = self.by_age.pop_first()?;
        self.by_key.remove(&key);
        Some(key)
    }

    fn oldest_seen(&self) -> Option<Instant> {
        self.by_age.first_key_value().map(|((seen, _), _)| *seen)
    }

    fn len(&self) -> usize {
        self.by_key.len()
    }
}

/// Mapping from conversation key to session.
///
/// The map lock is only held for the point lookup / insert, never while a
/// reply is being composed. Eviction works from the oldest end of the recency
/// order, so an insert never scans the whole map.
pub struct SessionStore {
    entries: Mutex<Entries>,
    policy: SessionPolicy,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionPolicy::default())
    }
}

impl SessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            policy,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Return the session for `key`, creating it on first reference.
    ///
    /// Check and insert happen under one lock, so concurrent first references
    /// to the same key all observe the same session.
    pub async fn get_or_create(&self, key: &ConversationKey) -> Arc<Session> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if let Some(last_seen) = entries.last_seen(key) {
            if !self.is_expired(last_seen, now) {
                if let Some(session) = entries.touch(key, now) {
                    return session;
                }
            }
            tracing::debug!("Session {} expired, replacing", key);
            entries.remove(key);
        }

        self.evict(&mut entries, now);

        let session = Arc::new(Session::new(key.clone(), self.policy.max_history));
        entries.insert(key, session.clone(), now);
        tracing::info!("New session created: {}", key);
        session
    }

    pub async fn contains(&self, key: &ConversationKey) -> bool {
        self.entries.lock().await.by_key.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn is_expired(&self, last_seen: Instant, now: Instant) -> bool {
        match self.policy.idle_ttl {
            Some(ttl) => now.duration_since(last_seen) > ttl,
            None => false,
        }
    }

    /// Make room for one insert: purge a bounded number of idle sessions,
    /// then drop the least recently used until under capacity.
    fn evict(&self, entries: &mut Entries, now: Instant) {
        let mut purged = 0;
        while purged < PURGE_BUDGET {
            match entries.oldest_seen() {
                Some(seen) if self.is_expired(seen, now) => {
                    entries.pop_oldest();
                    purged += 1;
                }
                _ => break,
            }
        }
        if purged > 0 {
            tracing::debug!("Purged {} idle sessions", purged);
        }

        if self.policy.capacity == 0 {
            return;
        }
        while entries.len() >= self.policy.capacity {
            match entries.pop_oldest() {
                Some(k) => tracing::debug!("Evicting least recently used session {}", k),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(user: &str) -> ConversationKey {
        ConversationKey::new("app", user, "s")
    }

    fn store(capacity: usize, ttl_secs: u64) -> SessionStore {
        SessionStore::new(SessionPolicy::from(&SessionConfig {
            capacity,
            idle_ttl_secs: ttl_secs,
            max_history: 3,
        }))
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = SessionStore::default();
        let a = store.get_or_create(&key("u")).await;
        let b = store.get_or_create(&key("u")).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_get_distinct_sessions() {
        let store = SessionStore::default();
        let a = store.get_or_create(&key("u1")).await;
        let b = store.get_or_create(&ConversationKey::new("app", "u1", "other")).await;
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.key().user_id, "u1");
    }

    #[tokio::test]
    async fn test_concurrent_first_reference_creates_once() {
        let store = Arc::new(SessionStore::default());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.get_or_create(&key("racer")).await })
            })
            .collect();

        let mut sessions = Vec::new();
        for h in handles {
            sessions.push(h.await.unwrap());
        }
        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let store = store(0, 0);
        let session = store.get_or_create(&key("u")).await;
        for i in 0..5 {
            session.record(Speaker::User, &format!("turn {}", i)).await;
        }
        let history = session.history().await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].text, "turn 2");
        assert_eq!(history[2].text, "turn 4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_least_recently_used() {
        let store = store(2, 0);
        let first = store.get_or_create(&key("a")).await;
        tokio::time::advance(Duration::from_millis(10)).await;
        store.get_or_create(&key("b")).await;
        tokio::time::advance(Duration::from_millis(10)).await;
        // Touch "a" so "b" becomes the eviction candidate.
        let again = store.get_or_create(&key("a")).await;
        assert!(Arc::ptr_eq(&first, &again));
        tokio::time::advance(Duration::from_millis(10)).await;
        store.get_or_create(&key("c")).await;

        assert_eq!(store.len().await, 2);
        assert!(store.contains(&key("a")).await);
        assert!(!store.contains(&key("b")).await);
        assert!(store.contains(&key("c")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire() {
        let store = store(0, 60);
        let before = store.get_or_create(&key("u")).await;
        store.get_or_create(&key("idle")).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        let after = store.get_or_create(&key("u")).await;

        assert!(!Arc::ptr_eq(&before, &after));
        assert!(!store.contains(&key("idle")).await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_sessions_do_not_expire() {
        let store = store(0, 60);
        let first = store.get_or_create(&key("u")).await;
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(45)).await;
            let again = store.get_or_create(&key("u")).await;
            assert!(Arc::ptr_eq(&first, &again));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_purge_is_bounded_per_insert() {
        let store = store(0, 60);
        for i in 0..(PURGE_BUDGET + 8) {
            store.get_or_create(&key(&format!("old{}", i))).await;
        }
        tokio::time::advance(Duration::from_secs(61)).await;

        store.get_or_create(&key("fresh")).await;
        assert_eq!(store.len().await, 8 + 1);

        store.get_or_create(&key("fresh2")).await;
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_recency_order_tracks_every_entry() {
        let store = store(3, 0);
        for user in ["a", "b", "a", "c", "a", "d", "e"] {
            store.get_or_create(&key(user)).await;
        }
        let entries = store.entries.lock().await;
        assert_eq!(entries.by_key.len(), 3);
        assert_eq!(entries.by_age.len(), 3);
        for (stamp, k) in &entries.by_age {
            assert_eq!(entries.by_key[k].stamp, *stamp);
        }
        assert!(entries.by_key.contains_key(&key("a")));
        assert!(!entries.by_key.contains_key(&key("b")));
        assert!(!entries.by_key.contains_key(&key("c")));
    }
}
