//! Keyed TTL locks with bounded retry and misuse monitoring.
//!
//! The manager owns a single mutex-guarded map of lock records; there is
//! no process-wide lock table. Every record carries a TTL so a crashed
//! holder self-heals after expiry instead of deadlocking the chat.
//! Acquisition is always bounded: single-attempt calls return `None` on
//! contention, retrying calls give up after a fixed budget.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::errors::{LockError, LockResult};
use crate::game::entities::{ChatId, UserId};
use crate::retry::RetryPolicy;

/// Proof of lock ownership; required to release.
pub type LockToken = String;

/// Identity of one named lock. Table and stage locks are keyed by chat,
/// action locks by chat and user.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LockKey {
    Table(ChatId),
    Stage(ChatId),
    Action(ChatId, UserId),
}

impl LockKey {
    pub fn chat_id(self) -> ChatId {
        match self {
            Self::Table(chat_id) | Self::Stage(chat_id) | Self::Action(chat_id, _) => chat_id,
        }
    }

    /// Position in the fixed acquisition order table -> stage -> action.
    pub fn level(self) -> u8 {
        match self {
            Self::Table(_) => 0,
            Self::Stage(_) => 1,
            Self::Action(_, _) => 2,
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Table(chat_id) => write!(f, "table:{chat_id}"),
            Self::Stage(chat_id) => write!(f, "stage:{chat_id}"),
            Self::Action(chat_id, user_id) => write!(f, "action:{chat_id}:{user_id}"),
        }
    }
}

/// Observability metadata returned alongside a retried acquisition,
/// successful or not, for spotting contention hot spots.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcquireStats {
    /// Attempts used, including the successful one.
    pub attempts: u32,
    /// Total time spent waiting.
    pub wait_time: Duration,
    /// Waiters already queued on the key when contention was first hit.
    pub queue_position: usize,
}

/// Counter snapshot for health endpoints and tests.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LockMetrics {
    pub contention: u64,
    pub expired_reclaims: u64,
    pub release_mismatches: u64,
    pub ordering_violations: u64,
}

#[derive(Debug)]
struct LockEntry {
    token: LockToken,
    tag: String,
    expires_at: Instant,
}

#[derive(Default)]
struct LockTable {
    entries: HashMap<LockKey, LockEntry>,
    waiters: HashMap<LockKey, usize>,
}

#[derive(Default)]
struct Counters {
    contention: AtomicU64,
    expired_reclaims: AtomicU64,
    release_mismatches: AtomicU64,
    ordering_violations: AtomicU64,
}

/// Multi-granularity mutual exclusion for per-chat game state.
pub struct LockManager {
    table: Mutex<LockTable>,
    retry: RetryPolicy,
    counters: Counters,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl LockManager {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
            retry,
            counters: Counters::default(),
        }
    }

    /// Single-attempt table lock for coarse seating operations that must
    /// not interleave. Returns `None` if already held.
    pub fn acquire_table_lock(
        &self,
        chat_id: ChatId,
        operation: &str,
        ttl: Duration,
    ) -> Option<LockToken> {
        self.try_acquire(LockKey::Table(chat_id), operation, ttl)
    }

    /// Single-attempt table lock returning a scoped guard, so the lock
    /// is given back even when the holding request is cancelled
    /// mid-await.
    pub fn table_lock_guard(
        &self,
        chat_id: ChatId,
        operation: &str,
        ttl: Duration,
    ) -> Option<LockGuard<'_>> {
        let key = LockKey::Table(chat_id);
        self.try_acquire(key, operation, ttl).map(|token| LockGuard {
            manager: self,
            key,
            token: Some(token),
        })
    }

    /// Single-attempt action lock for one player acting in one chat.
    pub fn acquire_action_lock(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        action_tag: &str,
        ttl: Duration,
    ) -> Option<LockToken> {
        self.try_acquire(LockKey::Action(chat_id, user_id), action_tag, ttl)
    }

    /// Action lock with bounded exponential backoff. Returns acquisition
    /// metadata even on success so callers can log contention hot spots.
    pub async fn acquire_action_lock_with_retry(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        action_tag: &str,
        ttl: Duration,
    ) -> LockResult<(LockToken, AcquireStats)> {
        let key = LockKey::Action(chat_id, user_id);
        let started = Instant::now();
        let mut stats = AcquireStats::default();
        let attempts = self.retry.max_attempts.max(1);

        for attempt in 0..attempts {
            stats.attempts = attempt + 1;
            if let Some(token) = self.try_acquire(key, action_tag, ttl) {
                stats.wait_time = started.elapsed();
                return Ok((token, stats));
            }
            if attempt == 0 {
                stats.queue_position = self.waiter_count(key);
            }
            if attempt + 1 < attempts {
                self.register_waiter(key);
                tokio::time::sleep(self.retry.delay_for(attempt)).await;
                self.unregister_waiter(key);
            }
        }

        stats.wait_time = started.elapsed();
        log::warn!(
            "Failed to acquire {key} after {} attempts ({:?} waited, {} queued)",
            stats.attempts,
            stats.wait_time,
            stats.queue_position,
        );
        Err(LockError::AcquisitionTimeout {
            key: key.to_string(),
            attempts: stats.attempts,
        })
    }

    /// Retrying action lock returning a scoped guard; the guard gives
    /// the lock back on every exit path, including cancellation of the
    /// holding future.
    pub async fn action_lock_guard_with_retry(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        action_tag: &str,
        ttl: Duration,
    ) -> LockResult<(LockGuard<'_>, AcquireStats)> {
        let (token, stats) = self
            .acquire_action_lock_with_retry(chat_id, user_id, action_tag, ttl)
            .await?;
        Ok((
            LockGuard {
                manager: self,
                key: LockKey::Action(chat_id, user_id),
                token: Some(token),
            },
            stats,
        ))
    }

    /// Scoped stage lock for multi-step operations (dealing, street
    /// advancement). The returned guard releases on every exit path.
    pub async fn stage_lock_guard(
        &self,
        chat_id: ChatId,
        timeout: Duration,
    ) -> LockResult<LockGuard<'_>> {
        let key = LockKey::Stage(chat_id);
        let deadline = Instant::now() + timeout;
        let mut attempt = 0u32;

        loop {
            if let Some(token) = self.try_acquire(key, "stage", timeout) {
                return Ok(LockGuard {
                    manager: self,
                    key,
                    token: Some(token),
                });
            }
            attempt += 1;
            let delay = self.retry.delay_for(attempt.saturating_sub(1));
            if Instant::now() + delay > deadline {
                return Err(LockError::AcquisitionTimeout {
                    key: key.to_string(),
                    attempts: attempt,
                });
            }
            self.register_waiter(key);
            tokio::time::sleep(delay).await;
            self.unregister_waiter(key);
        }
    }

    /// Checked release for token-based table acquisition. A token that
    /// does not match the current holder leaves the lock in place.
    pub fn release_table_lock(&self, chat_id: ChatId, token: &str) -> LockResult<()> {
        self.checked_release(LockKey::Table(chat_id), token)
    }

    /// Checked release for token-based action acquisition.
    pub fn release_action_lock(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        token: &str,
    ) -> LockResult<()> {
        self.checked_release(LockKey::Action(chat_id, user_id), token)
    }

    fn checked_release(&self, key: LockKey, token: &str) -> LockResult<()> {
        if self.release(key, token) {
            Ok(())
        } else {
            Err(LockError::ReleaseMismatch {
                key: key.to_string(),
            })
        }
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> LockMetrics {
        LockMetrics {
            contention: self.counters.contention.load(Ordering::Relaxed),
            expired_reclaims: self.counters.expired_reclaims.load(Ordering::Relaxed),
            release_mismatches: self.counters.release_mismatches.load(Ordering::Relaxed),
            ordering_violations: self.counters.ordering_violations.load(Ordering::Relaxed),
        }
    }

    fn try_acquire(&self, key: LockKey, tag: &str, ttl: Duration) -> Option<LockToken> {
        let now = Instant::now();
        let mut table = self.table.lock().expect("lock table poisoned");

        if let Some(entry) = table.entries.get(&key) {
            if entry.expires_at > now {
                self.counters.contention.fetch_add(1, Ordering::Relaxed);
                log::debug!("Lock {key} contended (held for {})", entry.tag);
                return None;
            }
            log::warn!(
                "Reclaiming expired lock {key} abandoned by {}",
                entry.tag
            );
            self.counters.expired_reclaims.fetch_add(1, Ordering::Relaxed);
            table.entries.remove(&key);
        }

        self.check_ordering(&table, key, now);

        let token = Uuid::new_v4().to_string();
        table.entries.insert(
            key,
            LockEntry {
                token: token.clone(),
                tag: tag.to_string(),
                expires_at: now + ttl,
            },
        );
        log::debug!("Acquired lock {key} for {tag} (ttl {ttl:?})");
        Some(token)
    }

    /// Ordering is a convention enforced by callers and monitored here:
    /// acquiring a lock that precedes one already held for the same chat
    /// in the table -> stage -> action order is counted and logged, never
    /// raised. The check is per chat, not per holder, so overlapping
    /// operations by different users on one chat can overcount.
    fn check_ordering(&self, table: &LockTable, key: LockKey, now: Instant) {
        let chat_id = key.chat_id();
        let violation = table.entries.iter().any(|(held, entry)| {
            held.chat_id() == chat_id && entry.expires_at > now && held.level() > key.level()
        });
        if violation {
            self.counters
                .ordering_violations
                .fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "Lock ordering violation: acquiring {key} while a lower-order lock is held for chat {chat_id}"
            );
        }
    }

    fn release(&self, key: LockKey, token: &str) -> bool {
        let mut table = self.table.lock().expect("lock table poisoned");
        match table.entries.get(&key) {
            Some(entry) if entry.token == token => {
                table.entries.remove(&key);
                log::debug!("Released lock {key}");
                true
            }
            _ => {
                self.counters
                    .release_mismatches
                    .fetch_add(1, Ordering::Relaxed);
                log::warn!("Release token mismatch for lock {key}");
                false
            }
        }
    }

    fn waiter_count(&self, key: LockKey) -> usize {
        let table = self.table.lock().expect("lock table poisoned");
        table.waiters.get(&key).copied().unwrap_or(0)
    }

    fn register_waiter(&self, key: LockKey) {
        let mut table = self.table.lock().expect("lock table poisoned");
        *table.waiters.entry(key).or_default() += 1;
    }

    fn unregister_waiter(&self, key: LockKey) {
        let mut table = self.table.lock().expect("lock table poisoned");
        if let Some(count) = table.waiters.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                table.waiters.remove(&key);
            }
        }
    }
}

/// Scoped lock ownership; releases on drop so every exit path (success,
/// error, cancellation of the holding future) gives the lock back.
pub struct LockGuard<'a> {
    manager: &'a LockManager,
    key: LockKey,
    token: Option<LockToken>,
}

impl LockGuard<'_> {
    /// Release eagerly instead of at end of scope.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(token) = self.token.take() {
            self.manager.release(self.key, &token);
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_manager() -> LockManager {
        LockManager::new(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
            multiplier: 1.0,
            max_delay: Duration::from_millis(5),
            jitter_ratio: 0.0,
        })
    }

    const TTL: Duration = Duration::from_secs(5);

    #[test]
    fn action_lock_is_exclusive_per_chat_and_user() {
        let manager = fast_manager();
        let token = manager.acquire_action_lock(1, 10, "call", TTL);
        assert!(token.is_some());
        assert!(manager.acquire_action_lock(1, 10, "fold", TTL).is_none());
        // Same chat, different user is a different lock.
        assert!(manager.acquire_action_lock(1, 11, "call", TTL).is_some());
        // Different chat entirely.
        assert!(manager.acquire_action_lock(2, 10, "call", TTL).is_some());
    }

    #[test]
    fn release_requires_matching_token() {
        let manager = fast_manager();
        let token = manager.acquire_action_lock(1, 10, "call", TTL).unwrap();

        let err = manager
            .release_action_lock(1, 10, "not-the-token")
            .unwrap_err();
        assert!(matches!(err, LockError::ReleaseMismatch { .. }));
        assert_eq!(manager.metrics().release_mismatches, 1);
        // The lock is still held after a mismatched release.
        assert!(manager.acquire_action_lock(1, 10, "call", TTL).is_none());

        manager.release_action_lock(1, 10, &token).unwrap();
        assert!(manager.acquire_action_lock(1, 10, "call", TTL).is_some());
    }

    #[tokio::test]
    async fn expired_locks_self_heal() {
        let manager = fast_manager();
        // Simulated crash: token discarded without release.
        let _abandoned = manager
            .acquire_action_lock(1, 10, "call", Duration::from_millis(10))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(manager.acquire_action_lock(1, 10, "call", TTL).is_some());
        assert_eq!(manager.metrics().expired_reclaims, 1);
    }

    #[tokio::test]
    async fn retry_acquisition_waits_out_a_short_holder() {
        let manager = std::sync::Arc::new(fast_manager());
        let token = manager.acquire_action_lock(1, 10, "call", TTL).unwrap();

        let release_handle = {
            let manager = manager.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(8)).await;
                manager.release_action_lock(1, 10, &token).unwrap();
            })
        };

        let (token, stats) = manager
            .acquire_action_lock_with_retry(1, 10, "call", TTL)
            .await
            .expect("lock should free up within the retry budget");
        assert!(stats.attempts > 1);
        assert!(!token.is_empty());
        release_handle.await.unwrap();
    }

    #[tokio::test]
    async fn retry_acquisition_gives_up_after_budget() {
        let manager = fast_manager();
        let _held = manager.acquire_action_lock(1, 10, "call", TTL).unwrap();

        let err = manager
            .acquire_action_lock_with_retry(1, 10, "call", TTL)
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::AcquisitionTimeout { .. }));
        assert!(manager.metrics().contention >= 3);
    }

    #[tokio::test]
    async fn stage_guard_releases_on_drop() {
        let manager = fast_manager();
        {
            let _guard = manager
                .stage_lock_guard(1, Duration::from_millis(50))
                .await
                .unwrap();
            // Held while the guard lives.
            assert!(
                manager
                    .stage_lock_guard(1, Duration::from_millis(10))
                    .await
                    .is_err()
            );
        }
        assert!(
            manager
                .stage_lock_guard(1, Duration::from_millis(50))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn action_guard_releases_on_drop() {
        let manager = fast_manager();
        {
            let (_guard, stats) = manager
                .action_lock_guard_with_retry(1, 10, "call", TTL)
                .await
                .unwrap();
            assert_eq!(stats.attempts, 1);
            assert!(manager.acquire_action_lock(1, 10, "fold", TTL).is_none());
        }
        // Dropping the guard gave the lock back without a token.
        assert!(manager.acquire_action_lock(1, 10, "fold", TTL).is_some());
    }

    #[test]
    fn table_guard_releases_on_drop() {
        let manager = fast_manager();
        {
            let _guard = manager.table_lock_guard(1, "join", TTL).unwrap();
            assert!(manager.table_lock_guard(1, "leave", TTL).is_none());
        }
        assert!(manager.table_lock_guard(1, "leave", TTL).is_some());
    }

    #[test]
    fn out_of_order_acquisition_is_counted_not_rejected() {
        let manager = fast_manager();
        let _action = manager.acquire_action_lock(1, 10, "call", TTL).unwrap();
        // Table after action breaks the table -> stage -> action order.
        let table = manager.acquire_table_lock(1, "join", TTL);
        assert!(table.is_some());
        assert_eq!(manager.metrics().ordering_violations, 1);
    }
}
