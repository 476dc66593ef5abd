//! API Key Pool
//!
//! Manages multiple credentials for a single provider: usage tracking,
//! rate-limit cooldowns, and rotation-strategy selection. All mutable state
//! sits behind one mutex so concurrent selections never lose an update to
//! the cursor or the per-key counters.

use crate::config::RotationStrategy;
use crate::error::{RelayError, Result};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fixed cooldown applied when a provider signals quota exhaustion.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// A single credential with usage tracking.
#[derive(Debug)]
struct KeyRecord {
    credential: String,
    last_used: Option<Instant>,
    request_count: u64,
    rate_limited_until: Option<Instant>,
    last_error: Option<String>,
}

impl KeyRecord {
    fn new(credential: String) -> Self {
        Self {
            credential,
            last_used: None,
            request_count: 0,
            rate_limited_until: None,
            last_error: None,
        }
    }

    fn is_available(&self, now: Instant) -> bool {
        match self.rate_limited_until {
            Some(until) => now >= until,
            None => true,
        }
    }
}

/// Diagnostics snapshot of one key. Credentials are prefix-redacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStatus {
    pub key_prefix: String,
    pub request_count: u64,
    pub is_rate_limited: bool,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct PoolState {
    keys: Vec<KeyRecord>,
    /// Round-robin cursor; next index to hand out.
    cursor: usize,
}

impl PoolState {
    /// Clear cooldowns that have elapsed. Cleanup is lazy, done as a side
    /// effect of selection.
    fn clear_expired(&mut self, now: Instant) {
        for key in &mut self.keys {
            if let Some(until) = key.rate_limited_until {
                if now >= until {
                    key.rate_limited_until = None;
                }
            }
        }
    }

    /// Apply the rotation strategy over the currently available keys.
    /// Returns the selected index, or `None` when every key is cooled down.
    fn pick(&mut self, strategy: RotationStrategy, now: Instant) -> Option<usize> {
        if !self.keys.iter().any(|k| k.is_available(now)) {
            return None;
        }

        match strategy {
            RotationStrategy::RoundRobin => {
                // Advance the shared cursor through the full list (not just
                // the available subset) so long-run distribution stays fair.
                // The availability check and the scan happen under the same
                // lock, so at most one full cycle is needed.
                let len = self.keys.len();
                for _ in 0..len {
                    let idx = self.cursor;
                    self.cursor = (self.cursor + 1) % len;
                    if self.keys[idx].is_available(now) {
                        return Some(idx);
                    }
                }
                None
            }
            RotationStrategy::Random => {
                use std::collections::hash_map::RandomState;
                use std::hash::{BuildHasher, Hasher};

                let available: Vec<usize> = self
                    .keys
                    .iter()
                    .enumerate()
                    .filter(|(_, k)| k.is_available(now))
                    .map(|(i, _)| i)
                    .collect();

                let hasher = RandomState::new().build_hasher();
                Some(available[hasher.finish() as usize % available.len()])
            }
            RotationStrategy::LeastUsed => self
                .keys
                .iter()
                .enumerate()
                .filter(|(_, k)| k.is_available(now))
                .min_by_key(|(_, k)| k.request_count)
                .map(|(i, _)| i),
        }
    }

    /// Index of the key whose cooldown ends soonest.
    fn soonest(&self) -> usize {
        self.keys
            .iter()
            .enumerate()
            .min_by_key(|(_, k)| k.rate_limited_until.unwrap_or_else(Instant::now))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Stamp usage on the key at `idx` and return its credential.
    fn stamp(&mut self, idx: usize, now: Instant) -> String {
        let key = &mut self.keys[idx];
        key.last_used = Some(now);
        key.request_count += 1;
        key.credential.clone()
    }
}

/// Pool of credentials for one provider.
#[derive(Debug)]
pub struct KeyPool {
    state: Mutex<PoolState>,
    strategy: RotationStrategy,
    /// Upper bound on the in-selection wait when every key is cooled down.
    max_wait: Duration,
}

impl KeyPool {
    /// Create a pool. Fails with a configuration error when `keys` is empty.
    pub fn new(keys: Vec<String>, strategy: RotationStrategy) -> Result<Self> {
        Self::with_max_wait(
            keys,
            strategy,
            Duration::from_secs(crate::config::DEFAULT_MAX_COOLDOWN_WAIT_SECS),
        )
    }

    /// Create a pool with a custom bound on the all-keys-cooled-down wait.
    pub fn with_max_wait(
        keys: Vec<String>,
        strategy: RotationStrategy,
        max_wait: Duration,
    ) -> Result<Self> {
        let keys: Vec<KeyRecord> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(KeyRecord::new)
            .collect();

        if keys.is_empty() {
            return Err(RelayError::Config(
                "key pool requires at least one credential".to_string(),
            ));
        }

        Ok(Self {
            state: Mutex::new(PoolState { keys, cursor: 0 }),
            strategy,
            max_wait,
        })
    }

    /// Number of keys in the pool.
    pub fn len(&self) -> usize {
        self.state.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when at least one key is usable right now.
    pub fn has_available(&self) -> bool {
        let now = Instant::now();
        self.state.lock().keys.iter().any(|k| k.is_available(now))
    }

    /// Select the next credential under the configured strategy.
    ///
    /// When every key is cooled down, the calling task is parked for
    /// `min(remaining_cooldown, max_wait)` and then proceeds — with the
    /// soonest-available key if the bound truncated the wait. The sleep
    /// never holds the pool lock; other callers keep making progress.
    pub async fn select(&self) -> String {
        if let Some(credential) = self.try_select() {
            return credential;
        }

        let wait = self.remaining_cooldown().min(self.max_wait);
        let wait_ms = wait.as_millis() as u64;
        debug!(wait_ms, "all keys cooled down, parking caller");
        tokio::time::sleep(wait).await;

        if let Some(credential) = self.try_select() {
            return credential;
        }

        // The bound truncated the wait and every key is still cooled down.
        // Waiting longer would stall the whole request; proceed with the key
        // that frees up soonest.
        let now = Instant::now();
        let mut state = self.state.lock();
        let idx = state.soonest();
        state.stamp(idx, now)
    }

    /// One selection attempt under the lock; `None` when no key is usable.
    fn try_select(&self) -> Option<String> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.clear_expired(now);
        let idx = state.pick(self.strategy, now)?;
        Some(state.stamp(idx, now))
    }

    /// Shortest remaining cooldown across the pool.
    fn remaining_cooldown(&self) -> Duration {
        let now = Instant::now();
        self.state
            .lock()
            .keys
            .iter()
            .filter_map(|k| k.rate_limited_until)
            .map(|until| until.saturating_duration_since(now))
            .min()
            .unwrap_or(Duration::ZERO)
    }

    /// Mark a credential as rate-limited for `cooldown`.
    ///
    /// Called by the adapter when the vendor reports quota exhaustion; the
    /// pool itself never inspects response bodies.
    pub fn mark_rate_limited(&self, credential: &str, cooldown: Duration) {
        let mut state = self.state.lock();
        if let Some(key) = state.keys.iter_mut().find(|k| k.credential == credential) {
            key.rate_limited_until = Some(Instant::now() + cooldown);
            key.last_error = Some("rate limited".to_string());
            warn!(
                key_prefix = %redact(credential),
                cooldown_secs = cooldown.as_secs(),
                "key marked rate-limited"
            );
        }
    }

    /// Diagnostics snapshot with prefix-redacted credentials.
    pub fn key_status(&self) -> Vec<KeyStatus> {
        let now = Instant::now();
        self.state
            .lock()
            .keys
            .iter()
            .map(|k| KeyStatus {
                key_prefix: redact(&k.credential),
                request_count: k.request_count,
                is_rate_limited: !k.is_available(now),
                last_error: k.last_error.clone(),
            })
            .collect()
    }
}

/// First ten characters of a credential, for logs and diagnostics.
fn redact(credential: &str) -> String {
    let prefix: String = credential.chars().take(10).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pool(keys: &[&str], strategy: RotationStrategy) -> KeyPool {
        KeyPool::new(keys.iter().map(|k| k.to_string()).collect(), strategy).unwrap()
    }

    #[test]
    fn test_empty_pool_rejected() {
        let err = KeyPool::new(vec![], RotationStrategy::RoundRobin).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));

        // Whitespace-only credentials count as empty.
        let err = KeyPool::new(
            vec!["  ".to_string(), "".to_string()],
            RotationStrategy::RoundRobin,
        )
        .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[tokio::test]
    async fn test_round_robin_visits_each_key_once() {
        let pool = pool(&["key1", "key2", "key3"], RotationStrategy::RoundRobin);

        assert_eq!(pool.select().await, "key1");
        assert_eq!(pool.select().await, "key2");
        assert_eq!(pool.select().await, "key3");
        assert_eq!(pool.select().await, "key1");
    }

    #[tokio::test]
    async fn test_round_robin_skips_rate_limited() {
        let pool = pool(&["key1", "key2"], RotationStrategy::RoundRobin);
        pool.mark_rate_limited("key1", Duration::from_secs(60));

        assert_eq!(pool.select().await, "key2");
        assert_eq!(pool.select().await, "key2");
    }

    #[tokio::test]
    async fn test_least_used_prefers_cold_keys() {
        let pool = pool(&["key1", "key2", "key3"], RotationStrategy::LeastUsed);

        // Warm up key1 by three selections where the others are cooled down.
        pool.mark_rate_limited("key2", Duration::from_secs(60));
        pool.mark_rate_limited("key3", Duration::from_secs(60));
        for _ in 0..3 {
            assert_eq!(pool.select().await, "key1");
        }

        // Once the others are usable again they must be preferred until the
        // counts even out.
        let mut state = pool.state.lock();
        for key in &mut state.keys {
            key.rate_limited_until = None;
        }
        drop(state);

        let mut picks = Vec::new();
        for _ in 0..6 {
            picks.push(pool.select().await);
        }
        assert_eq!(picks.iter().filter(|k| *k == "key1").count(), 0);
        assert_eq!(picks.iter().filter(|k| *k == "key2").count(), 3);
        assert_eq!(picks.iter().filter(|k| *k == "key3").count(), 3);
    }

    #[tokio::test]
    async fn test_least_used_ties_break_by_list_order() {
        let pool = pool(&["key1", "key2"], RotationStrategy::LeastUsed);
        assert_eq!(pool.select().await, "key1");
        assert_eq!(pool.select().await, "key2");
        assert_eq!(pool.select().await, "key1");
    }

    #[tokio::test]
    async fn test_random_only_picks_available() {
        let pool = pool(&["key1", "key2", "key3"], RotationStrategy::Random);
        pool.mark_rate_limited("key1", Duration::from_secs(60));
        pool.mark_rate_limited("key3", Duration::from_secs(60));

        for _ in 0..10 {
            assert_eq!(pool.select().await, "key2");
        }
    }

    #[tokio::test]
    async fn test_single_key_cooldown_blocks_then_returns() {
        let pool = pool(&["only-key"], RotationStrategy::RoundRobin);
        pool.mark_rate_limited("only-key", Duration::from_millis(150));

        let start = Instant::now();
        let credential = pool.select().await;
        let elapsed = start.elapsed();

        assert_eq!(credential, "only-key");
        assert!(elapsed >= Duration::from_millis(100), "returned too early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "waited too long: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_capped_wait_proceeds_with_soonest_key() {
        let pool = KeyPool::with_max_wait(
            vec!["k1".to_string(), "k2".to_string()],
            RotationStrategy::RoundRobin,
            Duration::from_millis(50),
        )
        .unwrap();

        pool.mark_rate_limited("k1", Duration::from_secs(30));
        pool.mark_rate_limited("k2", Duration::from_secs(600));

        let start = Instant::now();
        let credential = pool.select().await;

        // Wait is bounded; the soonest key is used even though still cooled.
        assert_eq!(credential, "k1");
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_lazy_cooldown_clearing() {
        let pool = pool(&["key1", "key2"], RotationStrategy::RoundRobin);
        pool.mark_rate_limited("key1", Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(40)).await;

        // Selection clears the elapsed cooldown as a side effect.
        let _ = pool.select().await;
        let status = pool.key_status();
        assert!(!status[0].is_rate_limited);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_selection_loses_no_updates() {
        let pool = Arc::new(pool(&["key1", "key2", "key3"], RotationStrategy::RoundRobin));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(async move { pool.select().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let total: u64 = pool.key_status().iter().map(|s| s.request_count).sum();
        assert_eq!(total, 50);
    }

    #[tokio::test]
    async fn test_key_status_redacts_credentials() {
        let pool = pool(
            &["super-secret-key-material", "ab"],
            RotationStrategy::RoundRobin,
        );
        pool.mark_rate_limited("super-secret-key-material", Duration::from_secs(60));

        let status = pool.key_status();
        assert_eq!(status[0].key_prefix, "super-secr...");
        assert!(status[0].is_rate_limited);
        assert_eq!(status[0].last_error.as_deref(), Some("rate limited"));
        assert_eq!(status[1].key_prefix, "ab...");
        assert!(!status[1].is_rate_limited);
    }

    #[test]
    fn test_has_available() {
        let pool = pool(&["key1"], RotationStrategy::RoundRobin);
        assert!(pool.has_available());

        pool.mark_rate_limited("key1", Duration::from_secs(60));
        assert!(!pool.has_available());
    }
}
