//! Scheduled token refresh for logged-in sessions.
//!
//! Sessions are stored server-side and only touched when a request arrives,
//! so a background refresh cannot write into the session directly. Instead
//! each session owns one [`RefreshScheduler`] here, keyed by the
//! `StoredTokens::key` kept in the session. The scheduler refreshes ahead
//! of expiry and parks the new pair; [`TokenKeeper::sync`] hands it back
//! on the session's next request so it can be persisted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sapa_api::{RefreshScheduler, TokenPair, TokenRefresher};
use tokio::time::Instant;
use uuid::Uuid;

struct Entry<R: TokenRefresher> {
    scheduler: RefreshScheduler<R>,
    /// The pair the scheduler was last started from.
    tracked: TokenPair,
    last_seen: Instant,
}

/// Registry of per-session refresh schedulers.
pub struct TokenKeeper<R: TokenRefresher = sapa_api::ApiClient> {
    refresher: R,
    skew: chrono::Duration,
    idle_timeout: Duration,
    entries: Mutex<HashMap<Uuid, Entry<R>>>,
}

impl<R: TokenRefresher> TokenKeeper<R> {
    /// `idle_timeout` should match the session inactivity expiry; entries
    /// not seen for that long are dropped by [`Self::sweep`].
    #[must_use]
    pub fn new(refresher: R, skew: chrono::Duration, idle_timeout: Duration) -> Self {
        Self {
            refresher,
            skew,
            idle_timeout,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Lead time before expiry used for both scheduled and on-demand refresh.
    #[must_use]
    pub const fn skew(&self) -> chrono::Duration {
        self.skew
    }

    /// Reconcile the session's pair with the scheduler.
    ///
    /// Returns a newer pair when a scheduled refresh has completed since the
    /// session last saw its tokens; the caller must store it. Otherwise the
    /// scheduler is (re)started whenever `current` differs from the pair it
    /// is tracking, so a token change always cancels the stale refresh.
    pub fn sync(&self, key: Uuid, current: &TokenPair) -> Option<TokenPair> {
        let mut entries = self.lock();
        let now = Instant::now();

        if let Some(entry) = entries.get_mut(&key) {
            entry.last_seen = now;

            if let Some(latest) = entry.scheduler.latest()
                && latest.expires_at > current.expires_at
                && latest != entry.tracked
            {
                // The running task already scheduled the next refresh.
                entry.tracked = latest.clone();
                return Some(latest);
            }

            if entry.tracked != *current {
                entry.scheduler.reschedule(current.clone());
                entry.tracked = current.clone();
            }
            return None;
        }

        let scheduler = RefreshScheduler::new(self.refresher.clone(), self.skew);
        scheduler.reschedule(current.clone());
        entries.insert(
            key,
            Entry {
                scheduler,
                tracked: current.clone(),
                last_seen: now,
            },
        );
        tracing::debug!(%key, "Token refresh tracked for session");
        None
    }

    /// Stop refreshing for a session (logout).
    pub fn forget(&self, key: Uuid) {
        if self.lock().remove(&key).is_some() {
            tracing::debug!(%key, "Token refresh cancelled for session");
        }
    }

    /// Drop entries idle for longer than the session lifetime.
    ///
    /// Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        let idle_timeout = self.idle_timeout;
        entries.retain(|_, entry| entry.last_seen.elapsed() < idle_timeout);
        before - entries.len()
    }

    /// Number of sessions with a tracked pair.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a refresh is pending for the session.
    #[must_use]
    pub fn is_scheduled(&self, key: Uuid) -> bool {
        self.lock()
            .get(&key)
            .is_some_and(|entry| entry.scheduler.is_scheduled())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Entry<R>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: TokenRefresher> std::fmt::Debug for TokenKeeper<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeeper")
            .field("skew", &self.skew)
            .field("sessions", &self.len())
            .finish_non_exhaustive()
    }
}

/// Periodically sweep idle entries until the keeper is dropped.
pub fn spawn_sweeper<R: TokenRefresher>(keeper: &Arc<TokenKeeper<R>>, every: Duration) {
    let keeper = Arc::downgrade(keeper);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(keeper) = keeper.upgrade() else {
                return;
            };
            let removed = keeper.sweep();
            if removed > 0 {
                tracing::info!(removed, "Swept idle token refresh entries");
            }
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use sapa_api::{ApiError, DEFAULT_REFRESH_SKEW};

    use super::*;

    #[derive(Clone, Default)]
    struct StubRefresher {
        calls: Arc<AtomicUsize>,
    }

    impl TokenRefresher for StubRefresher {
        async fn refresh_tokens(&self, _refresh_token: &str) -> Result<TokenPair, ApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenPair::new(format!("access-{n}"), None, 3600))
        }
    }

    fn keeper(refresher: StubRefresher) -> TokenKeeper<StubRefresher> {
        TokenKeeper::new(refresher, DEFAULT_REFRESH_SKEW, Duration::from_secs(3600))
    }

    fn pair(access: &str, expires_in: i64) -> TokenPair {
        TokenPair::new(access.into(), Some("refresh".into()), expires_in)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_hands_back_scheduled_refresh() {
        let refresher = StubRefresher::default();
        let keeper = keeper(refresher.clone());
        let key = Uuid::new_v4();
        let original = pair("access-0", 120);

        assert!(keeper.sync(key, &original).is_none());
        assert!(keeper.is_scheduled(key));

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);

        let renewed = keeper.sync(key, &original).unwrap();
        assert_eq!(renewed.access_token, "access-1");
        assert_eq!(renewed.refresh_token.as_deref(), Some("refresh"));

        // Once persisted, the same pair is not handed back again.
        assert!(keeper.sync(key, &renewed).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_changed_tokens_reschedule() {
        let refresher = StubRefresher::default();
        let keeper = keeper(refresher.clone());
        let key = Uuid::new_v4();

        keeper.sync(key, &pair("a", 120));
        // Replaced by a reactive refresh before the schedule fired.
        keeper.sync(key, &pair("b", 3600));

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
        assert!(keeper.is_scheduled(key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forget_cancels() {
        let refresher = StubRefresher::default();
        let keeper = keeper(refresher.clone());
        let key = Uuid::new_v4();

        keeper.sync(key, &pair("a", 120));
        keeper.forget(key);
        assert!(keeper.is_empty());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_idle_sessions() {
        let keeper = keeper(StubRefresher::default());
        keeper.sync(Uuid::new_v4(), &pair("a", 86_400));
        assert_eq!(keeper.sweep(), 0);

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert_eq!(keeper.sweep(), 1);
        assert!(keeper.is_empty());
    }
}
