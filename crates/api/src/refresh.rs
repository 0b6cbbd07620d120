//! Scheduled access-token refresh.
//!
//! One [`RefreshScheduler`] per token holder. It sleeps until shortly before
//! the access token expires, refreshes it, publishes the new pair on a
//! `watch` channel and goes back to sleep. Rescheduling replaces the pending
//! task, so at most one refresh is ever queued.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::auth::TokenPair;
use crate::client::ApiClient;
use crate::error::ApiError;

/// Default lead time before expiry at which a refresh fires.
pub const DEFAULT_REFRESH_SKEW: chrono::Duration = chrono::Duration::seconds(60);

/// Floor between two scheduled refreshes, so a server that hands out
/// already-expiring tokens cannot make us spin.
const MIN_DELAY: Duration = Duration::from_secs(1);

/// Something that can exchange a refresh token for a new pair.
pub trait TokenRefresher: Clone + Send + Sync + 'static {
    fn refresh_tokens(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenPair, ApiError>> + Send;
}

impl TokenRefresher for ApiClient {
    async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.refresh(refresh_token).await
    }
}

/// Keeps one pending refresh for a token pair.
///
/// Dropping the scheduler cancels the pending refresh.
pub struct RefreshScheduler<R: TokenRefresher = ApiClient> {
    refresher: R,
    skew: chrono::Duration,
    tx: Arc<watch::Sender<Option<TokenPair>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<R: TokenRefresher> RefreshScheduler<R> {
    #[must_use]
    pub fn new(refresher: R, skew: chrono::Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            refresher,
            skew,
            tx: Arc::new(tx),
            task: Mutex::new(None),
        }
    }

    /// Receive every pair the scheduler obtains.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<TokenPair>> {
        self.tx.subscribe()
    }

    /// The most recent pair obtained by a scheduled refresh.
    #[must_use]
    pub fn latest(&self) -> Option<TokenPair> {
        self.tx.borrow().clone()
    }

    /// Cancel any pending refresh and schedule one for `tokens`.
    ///
    /// Pairs without a refresh token are not scheduled.
    pub fn reschedule(&self, tokens: TokenPair) {
        self.cancel();
        if !tokens.can_refresh() {
            return;
        }

        let refresher = self.refresher.clone();
        let tx = Arc::clone(&self.tx);
        let skew = self.skew;
        let handle = tokio::spawn(run(refresher, tokens, skew, tx));
        *self.lock() = Some(handle);
    }

    /// Cancel the pending refresh, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.lock().take() {
            handle.abort();
        }
    }

    /// Whether a refresh is pending.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: TokenRefresher> Drop for RefreshScheduler<R> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<R: TokenRefresher> std::fmt::Debug for RefreshScheduler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("skew", &self.skew)
            .field("scheduled", &self.is_scheduled())
            .finish_non_exhaustive()
    }
}

async fn run<R: TokenRefresher>(
    refresher: R,
    mut tokens: TokenPair,
    skew: chrono::Duration,
    tx: Arc<watch::Sender<Option<TokenPair>>>,
) {
    loop {
        let delay = (tokens.refresh_due_at(skew) - Utc::now())
            .to_std()
            .unwrap_or_default()
            .max(MIN_DELAY);
        debug!(delay_secs = delay.as_secs(), "Token refresh scheduled");
        tokio::time::sleep(delay).await;

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            return;
        };

        match refresher.refresh_tokens(&refresh_token).await {
            Ok(renewed) => {
                tokens = renewed.inherit_refresh_token(&tokens);
                debug!(expires_at = %tokens.expires_at, "Scheduled token refresh succeeded");
                tx.send_replace(Some(tokens.clone()));
            }
            Err(e) => {
                warn!(error = %e, "Scheduled token refresh failed");
                return;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingRefresher {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl TokenRefresher for CountingRefresher {
        async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(ApiError::Unauthorized);
            }
            assert!(!refresh_token.is_empty());
            Ok(TokenPair::new(format!("access-{n}"), None, 3600))
        }
    }

    fn expiring(in_secs: i64) -> TokenPair {
        TokenPair::new("access-0".into(), Some("refresh".into()), in_secs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_fires_before_expiry() {
        let refresher = CountingRefresher::default();
        let scheduler = RefreshScheduler::new(refresher.clone(), DEFAULT_REFRESH_SKEW);
        let mut rx = scheduler.subscribe();

        scheduler.reschedule(expiring(120));
        assert!(scheduler.is_scheduled());

        rx.changed().await.unwrap();
        let tokens = rx.borrow().clone().unwrap();
        assert_eq!(tokens.access_token, "access-1");
        // The refresh token is carried over when the API does not rotate it.
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.latest().unwrap().access_token, "access-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_task() {
        let refresher = CountingRefresher::default();
        let scheduler = RefreshScheduler::new(refresher.clone(), DEFAULT_REFRESH_SKEW);

        scheduler.reschedule(expiring(3600));
        scheduler.reschedule(expiring(3600));
        scheduler.cancel();
        assert!(!scheduler.is_scheduled());

        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_stops_schedule() {
        let refresher = CountingRefresher {
            fail: true,
            ..CountingRefresher::default()
        };
        let scheduler = RefreshScheduler::new(refresher.clone(), DEFAULT_REFRESH_SKEW);
        scheduler.reschedule(expiring(30));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_scheduled());
        assert!(scheduler.latest().is_none());
    }

    #[tokio::test]
    async fn test_pairs_without_refresh_token_are_not_scheduled() {
        let scheduler = RefreshScheduler::new(CountingRefresher::default(), DEFAULT_REFRESH_SKEW);
        scheduler.reschedule(TokenPair::new("a".into(), None, 60));
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let refresher = CountingRefresher::default();
        {
            let scheduler = RefreshScheduler::new(refresher.clone(), DEFAULT_REFRESH_SKEW);
            scheduler.reschedule(expiring(120));
        }
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }
}
