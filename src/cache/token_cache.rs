use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::token::TokenEntry;
use crate::error::AuthError;
use crate::helpers::time::{Clock, SystemClock};
use crate::observability::metrics::get_metrics;
use crate::parser::parser::parse_token_response;
use crate::resilience::retry::RetrySettings;
use crate::sources::TokenExchanger;
use crate::validator::token_validator::TokenValidator;

/// Outcome of one refresh attempt, `None` until it resolves.
type Outcome = Option<Result<Arc<TokenEntry>, AuthError>>;

/// Single-slot token cache with single-flight refresh.
///
/// Slot states:
/// - empty or stale: the next caller starts a refresh
/// - valid: returned without any network call
/// - refreshing: callers subscribe to the in-flight attempt and all receive
///   its outcome, success or the same error
///
/// A failed refresh leaves the slot untouched, so the next call retries.
pub struct TokenCache<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for TokenCache<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<E> {
    exchanger: E,
    validator: Arc<dyn TokenValidator>,
    clock: Arc<dyn Clock>,
    retry: RetrySettings,
    slot: RwLock<Option<Arc<TokenEntry>>>,
    in_flight: Mutex<Option<watch::Receiver<Outcome>>>,
}

enum Flight {
    Ready(Arc<TokenEntry>),
    Wait(watch::Receiver<Outcome>),
}

impl<E: TokenExchanger> TokenCache<E> {
    /// Wall clock, one exchange per refresh.
    pub fn new(exchanger: E, validator: Arc<dyn TokenValidator>) -> Self {
        Self::with_parts(exchanger, validator, Arc::new(SystemClock), RetrySettings::no_retry())
    }

    pub fn with_parts(
        exchanger: E,
        validator: Arc<dyn TokenValidator>,
        clock: Arc<dyn Clock>,
        retry: RetrySettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                exchanger,
                validator,
                clock,
                retry,
                slot: RwLock::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Return a valid access token, refreshing it first when needed.
    pub async fn get_token(&self) -> Result<String, AuthError> {
        self.get_entry().await.map(|entry| entry.access_token.clone())
    }

    /// Same as [`get_token`](Self::get_token) but returns the whole entry.
    pub async fn get_entry(&self) -> Result<Arc<TokenEntry>, AuthError> {
        let metrics = get_metrics().await;

        if let Some(entry) = self.inner.valid_entry().await {
            metrics.cache_hits.inc();
            debug!(expires_at = entry.expires_at, "token cache hit");
            return Ok(entry);
        }
        metrics.cache_misses.inc();

        let mut rx = match self.join_or_start_refresh().await {
            Flight::Ready(entry) => return Ok(entry),
            Flight::Wait(rx) => rx,
        };

        let outcome: Outcome = match rx.wait_for(Option::is_some).await {
            Ok(published) => published.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(result) => result,
            None => {
                self.inner.release_abandoned(&rx).await;
                Err(AuthError::RefreshAborted)
            }
        }
    }

    /// Current entry, valid or not, without refreshing.
    pub async fn peek(&self) -> Option<Arc<TokenEntry>> {
        self.inner.slot.read().await.clone()
    }

    /// "now" as seen by expiry checks.
    pub fn now_unix(&self) -> i64 {
        self.inner.clock.now_unix()
    }

    pub async fn is_refreshing(&self) -> bool {
        self.inner.in_flight.lock().await.is_some()
    }

    async fn join_or_start_refresh(&self) -> Flight {
        let mut in_flight = self.inner.in_flight.lock().await;

        // a closed channel means the refresh task was dropped without reopening the gate
        if in_flight.as_ref().is_some_and(|rx| rx.has_changed().is_err()) {
            warn!("previous token refresh was abandoned, starting a new one");
            *in_flight = None;
        }

        if let Some(rx) = in_flight.as_ref() {
            get_metrics().await.refresh_waiters.inc();
            debug!("joining in-flight token refresh");
            return Flight::Wait(rx.clone());
        }

        // a refresh may have finished between the first check and the gate
        if let Some(entry) = self.inner.valid_entry().await {
            return Flight::Ready(entry);
        }

        let (tx, rx) = watch::channel(None);
        *in_flight = Some(rx.clone());
        drop(in_flight);

        info!("token missing or stale, starting refresh");
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let worker = inner.clone();
            let outcome = match tokio::spawn(async move { worker.refresh().await }).await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    warn!(error = %join_error, "token refresh task did not complete");
                    Err(AuthError::RefreshAborted)
                }
            };
            inner.publish(outcome, tx).await;
        });

        Flight::Wait(rx)
    }
}

impl<E: TokenExchanger> Inner<E> {
    async fn valid_entry(&self) -> Option<Arc<TokenEntry>> {
        let now = self.clock.now_unix();
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|entry| self.validator.is_valid(Some(entry.as_ref()), now))
            .cloned()
    }

    async fn refresh(&self) -> Result<Arc<TokenEntry>, AuthError> {
        let entry = self.retry.run_with_retry(move || self.exchange_once()).await?;
        Ok(Arc::new(entry))
    }

    async fn exchange_once(&self) -> Result<TokenEntry, AuthError> {
        let exchange = self.exchanger.exchange().await?;
        parse_token_response(&exchange.body, self.clock.now_unix()).await
    }

    /// Reopen the gate if it still points at `rx`, whose sender is gone.
    async fn release_abandoned(&self, rx: &watch::Receiver<Outcome>) {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.as_ref().is_some_and(|current| current.same_channel(rx)) {
            *in_flight = None;
        }
    }

    /// Store on success, hand the outcome to every subscriber, then open the gate.
    async fn publish(&self, outcome: Result<Arc<TokenEntry>, AuthError>, tx: watch::Sender<Outcome>) {
        let metrics = get_metrics().await;
        match &outcome {
            Ok(entry) => {
                *self.slot.write().await = Some(entry.clone());
                metrics.token_refreshes.with_label_values(&["success"]).inc();
                metrics.token_expiry_unix.set(entry.expires_at);
                info!(expires_at = entry.expires_at, "token refreshed");
            }
            Err(e) => {
                metrics.token_refreshes.with_label_values(&["failure"]).inc();
                warn!(reason = e.reason(), error = %e, "token refresh failed, cache left unchanged");
            }
        }

        // receivers are held by the gate and by every waiter, so this cannot fail
        let _ = tx.send(Some(outcome));
        *self.in_flight.lock().await = None;
    }
}
