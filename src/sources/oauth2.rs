use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::config::credentials::Credentials;
use crate::config::settings::{PoolConfig, TimeoutsConfig};
use crate::error::AuthError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::sources::{ExchangeResult, TokenExchanger};

const REJECTED_BODY_LOG_LIMIT: usize = 256;

/// Client-credentials exchange against the configured login URL.
///
/// Timeouts:
/// - connection request: waiting for one of `max_connections` slots
/// - connect: TCP/TLS establishment (reqwest `connect_timeout`)
/// - read: each read of the response (reqwest `read_timeout`)
#[derive(Debug, Clone)]
pub struct OAuth2Exchanger {
    credentials: Arc<Credentials>,
    client: Client,
    slots: Arc<Semaphore>,
    connection_request_timeout: Duration,
    response_deadline: Duration,
}

impl OAuth2Exchanger {
    pub fn new(credentials: Credentials, timeouts: &TimeoutsConfig, pool: &PoolConfig) -> Result<Self, AuthError> {
        let max_connections = pool.max_connections.max(1);
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(timeouts.connect_ms))
            .read_timeout(Duration::from_millis(timeouts.read_ms))
            .pool_max_idle_per_host(max_connections)
            .build()
            .map_err(|e| AuthError::configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            credentials: Arc::new(credentials),
            client,
            slots: Arc::new(Semaphore::new(max_connections)),
            connection_request_timeout: Duration::from_millis(timeouts.connection_request_ms),
            response_deadline: Duration::from_millis(timeouts.connect_ms.saturating_add(timeouts.read_ms)),
        })
    }

    async fn acquire_slot(&self) -> Result<OwnedSemaphorePermit, AuthError> {
        match tokio::time::timeout(self.connection_request_timeout, self.slots.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(closed)) => Err(AuthError::NetworkError {
                message: "connection pool closed".to_owned(),
                source: Some(Arc::new(closed)),
            }),
            Err(elapsed) => Err(AuthError::ConnectTimeout {
                message: format!(
                    "no connection available within {} ms",
                    self.connection_request_timeout.as_millis()
                ),
                source: Some(Arc::new(elapsed)),
            }),
        }
    }

    async fn execute_auth_request(&self) -> Result<ExchangeResult, AuthError> {
        let _slot = self.acquire_slot().await?;

        let request = self
            .client
            .post(&self.credentials.login_url)
            .form(&self.credentials.form_params())
            .build()
            .map_err(|e| AuthError::RequestBuildFailure {
                message: e.to_string(),
                source: Some(Arc::new(e)),
            })?;

        debug!(url = %request.url(), client_id = %self.credentials.client_id, "sending client-credentials request");
        // upper bound for one exchange; the per-phase timeouts usually fire first
        let (status, body) = tokio::time::timeout(self.response_deadline, async {
            let response = self.client.execute(request).await.map_err(classify_transport_error)?;
            let status = response.status();
            let body = response.text().await.map_err(classify_transport_error)?;
            Ok::<_, AuthError>((status, body))
        })
        .await
        .map_err(|elapsed| AuthError::ReadTimeout {
            source: Some(Arc::new(elapsed)),
        })??;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                body = %truncate(&body, REJECTED_BODY_LOG_LIMIT),
                "token endpoint rejected the request"
            );
            return Err(AuthError::UpstreamRejected {
                status: status.as_u16(),
            });
        }

        Ok(ExchangeResult {
            status: status.as_u16(),
            body,
        })
    }
}

impl TokenExchanger for OAuth2Exchanger {
    async fn exchange(&self) -> Result<ExchangeResult, AuthError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        metrics.exchange_requests.inc();

        let result = self.execute_auth_request().await;
        metrics.exchange_duration.observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(exchange) => info!(
                status = exchange.status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "token exchange succeeded"
            ),
            Err(e) => {
                metrics.exchange_failures.with_label_values(&[e.reason()]).inc();
                warn!(reason = e.reason(), error = %e, "token exchange failed");
            }
        }
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportFailure {
    Build,
    ConnectTimeout,
    ReadTimeout,
    Network,
}

fn transport_failure(is_builder: bool, timed_out: bool, is_connect: bool) -> TransportFailure {
    match (is_builder, timed_out, is_connect) {
        (true, _, _) => TransportFailure::Build,
        (false, true, true) => TransportFailure::ConnectTimeout,
        (false, true, false) => TransportFailure::ReadTimeout,
        (false, false, _) => TransportFailure::Network,
    }
}

/// Map a reqwest failure onto the exchange taxonomy.
fn classify_transport_error(e: reqwest::Error) -> AuthError {
    let timed_out = e.is_timeout() || has_timed_out_io(&e);
    let message = e.to_string();

    match transport_failure(e.is_builder(), timed_out, e.is_connect()) {
        TransportFailure::Build => AuthError::RequestBuildFailure {
            message,
            source: Some(Arc::new(e)),
        },
        TransportFailure::ConnectTimeout => AuthError::ConnectTimeout {
            message,
            source: Some(Arc::new(e)),
        },
        TransportFailure::ReadTimeout => AuthError::ReadTimeout {
            source: Some(Arc::new(e)),
        },
        TransportFailure::Network => AuthError::NetworkError {
            message,
            source: Some(Arc::new(e)),
        },
    }
}

fn has_timed_out_io(e: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = err.source();
    }
    false
}

fn truncate(body: &str, limit: usize) -> &str {
    match body.char_indices().nth(limit) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
