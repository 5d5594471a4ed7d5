// tests/common/mod.rs
pub use axum::{Router, body::Body};
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Form, Json};
use secrecy::SecretString;

use crate::config::credentials::Credentials;
use crate::error::AuthError;
use crate::sources::{ExchangeResult, TokenExchanger};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn token_body(token: &str, expires_in: u64) -> String {
    json!({"token_type": "Bearer", "expires_in": expires_in, "access_token": token}).to_string()
}

pub fn test_credentials(login_url: String) -> Credentials {
    Credentials::new(login_url, "abc".into(), SecretString::from("xyz".to_owned()), "t1".into())
}

/// In-memory exchanger. Replays scripted results in order and repeats the last one.
#[derive(Clone)]
pub struct FakeExchanger {
    calls: Arc<AtomicUsize>,
    delay: Duration,
    script: Arc<Mutex<VecDeque<Result<ExchangeResult, AuthError>>>>,
}

impl FakeExchanger {
    fn with(first: Result<ExchangeResult, AuthError>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            script: Arc::new(Mutex::new(VecDeque::from([first]))),
        }
    }

    pub fn ok(token: &str, expires_in: u64) -> Self {
        Self::raw(&token_body(token, expires_in))
    }

    pub fn raw(body: &str) -> Self {
        Self::with(Ok(ExchangeResult {
            status: 200,
            body: body.to_owned(),
        }))
    }

    pub fn failing(err: AuthError) -> Self {
        Self::with(Err(err))
    }

    pub fn then_ok(self, token: &str, expires_in: u64) -> Self {
        self.script.lock().unwrap().push_back(Ok(ExchangeResult {
            status: 200,
            body: token_body(token, expires_in),
        }));
        self
    }

    pub fn then_fail(self, err: AuthError) -> Self {
        self.script.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenExchanger for FakeExchanger {
    async fn exchange(&self) -> Result<ExchangeResult, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }
}

/// Identity provider stub: checks the form, counts requests, answers after `delay`.
#[derive(Clone)]
pub struct FakeProvider {
    pub hits: Arc<AtomicUsize>,
    pub delay: Duration,
    pub status: StatusCode,
    pub token: String,
    pub expires_in: u64,
}

impl FakeProvider {
    pub fn new(token: &str, expires_in: u64) -> Self {
        Self {
            hits: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            status: StatusCode::OK,
            token: token.to_owned(),
            expires_in,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Serve on `POST /{tenant}/oauth2/v2.0/token`, returns the login URL.
    pub async fn spawn(&self) -> (JoinHandle<()>, String) {
        let router = Router::new()
            .route("/t1/oauth2/v2.0/token", post(provider_token))
            .with_state(self.clone());
        let (handle, addr) = spawn_axum(router).await;
        (handle, format!("http://{}/t1/oauth2/v2.0/token", addr))
    }
}

async fn provider_token(
    State(provider): State<FakeProvider>,
    Form(form): Form<std::collections::HashMap<String, String>>,
) -> impl IntoResponse {
    provider.hits.fetch_add(1, Ordering::SeqCst);
    if !provider.delay.is_zero() {
        tokio::time::sleep(provider.delay).await;
    }

    let expected = [
        ("client_id", "abc"),
        ("client_secret", "xyz"),
        ("tenant", "t1"),
        ("grant_type", "client_credentials"),
        ("scope", "https://graph.microsoft.com/.default"),
    ];
    if expected.iter().any(|(k, v)| form.get(*k).map(String::as_str) != Some(*v)) {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_request"})));
    }
    if provider.status != StatusCode::OK {
        return (provider.status, Json(json!({"error": "invalid_client"})));
    }

    (
        StatusCode::OK,
        Json(json!({
            "token_type": "Bearer",
            "expires_in": provider.expires_in,
            "access_token": provider.token,
        })),
    )
}
