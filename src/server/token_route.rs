use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use crate::gate::auth_gate::AuthGate;
use crate::server::server::AppState;
use crate::sources::TokenExchanger;

#[derive(Debug, Serialize)]
struct TokenBody {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub struct TokenState<E> {
    pub gate: AuthGate<E>,
}

impl<E> Clone for TokenState<E> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
        }
    }
}

impl<E: TokenExchanger> TokenState<E> {
    pub fn new(gate: AuthGate<E>) -> Self {
        Self { gate }
    }

    pub fn router(&self, token_path: &str) -> Router<AppState<E>> {
        info!("served path: {}", token_path);
        Router::new().route(token_path, get(handle_token::<E>))
    }
}

async fn handle_token<E: TokenExchanger>(State(state): State<AppState<E>>) -> Response {
    let gate = &state.token_state.gate;
    match gate.current_entry().await {
        Ok(entry) => {
            let body = TokenBody {
                access_token: entry.access_token.clone(),
                token_type: "Bearer",
                expires_in: entry.remaining_seconds(gate.cache().now_unix()),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            warn!(reason = e.reason(), "token request failed: {}", e);
            let body = ErrorBody { error: e.to_string() };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}
