//! HTTP front for the dispatcher.
//!
//! Handlers only translate between JSON and [`DispatcherHandle::submit`];
//! the per-request timeout lives here because the dispatcher has none.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::consts::{STATE_COMMAND, format_duration};
use crate::dispatcher::DispatcherHandle;
use crate::error::DispatchError;

const COMMAND_ENDPOINT: &str = "/api/command";
const STATE_ENDPOINT: &str = "/api/state";
const HEALTH_ENDPOINT: &str = "/api/health";

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default = "default_expect_reply")]
    pub expect_reply: bool,
}

fn default_expect_reply() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct ServerState {
    dispatcher: DispatcherHandle,
    request_timeout: Duration,
}

impl ServerState {
    pub fn new(dispatcher: DispatcherHandle, request_timeout: Duration) -> Self {
        Self {
            dispatcher,
            request_timeout,
        }
    }

    async fn dispatch(&self, command: &str, expect_reply: bool) -> Response {
        let submitted = self.dispatcher.submit(command, expect_reply);
        match tokio::time::timeout(self.request_timeout, submitted).await {
            Ok(Ok(reply)) => (StatusCode::OK, Json(reply)).into_response(),
            Ok(Err(error)) => dispatch_error_response(&error),
            Err(_) => {
                warn!(command, "worker did not answer in time");
                error_response(
                    StatusCode::GATEWAY_TIMEOUT,
                    "worker_timeout",
                    format!(
                        "no reply from worker within {}",
                        format_duration(self.request_timeout)
                    ),
                )
            }
        }
    }
}

pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route(COMMAND_ENDPOINT, post(handle_command))
        .route(STATE_ENDPOINT, get(handle_state))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .with_state(Arc::new(state))
}

/// Bind and serve until Ctrl+C.
pub async fn serve(config: &GatewayConfig, dispatcher: DispatcherHandle) -> Result<()> {
    let bind_addr = config.bind_addr()?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve listen address")?;
    info!(addr = %local_addr, "listening");

    let app = build_router(ServerState::new(dispatcher, config.request_timeout));
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(tokio::signal::ctrl_c()))
        .await
        .context("http server exited unexpectedly")?;
    Ok(())
}

/// Resolve once `signal` fires. If the handler could not be installed,
/// keep serving instead of shutting down at once.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutdown requested"),
        Err(error) => {
            warn!(%error, "could not listen for Ctrl+C; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}

async fn handle_command(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CommandRequest>,
) -> Response {
    if request.command.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "empty_command",
            "command cannot be empty".to_string(),
        );
    }
    info!(command = %request.command, expect_reply = request.expect_reply, "run");
    state.dispatch(&request.command, request.expect_reply).await
}

async fn handle_state(State(state): State<Arc<ServerState>>) -> Response {
    state.dispatch(STATE_COMMAND, true).await
}

async fn handle_health(State(state): State<Arc<ServerState>>) -> Response {
    let status = if state.dispatcher.is_closed() {
        "closed"
    } else {
        "ready"
    };
    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "pending": state.dispatcher.pending(),
        })),
    )
        .into_response()
}

fn dispatch_error_response(error: &DispatchError) -> Response {
    let (status, code) = match error {
        DispatchError::InvalidCommand(_) => (StatusCode::BAD_REQUEST, "invalid_command"),
        DispatchError::Closed => (StatusCode::SERVICE_UNAVAILABLE, "worker_closed"),
        DispatchError::Write(_) => (StatusCode::INTERNAL_SERVER_ERROR, "worker_write_failed"),
    };
    error_response(status, code, error.to_string())
}

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    (
        status,
        Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        })),
    )
        .into_response()
}
