// src/webhook/server.rs

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::engine::{wait_for_shutdown, TriggerCoordinator, TriggerReason};

use super::auth::{WebhookAuth, SIGNATURE_HEADER};

/// State shared by the webhook handlers.
#[derive(Debug, Clone)]
pub struct WebhookState {
    pub coordinator: TriggerCoordinator,
    pub auth: WebhookAuth,
}

impl WebhookState {
    pub fn new(coordinator: TriggerCoordinator, auth: WebhookAuth) -> Self {
        Self { coordinator, auth }
    }
}

/// `POST /update` and `GET /health`. Other methods on `/update` get 405.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/update", post(update))
        .route("/health", get(health))
        .with_state(state)
}

async fn update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(err) = state.auth.check(&body, signature) {
        warn!(error = %err, "rejected webhook request");
        return (StatusCode::UNAUTHORIZED, "unauthorized");
    }

    debug!(bytes = body.len(), "webhook request authenticated");
    state.coordinator.trigger(TriggerReason::Webhook);

    (StatusCode::OK, "accepted")
}

async fn health() -> &'static str {
    "ok"
}

/// Serve on a pre-bound listener until `shutdown` flips.
///
/// Binding stays with the caller, so bind errors surface at startup and tests
/// can bind port 0.
pub async fn serve_on(
    listener: TcpListener,
    state: WebhookState,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let local = listener.local_addr()?;

    if state.auth.is_open() {
        warn!("webhook secret is empty; POST /update is open to anyone who can reach {local}");
    }
    info!(addr = %local, "webhook listener started");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { wait_for_shutdown(&mut shutdown).await })
        .await?;

    info!("webhook listener stopped");
    Ok(())
}
