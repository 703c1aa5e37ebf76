//! HTTP server: the Twilio chat webhook, the M-Pesa callback, and a health check.
//!
//! Both webhooks always acknowledge with 200. Upstream senders retry or give up
//! on anything else, and neither can act on an error body.

use crate::gateway::{CallbackOutcome, Gateway};
use axum::{
    body::Bytes,
    extract::{
        rejection::{FormRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use slipbot_channels::InboundForm;
use slipbot_core::config::ApiConfig;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    gateway: Arc<Gateway>,
    /// Shared secret expected as `?token=` on payment callbacks.
    callback_token: Option<String>,
}

impl ApiState {
    pub fn new(gateway: Arc<Gateway>, callback_token: &str) -> Self {
        let callback_token = callback_token.trim();
        Self {
            gateway,
            callback_token: (!callback_token.is_empty()).then(|| callback_token.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    token: Option<String>,
}

/// Constant-time string comparison to prevent timing attacks on token validation.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

fn callback_ack() -> Json<Value> {
    Json(json!({"ResultCode": 0, "ResultDesc": "Accepted"}))
}

/// `POST /webhook`: Twilio inbound message. Acknowledged at once, the reply is
/// sent out of band.
async fn webhook(
    State(state): State<ApiState>,
    form: Result<Form<InboundForm>, FormRejection>,
) -> impl IntoResponse {
    match form {
        Ok(Form(form)) => {
            let incoming = form.into_incoming();
            let gateway = state.gateway.clone();
            tokio::spawn(async move {
                gateway.handle_message(incoming).await;
            });
        }
        Err(e) => warn!("webhook: unreadable form body: {e}"),
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        EMPTY_TWIML,
    )
}

/// `POST /mpesa-callback`: STK push result.
async fn mpesa_callback(
    State(state): State<ApiState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
    body: Bytes,
) -> Json<Value> {
    // An unreadable query string counts as no token.
    let given = match query {
        Ok(Query(q)) => q.token.unwrap_or_default(),
        Err(e) => {
            debug!("mpesa-callback: unreadable query string: {e}");
            String::new()
        }
    };
    if let Some(expected) = &state.callback_token {
        if !constant_time_eq(&given, expected) {
            warn!("mpesa-callback: missing or wrong token, ignoring");
            return callback_ack();
        }
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!("mpesa-callback: body is not JSON: {e}");
            return callback_ack();
        }
    };

    match state.gateway.handle_payment_callback(&payload).await {
        CallbackOutcome::Granted(event) => {
            debug!("mpesa-callback: granted {} to {}", event.tier, event.subscriber)
        }
        CallbackOutcome::Ignored(reason) => debug!("mpesa-callback: ignored ({reason})"),
        CallbackOutcome::StoreFailed(reason) => {
            error!("mpesa-callback: acknowledged but not recorded ({reason})")
        }
    }
    callback_ack()
}

/// `GET /api/health`: uptime and store status.
async fn health(State(state): State<ApiState>) -> Json<Value> {
    let store = state.gateway.machine().store();
    let subscribers = match store.count().await {
        Ok(n) => json!(n),
        Err(e) => {
            warn!("health: store count failed: {e}");
            Value::Null
        }
    };

    Json(json!({
        "status": "ok",
        "uptime_secs": state.gateway.uptime().as_secs(),
        "store": store.name(),
        "subscribers": subscribers,
    }))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/mpesa-callback", post(mpesa_callback))
        .route("/api/health", get(health))
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ApiConfig, state: ApiState) -> anyhow::Result<()> {
    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        error!("API server failed to bind to {addr}: {e}");
        anyhow::anyhow!("failed to bind {addr}: {e}")
    })?;

    info!("API server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        return;
    }
    info!("shutdown signal received");
}
