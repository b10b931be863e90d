//! Gateway server: axum HTTP endpoints for the WeCom callback plus a health
//! probe, the inbound queue, and the dispatch processor task.

use crate::channels::{CallbackEvent, ChannelHandle, ChannelRegistry, GroupMessage, WecomChannel};
use crate::completion::{CompletionBackend, CompletionClient};
use crate::config::{self, Config};
use crate::dispatch::Dispatcher;
use crate::images::{ImageBackend, ImageClient};
use crate::init;
use crate::session::SessionStore;
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shared state for the gateway (config, sessions, channels).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// In-process background tasks; stopped during graceful shutdown.
    pub channel_tasks: Arc<tokio::sync::RwLock<Vec<JoinHandle<()>>>>,
    /// Sender for inbound group messages (WeCom callback POSTs). Processor task receives.
    pub inbound_tx: mpsc::Sender<GroupMessage>,
    pub session_store: Arc<SessionStore>,
    pub channel_registry: Arc<ChannelRegistry>,
    /// WeCom connector used by the callback handlers (signature checks, event mapping).
    pub wecom: Arc<WecomChannel>,
}

/// Run the gateway server (WeCom callback + health on one port).
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    init::require_initialized(&config_path)?;

    let auth_token = match config::resolve_completion_token(&config) {
        Some(token) => token,
        None => anyhow::bail!(
            "refusing to start without a completion token (set completion.authToken or WXBOT_COMPLETION_TOKEN)"
        ),
    };
    let callback_token = config::resolve_callback_token(&config);
    if callback_token.is_none() {
        log::warn!("no wecom callback token configured; callback requests will be rejected");
    }
    let fallback_webhook = config::resolve_fallback_webhook(&config);
    if fallback_webhook.is_none() {
        log::warn!("no fallback webhook configured; replies need per-message response urls");
    }

    let channel_tasks = Arc::new(tokio::sync::RwLock::new(Vec::new()));
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<GroupMessage>(64);

    let wecom = Arc::new(WecomChannel::new(callback_token, fallback_webhook));
    let state = GatewayState {
        config: Arc::new(config.clone()),
        channel_tasks: channel_tasks.clone(),
        inbound_tx: inbound_tx.clone(),
        session_store: Arc::new(SessionStore::new()),
        channel_registry: Arc::new(ChannelRegistry::new()),
        wecom: wecom.clone(),
    };
    state
        .channel_registry
        .register(wecom.id().to_string(), wecom.clone())
        .await;

    let completion: Arc<dyn CompletionBackend> = Arc::new(CompletionClient::new(
        &config.completion.endpoint,
        &config.completion.model,
        &auth_token,
    ));
    let images: Option<Arc<dyn ImageBackend>> = if config.images.enabled {
        Some(Arc::new(ImageClient::new(
            &config.images.endpoint,
            &config.images.size,
            &auth_token,
        )))
    } else {
        None
    };
    let dispatcher = Arc::new(Dispatcher::new(
        &config,
        state.session_store.clone(),
        state.channel_registry.clone(),
        completion,
        images,
    ));

    // Each message gets its own task so one slow turn never blocks the queue.
    let processor = tokio::spawn(async move {
        while let Some(msg) = inbound_rx.recv().await {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                if let Err(e) = dispatcher.handle(msg).await {
                    log::warn!("handle group message error: {:#}", e);
                }
            });
        }
    });
    state.channel_tasks.write().await.push(processor);
    log::info!("wecom channel registered and dispatch processor started");

    let channel_registry = state.channel_registry.clone();
    let app = Router::new()
        .route("/", get(health_http))
        .route("/health", get(health_http))
        .route("/wecom/callback", get(wecom_verify).post(wecom_callback))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.gateway.bind, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(channel_registry, channel_tasks))
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Stops channel connectors, then aborts the in-process dispatch tasks.
async fn shutdown_signal(
    channel_registry: Arc<ChannelRegistry>,
    channel_tasks: Arc<tokio::sync::RwLock<Vec<JoinHandle<()>>>>,
) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, stopping channels");

    for id in channel_registry.ids().await {
        if let Some(handle) = channel_registry.get(&id).await {
            handle.stop();
        }
    }

    let handles = {
        let mut g = channel_tasks.write().await;
        std::mem::take(&mut *g)
    };
    for h in handles {
        h.abort();
    }
    log::info!("channel tasks stopped");
}

/// Query string shared by WeCom callback verification and delivery.
#[derive(Deserialize)]
struct CallbackQuery {
    #[serde(default)]
    msg_signature: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    nonce: String,
    #[serde(default)]
    echostr: Option<String>,
}

/// GET /wecom/callback — URL ownership handshake; echoes echostr when the signature checks out.
async fn wecom_verify(
    State(state): State<GatewayState>,
    Query(query): Query<CallbackQuery>,
) -> (StatusCode, String) {
    if !state
        .wecom
        .verify_signature(&query.msg_signature, &query.timestamp, &query.nonce)
    {
        return (StatusCode::UNAUTHORIZED, String::new());
    }
    (StatusCode::OK, query.echostr.unwrap_or_default())
}

/// POST /wecom/callback — receives a group message event JSON; verifies the
/// signature, maps it and pushes a GroupMessage for dispatch.
async fn wecom_callback(
    State(state): State<GatewayState>,
    Query(query): Query<CallbackQuery>,
    body: Bytes,
) -> StatusCode {
    if !state
        .wecom
        .verify_signature(&query.msg_signature, &query.timestamp, &query.nonce)
    {
        return StatusCode::UNAUTHORIZED;
    }
    let event: CallbackEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    let msg = state.wecom.group_message(event);
    if state.inbound_tx.send(msg).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.config.gateway.port,
    }))
}
