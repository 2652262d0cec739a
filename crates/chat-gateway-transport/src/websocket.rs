//! WebSocket transport for the conversational gateway.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade, ws::WebSocket},
    response::IntoResponse,
    routing::get,
};
use chat_gateway_core::{ConnectionHandle, ConnectionId, Outbound};
use chat_gateway_session::{GatewayDispatcher, SessionSummary};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::protocol::{self, ClientFrame};

/// Route the chat socket is served on by default.
pub const DEFAULT_PATH: &str = "/customer-support-agent";

/// Largest inbound message accepted, in bytes.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// WebSocket handler state.
#[derive(Clone)]
pub struct WsState {
    /// Dispatcher shared by every connection.
    pub dispatcher: Arc<GatewayDispatcher>,
    /// Inbound message size limit.
    pub max_message_bytes: usize,
}

impl WsState {
    /// Create new WebSocket state.
    #[must_use]
    pub const fn new(dispatcher: Arc<GatewayDispatcher>) -> Self {
        Self {
            dispatcher,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    /// Override the inbound message size limit.
    #[must_use]
    pub const fn with_max_message_bytes(mut self, max_message_bytes: usize) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }
}

/// WebSocket upgrade handler.
///
/// Use this as an Axum route handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.max_message_size(state.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state.dispatcher))
}

async fn handle_socket(socket: WebSocket, dispatcher: Arc<GatewayDispatcher>) {
    let (mut sender, mut receiver) = socket.split();

    // Channel for sending messages to the client
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let connection = ConnectionHandle::new(ConnectionId::new(), Arc::new(tx));
    let connection_id = connection.id();

    if let Err(e) = dispatcher.on_open(&connection).await {
        let _ = sender.send(protocol::refusal(&e)).await;
        return;
    }
    // The session actor holds the send-path from here on.
    drop(connection);

    // Spawn task to forward messages to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(protocol::encode(msg)).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!(%connection_id, "WebSocket error: {e}");
                break;
            }
        };

        match protocol::decode(msg) {
            ClientFrame::Text(text) => {
                // Errors are logged by the dispatcher and never end the connection.
                let _ = dispatcher.on_message(connection_id, text).await;
            }
            ClientFrame::Close => break,
            ClientFrame::Skip => {}
        }
    }

    let _ = dispatcher.on_close(connection_id).await;
    send_task.abort();

    tracing::info!(%connection_id, "WebSocket disconnected");
}

/// Health report.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub live_sessions: usize,
}

/// `GET /health`.
pub async fn health_handler(State(state): State<WsState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        live_sessions: state.dispatcher.registry().len().await,
    })
}

/// `GET /sessions`.
pub async fn sessions_handler(State(state): State<WsState>) -> Json<Vec<SessionSummary>> {
    Json(state.dispatcher.registry().snapshot().await)
}

/// Create the gateway router.
///
/// Serves the chat socket on `path`, plus `/health` and `/sessions`.
///
/// # Example
/// ```ignore
/// let app = Router::new()
///     .merge(create_router(WsState::new(dispatcher), DEFAULT_PATH));
/// ```
#[must_use]
pub fn create_router(state: WsState, path: &str) -> Router {
    Router::new()
        .route(path, get(ws_handler))
        .route("/health", get(health_handler))
        .route("/sessions", get(sessions_handler))
        .with_state(state)
}
