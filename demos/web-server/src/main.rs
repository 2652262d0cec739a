//! Demo chat server.
//!
//! Run with: cargo run -p web-server-demo
//!
//! Then open http://localhost:8080 in your browser.
//!
//! Environment:
//! - `GATEWAY_ADDR` - bind address (default `127.0.0.1:8080`)
//! - `GATEWAY_CONFIG` - path to a JSON `GatewayConfig`
//! - `GATEWAY_*` - config overrides, see `GatewayConfig::apply_env`
//! - `RUST_LOG` - log filter (default `info`)

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, response::Html, routing::get};
use chat_gateway_core::{EchoAgent, GatewayConfig};
use chat_gateway_session::GatewayDispatcher;
use chat_gateway_transport::{DEFAULT_PATH, WsState, create_router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = load_config()?;
    let addr: SocketAddr = std::env::var("GATEWAY_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .context("GATEWAY_ADDR is not a socket address")?;

    let dispatcher = Arc::new(GatewayDispatcher::new(Arc::new(EchoAgent), &config));

    // Build router
    let app = Router::new()
        .route("/", get(index_handler))
        .merge(create_router(WsState::new(dispatcher), DEFAULT_PATH))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    tracing::info!(
        max_sessions = ?config.max_sessions,
        agent_timeout = ?config.agent_timeout(),
        "Server listening on http://{addr}"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn load_config() -> anyhow::Result<GatewayConfig> {
    let mut config = match std::env::var("GATEWAY_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {path}"))?;
            GatewayConfig::from_json(&json)?
        }
        Err(_) => GatewayConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Miles of Smiles - Customer Support</title>
    <style>
        body {
            margin: 0;
            padding: 20px;
            background: #f4f6f8;
            font-family: system-ui, sans-serif;
        }
        h1 { color: #234; margin-bottom: 10px; }
        .status { color: #888; font-size: 14px; margin-bottom: 10px; }
        .connected { color: #4a4; }
        .disconnected { color: #a44; }
        #log {
            height: calc(100vh - 200px);
            overflow-y: auto;
            background: #fff;
            border-radius: 8px;
            padding: 12px;
        }
        .msg { max-width: 70%; margin: 6px 0; padding: 8px 12px; border-radius: 12px; }
        .bot { background: #e8eef5; }
        .user { background: #2b6cb0; color: #fff; margin-left: auto; }
        .loading { color: #888; font-style: italic; }
        form { display: flex; gap: 8px; margin-top: 10px; }
        input { flex: 1; padding: 8px; }
    </style>
</head>
<body>
    <h1>Miles of Smiles</h1>
    <div class="status" id="status">Connecting...</div>
    <div id="log"></div>
    <form id="form">
        <input id="input" autocomplete="off" placeholder="Type a message" />
        <button type="submit">Send</button>
    </form>

    <script>
        const log = document.getElementById('log');
        const status = document.getElementById('status');
        const form = document.getElementById('form');
        const input = document.getElementById('input');
        let ws;

        function append(text, cls) {
            const div = document.createElement('div');
            div.className = 'msg ' + cls;
            div.textContent = text;
            log.appendChild(div);
            log.scrollTop = log.scrollHeight;
            return div;
        }

        function hideLastLoading() {
            const pending = log.querySelector('.loading');
            if (pending) pending.remove();
        }

        function connect() {
            const protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
            ws = new WebSocket(`${protocol}//${window.location.host}/customer-support-agent`);

            ws.onopen = () => {
                status.textContent = 'Connected';
                status.className = 'status connected';
            };

            ws.onclose = (event) => {
                hideLastLoading();
                status.textContent = event.code === 1013
                    ? 'Server busy - retrying...'
                    : 'Disconnected - reconnecting...';
                status.className = 'status disconnected';
                setTimeout(connect, 2000);
            };

            ws.onmessage = (event) => {
                hideLastLoading();
                append(event.data, 'bot');
            };
        }

        form.addEventListener('submit', (e) => {
            e.preventDefault();
            const text = input.value.trim();
            if (!text || !ws || ws.readyState !== WebSocket.OPEN) return;
            append(text, 'user');
            append('...', 'bot loading');
            ws.send(text);
            input.value = '';
        });

        connect();
    </script>
</body>
</html>
"#;
