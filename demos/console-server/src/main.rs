//! Demo server exposing a page console over WebSocket.
//!
//! Run with: cargo run -p console-server-demo
//!
//! Then open http://localhost:3000 in your browser. Set `PAGE_CONSOLE_CONFIG`
//! to a TOML file to override the defaults:
//!
//! ```toml
//! bind_addr = "127.0.0.1:3000"
//!
//! [console]
//! command_buffer = 64
//! forward_debug_output = true
//! ```

use std::{net::SocketAddr, path::Path};

use anyhow::Context as _;
use axum::{Router, response::Html, routing::get};
use page_console_script::ScriptInterpreter;
use page_console_session::{ConsoleConfig, ConsoleHandle};
use page_console_transport::websocket::create_ws_router;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Demo server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ServerConfig {
    bind_addr: SocketAddr,
    console: ConsoleConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            console: ConsoleConfig::default(),
        }
    }
}

impl ServerConfig {
    fn load() -> anyhow::Result<Self> {
        let Some(path) = std::env::var_os("PAGE_CONSOLE_CONFIG") else {
            return Ok(Self::default());
        };
        let path = Path::new(&path);
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }
}

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

    let config = ServerConfig::load()?;
    let (console, session_task) = ConsoleHandle::spawn(ScriptInterpreter::new(), &config.console);

    // Build router
    let app = Router::new()
        .route("/", get(index_handler))
        .merge(create_ws_router(console.clone()))
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!("Server listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    console.shutdown().await?;
    session_task.await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Page Console</title>
    <style>
        body {
            margin: 0;
            padding: 20px;
            background: #1e1e1e;
            color: #d4d4d4;
            font-family: Menlo, Monaco, "Courier New", monospace;
        }
        h1 { color: #fff; font-family: system-ui, sans-serif; margin-bottom: 10px; }
        .status { color: #888; font-size: 14px; margin-bottom: 10px; }
        .connected { color: #4a4; }
        .disconnected { color: #a44; }
        #output { height: calc(100vh - 170px); overflow-y: auto; }
        #output > div, .group > div { padding: 2px 0; border-bottom: 1px solid #333; }
        .group { margin-left: 16px; border-left: 1px solid #555; padding-left: 6px; }
        .group.collapsed > :not(summary) { display: none; }
        .js-number, .js-boolean { color: #b5cea8; }
        .js-string { color: #ce9178; }
        .js-null, .js-undefined { color: #808080; }
        .js-error-name, .error { color: #f48771; }
        .warn { color: #cca700; }
        .info { color: #75beff; }
        #input { width: 100%; box-sizing: border-box; background: #252526; color: inherit;
                 border: 1px solid #444; padding: 6px; font: inherit; }
    </style>
</head>
<body>
    <h1>Page Console</h1>
    <div class="status" id="status">Connecting...</div>
    <div id="output"></div>
    <input id="input" placeholder="Type script and press Enter" autocomplete="off" />

    <script>
        const status = document.getElementById('status');
        const output = document.getElementById('output');
        const input = document.getElementById('input');
        let ws;
        let next = 0;
        let latest = -1;
        let pending = false;
        let groups = [output];

        function render(type, payload) {
            const parent = groups[groups.length - 1];
            if (type === 'html') {
                const line = document.createElement('div');
                line.innerHTML = payload;
                parent.appendChild(line);
            } else if (type === 'clear') {
                output.innerHTML = '';
                groups = [output];
            } else if (type === 'group' || type === 'groupCollapsed') {
                const group = document.createElement('div');
                group.className = type === 'group' ? 'group' : 'group collapsed';
                const title = document.createElement('summary');
                title.textContent = payload;
                title.onclick = () => group.classList.toggle('collapsed');
                group.appendChild(title);
                parent.appendChild(group);
                groups.push(group);
            } else if (type === 'groupEnd' && groups.length > 1) {
                groups.pop();
            }
            output.scrollTop = output.scrollHeight;
        }

        function pull() {
            if (!pending && ws && ws.readyState === WebSocket.OPEN) {
                pending = true;
                ws.send(JSON.stringify({ type: 'get_messages', start_index: next }));
            }
        }

        function connect() {
            const protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
            ws = new WebSocket(`${protocol}//${window.location.host}/ws`);

            ws.onopen = () => {
                status.textContent = 'Connected';
                status.className = 'status connected';
            };

            ws.onclose = () => {
                status.textContent = 'Disconnected - reconnecting...';
                status.className = 'status disconnected';
                setTimeout(connect, 2000);
            };

            ws.onmessage = (event) => {
                const msg = JSON.parse(event.data);
                if (msg.type === 'attached') {
                    output.innerHTML = '';
                    groups = [output];
                    next = 0;
                    latest = -1;
                    pending = false;
                    pull();
                } else if (msg.type === 'did_output_message') {
                    latest = Math.max(latest, msg.index);
                    pull();
                } else if (msg.type === 'did_get_messages') {
                    pending = false;
                    msg.message_types.forEach((type, i) => render(type, msg.messages[i]));
                    next = msg.start_index + msg.messages.length;
                    if (latest >= next) pull();
                } else if (msg.type === 'did_misbehave' || msg.type === 'error') {
                    pending = false;
                    console.error('Console server:', msg.reason || msg.message);
                }
            };
        }

        input.addEventListener('keydown', (event) => {
            if (event.key === 'Enter' && input.value && ws && ws.readyState === WebSocket.OPEN) {
                ws.send(JSON.stringify({ type: 'submit_script', source: input.value }));
                input.value = '';
            }
        });

        connect();
    </script>
</body>
</html>
"#;
