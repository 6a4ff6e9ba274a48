//! Server network layer: WebSocket transport, health probe and static files

use crate::config::{validate_game_config, ServerConfig};
use crate::error::ServerError;
use crate::mirror::MirrorHandle;
use crate::session::{Connection, SessionController, SessionHandle};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

/// State shared by the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub send_queue: usize,
}

/// Builds the HTTP surface around a running session actor
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            router.fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => router,
    };

    router.layer(CorsLayer::permissive())
}

/// Bound listener plus the session actor it serves
pub struct Server {
    listener: TcpListener,
    router: Router,
}

impl Server {
    /// Validates the configuration, binds the listener and starts the session actor
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        validate_game_config(&config.game)?;

        let listener = TcpListener::bind(&config.address)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.address.clone(),
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        let mirror = MirrorHandle::spawn(config.mirror.clone());
        let session = SessionController::new(config.game, mirror).spawn();

        let state = AppState {
            session,
            send_queue: config.send_queue.max(1),
        };
        let router = build_router(state, config.static_dir.as_deref());

        info!(
            "Canvas {}x{}, player size {}",
            config.game.width, config.game.height, config.game.player_size
        );

        Ok(Server { listener, router })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves connections until the listener fails
    pub async fn run(self) -> Result<(), ServerError> {
        info!("Server started successfully");
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.player_count().await {
        Some(players) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "players": players })),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        ),
    }
}

/// Drives one WebSocket for its whole lifetime
///
/// The reader half feeds frames to the connection state machine in arrival
/// order. The writer half drains the connection's outbound queue, so a slow
/// socket only backs up its own queue.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (outbox, mut inbox) = mpsc::channel::<String>(state.send_queue);

    let mut connection = Connection::new(state.session.clone());
    let id = connection.id();
    if !connection.join(outbox) {
        warn!("Rejecting {}: session actor unavailable", id);
        return;
    }
    info!("Client connected as {}", id);

    let mut writer = tokio::spawn(async move {
        while let Some(text) = inbox.recv().await {
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => connection.handle_frame(text.as_str()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("Read error on {}: {}", id, e);
                        break;
                    }
                }
            }
            _ = &mut writer => {
                debug!("Writer for {} stopped", id);
                break;
            }
        }
    }

    connection.leave();
    info!("Client {} disconnected", id);
}
