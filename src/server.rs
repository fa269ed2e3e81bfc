use axum::{
    extract::{State, ws::{Message as WsMessage, WebSocket, WebSocketUpgrade}},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::events::{EventSink, InboundEvent, OutboundEvent};
use crate::orchestrator::{ResponseRecord, SessionHandler};

/// Handler failure rendered as a 500 with a JSON `error` field.
struct ServerError(anyhow::Error);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        warn!("Request failed: {:#}", self.0);
        let message = format!("Survey server error: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for ServerError where E: Into<anyhow::Error> {
    fn from(err: E) -> Self { Self(err.into()) }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionHandler>,
}

impl AppState {
    pub fn new(sessions: SessionHandler) -> Self {
        Self { sessions: Arc::new(sessions) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/results", get(results))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Persona survey server listening on ws://{}/ws", listener.local_addr()?);
    serve(listener, state).await
}

/// Serve on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    axum::serve(listener, router(state)).await.context("Server terminated")?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn results(State(state): State<AppState>) -> Result<Json<Vec<ResponseRecord>>, ServerError> {
    Ok(Json(state.sessions.saved_results().await?))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    info!("Client connected: {}", session_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundEvent>();

    // Outbound events for this session, in emission order.
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode {} event: {}", event.name(), e);
                    continue;
                }
            };
            if sender.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            WsMessage::Text(text) => match serde_json::from_str::<InboundEvent>(text.as_str()) {
                Ok(InboundEvent::SubmitSurvey(request)) => {
                    let sessions = state.sessions.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        sessions.submit(request, &tx).await;
                    });
                }
                Err(e) => {
                    warn!("Session {}: invalid event: {}", session_id, e);
                    tx.emit(OutboundEvent::error(format!("Invalid request: {}", e))).await;
                }
            },
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    info!("Client disconnected: {}", session_id);
}
