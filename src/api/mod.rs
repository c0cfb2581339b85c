//! HTTP/WebSocket service surface.
//!
//! Exposes the coordinator over three endpoints:
//! - `POST /query` — blocking answer, or push mode when a channel id is
//!   supplied in the request body;
//! - `POST /query/stream` — pull mode as an NDJSON stream of event frames;
//! - `GET /ws/{channel_id}` — registers a push channel that receives
//!   `{"kind","text"}` frames for queries bound to that id.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::agent::Coordinator;
use crate::error::AgentError;
use crate::transport::QueueChannel;

/// Shared state behind the router.
struct AppState {
    coordinator: Arc<Coordinator>,
    push_send_timeout: Duration,
    shutdown: CancellationToken,
}

/// Body of `POST /query` and `POST /query/stream`.
#[derive(Debug, Deserialize)]
struct QueryRequest {
    /// Comparison to query.
    comparison_id: String,
    /// The natural-language question.
    question: String,
    /// Strategy tag; defaults to the tabular variant.
    #[serde(default = "default_agent")]
    agent: String,
    /// Push channel id; switches `POST /query` into push mode.
    #[serde(default)]
    channel: Option<String>,
}

fn default_agent() -> String {
    "tabular".to_string()
}

/// Body of a successful `POST /query`.
#[derive(Debug, Serialize)]
struct QueryResponse {
    answer: String,
}

/// Error wrapper mapping the pipeline taxonomy onto HTTP statuses.
struct ApiError(AgentError);

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AgentError::UnsupportedVariant { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AgentError::DatasetUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AgentError::ExecutionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, axum::Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Builds the service router over a coordinator.
fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/query/stream", post(query_stream_handler))
        .route("/ws/{channel_id}", get(ws_handler))
        .with_state(state)
}

/// Serves the query API until ctrl-c.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(coordinator: Arc<Coordinator>, host: &str, port: u16) -> anyhow::Result<()> {
    let ct = CancellationToken::new();
    let push_send_timeout = coordinator.config().push_send_timeout;
    let state = Arc::new(AppState {
        coordinator,
        push_send_timeout,
        shutdown: ct.child_token(),
    });

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "query service listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            ct.cancel();
        })
        .await?;

    Ok(())
}

/// `POST /query`: blocking answer, or push mode with a channel id.
async fn query_handler(
    State(state): State<Arc<AppState>>,
    axum::Json(req): axum::Json<QueryRequest>,
) -> Result<axum::Json<QueryResponse>, ApiError> {
    let answer = match req.channel {
        Some(channel_id) => {
            state
                .coordinator
                .query_stream_push(&req.comparison_id, &req.question, &req.agent, &channel_id)
                .await?
        }
        None => {
            state
                .coordinator
                .query(&req.comparison_id, &req.question, &req.agent)
                .await?
        }
    };
    Ok(axum::Json(QueryResponse { answer }))
}

/// `POST /query/stream`: pull mode as NDJSON frames.
///
/// A deferred session failure is encoded as a terminal
/// `{"kind":"error","text":…}` frame rather than an HTTP error, since the
/// status line is long gone by the time it surfaces.
async fn query_stream_handler(
    State(state): State<Arc<AppState>>,
    axum::Json(req): axum::Json<QueryRequest>,
) -> Result<Response, ApiError> {
    let stream = state
        .coordinator
        .query_stream_pull(&req.comparison_id, &req.question, &req.agent)
        .await?;

    let lines = stream.map(|item| {
        let line = match item {
            Ok(event) => event.to_frame(),
            Err(e) => json!({ "kind": "error", "text": e.to_string() }).to_string(),
        };
        Ok::<_, std::convert::Infallible>(format!("{line}\n"))
    });

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}

/// `GET /ws/{channel_id}`: registers a push channel for the connection.
async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, channel_id, socket))
}

/// Forwards registry frames to the socket until either side goes away.
async fn handle_socket(state: Arc<AppState>, channel_id: String, mut socket: WebSocket) {
    let registry = Arc::clone(state.coordinator.registry());
    let (channel, mut rx) = QueueChannel::new(channel_id.clone(), state.push_send_timeout);
    registry.register(Arc::new(channel)).await;

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(frame) => {
                    if socket.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                // Sender gone means the registry entry was replaced.
                None => break,
            },
            incoming = socket.recv() => match incoming {
                // Delivery-only channel; inbound frames are ignored.
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            () = state.shutdown.cancelled() => break,
        }
    }

    registry.unregister(&channel_id).await;
    debug!(channel = %channel_id, "websocket closed");
}
