//! HTTP and WebSocket surface.
//!
//! - `GET /messages?start=&end=&last=` - historical records as a JSON array
//! - `GET /stream` - live records, one JSON text message each
//! - `GET /health` - connector state and subscriber count

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use contracts::Record;
use dispatcher::LivePublisher;
use history::{HistoryError, LogReader, RangeQuery};
use ingestion::ConnectorState;

use crate::error::CliError;

#[derive(Clone)]
pub struct AppState {
    pub reader: LogReader,
    pub live: LivePublisher,
    pub connector: watch::Receiver<ConnectorState>,
    pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/messages", get(handle_messages))
        .route("/stream", get(handle_stream))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Bind the listener up front so address errors surface before startup
pub async fn bind(addr: &str) -> Result<TcpListener, CliError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::server_bind(addr, e.to_string()))
}

/// Serve until `shutdown` is cancelled
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "HTTP server listening");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

// --- REST: GET /messages ---

#[derive(Debug, Default, Deserialize)]
struct MessagesParams {
    start: Option<String>,
    end: Option<String>,
    last: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
        }),
    )
        .into_response()
}

async fn handle_messages(
    State(state): State<AppState>,
    Query(params): Query<MessagesParams>,
) -> impl IntoResponse {
    let range = match RangeQuery::from_params(
        params.start.as_deref(),
        params.end.as_deref(),
        params.last.as_deref(),
        Utc::now(),
    ) {
        Ok(range) => range,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let reader = state.reader.clone();
    let scan = tokio::task::spawn_blocking(move || -> Result<Vec<Record>, HistoryError> {
        Ok(reader.query(range)?.collect())
    })
    .await;

    match scan {
        Ok(Ok(records)) => Json(records).into_response(),
        Ok(Err(e)) if e.is_bad_request() => error_response(StatusCode::BAD_REQUEST, e),
        Ok(Err(e)) => {
            warn!(error = %e, "Historical query failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
        Err(e) => {
            warn!(error = %e, "Historical query task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "query task failed")
        }
    }
}

// --- WebSocket: GET /stream ---

async fn handle_stream(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_connection(socket, state))
}

async fn stream_connection(mut socket: WebSocket, state: AppState) {
    let mut subscription = state.live.subscribe();
    let subscriber_id = subscription.id();
    debug!(subscriber_id, "Stream client connected");

    loop {
        tokio::select! {
            biased;

            _ = state.shutdown.cancelled() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }

            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Inbound messages carry no meaning on this stream
                Some(Ok(_)) => continue,
            },

            record = subscription.recv() => {
                let Some(record) = record else {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                };

                let json = match serde_json::to_string(&record) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(subscriber_id, error = %e, "Failed to encode record");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!(
        subscriber_id,
        dropped = subscription.dropped(),
        "Stream client disconnected"
    );
}

// --- REST: GET /health ---

#[derive(Debug, Serialize, Deserialize)]
struct Health {
    status: String,
    connector: String,
    subscribers: usize,
}

async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let connector = *state.connector.borrow();
    let status = match connector {
        ConnectorState::Reading => "ok",
        ConnectorState::Stopped => "stopping",
        _ => "degraded",
    };

    Json(Health {
        status: status.to_string(),
        connector: connector.as_str().to_string(),
        subscribers: state.live.subscriber_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use futures_util::StreamExt;
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state(log: &Path) -> (AppState, watch::Sender<ConnectorState>) {
        let (state_tx, state_rx) = watch::channel(ConnectorState::Disconnected);
        let state = AppState {
            reader: LogReader::new(log),
            live: LivePublisher::new(16),
            connector: state_rx,
            shutdown: CancellationToken::new(),
        };
        (state, state_tx)
    }

    fn write_log(path: &Path) {
        let mut file = std::fs::File::create(path).unwrap();
        for ts in [100, 200, 300, 400] {
            writeln!(file, "{{\"timestamp\":{ts},\"value\":{}}}", ts / 100).unwrap();
        }
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_messages_inclusive_range() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("records.log");
        write_log(&log);
        let (state, _state_tx) = state(&log);

        let (status, body) = get(router(state), "/messages?start=200&end=300").await;
        assert_eq!(status, StatusCode::OK);

        let records: Vec<Record> = serde_json::from_slice(&body).unwrap();
        let timestamps: Vec<i64> = records.iter().map(|r| r.timestamp()).collect();
        assert_eq!(timestamps, vec![200, 300]);
    }

    #[tokio::test]
    async fn test_messages_missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _state_tx) = state(&dir.path().join("absent.log"));

        let (status, body) = get(router(state), "/messages?start=0&end=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"[]");
    }

    #[tokio::test]
    async fn test_messages_bad_bound_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _state_tx) = state(&dir.path().join("records.log"));

        let (status, _) = get(router(state.clone()), "/messages?start=yesterday").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(router(state), "/messages?start=0&last=5m").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_reports_connector_state() {
        let dir = tempfile::tempdir().unwrap();
        let (state, state_tx) = state(&dir.path().join("records.log"));

        let (_, body) = get(router(state.clone()), "/health").await;
        let health: Health = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "degraded");
        assert_eq!(health.connector, "disconnected");

        state_tx.send_replace(ConnectorState::Reading);
        let (_, body) = get(router(state), "/health").await;
        let health: Health = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.subscribers, 0);
    }

    #[tokio::test]
    async fn test_stream_pushes_live_records() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _state_tx) = state(&dir.path().join("records.log"));
        let live = state.live.clone();
        let shutdown = state.shutdown.clone();

        let listener = bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, state, shutdown.clone()));

        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/stream"))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while live.subscriber_count() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        live.publish(Record::new(42, 7).unwrap());

        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let record: Record = serde_json::from_str(msg.to_text().unwrap()).unwrap();
        assert_eq!(record, Record::new(42, 7).unwrap());

        shutdown.cancel();
        drop(client);
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_error() {
        let err = bind("not-an-address").await.unwrap_err();
        assert!(matches!(err, CliError::ServerBind { .. }));
    }
}
