//! WebSocket upgrade handler and per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time;

use crate::auth::middleware::OptionalUser;
use crate::models::user::UserRecord;
use crate::AppState;

use super::binder;
use super::connection::{Connection, Frame};

/// Close codes.
const CLOSE_GOING_AWAY: u16 = 1001;
const CLOSE_IDLE_TIMEOUT: u16 = 4009;

type WsSink = SplitSink<WebSocket, Message>;

/// Why a connection's event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    ClientClosed,
    ReadError,
    WriteError,
    ServerClosed,
    IdleTimeout,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    OptionalUser(user): OptionalUser,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, user))
}

async fn handle_connection(socket: WebSocket, state: AppState, user: Option<UserRecord>) {
    let Some(registry) = state.publisher.registry().cloned() else {
        tracing::debug!("no connection registry; dropping upgraded socket");
        return;
    };

    let (connection, outbound) = Connection::new(state.config.ws_outbound_buffer);
    binder::bind(&registry, &connection, user.as_ref());

    tracing::info!(
        connection_id = %connection.id(),
        user_id = connection.user_id().unwrap_or("-"),
        open = registry.len(),
        "realtime connection opened"
    );

    let exit = run_connection(
        connection.clone(),
        socket,
        outbound,
        state.config.ws_ping_interval,
    )
    .await;

    connection.mark_closed();
    registry.detach(connection.id());

    tracing::info!(
        connection_id = %connection.id(),
        user_id = connection.user_id().unwrap_or("-"),
        ?exit,
        "realtime connection closed"
    );
}

/// Pump queued frames to the socket until either side goes away.
///
/// Inbound text is ignored: clients only listen. Any inbound frame counts as
/// liveness for the keepalive check.
async fn run_connection(
    connection: Arc<Connection>,
    socket: WebSocket,
    mut outbound: mpsc::Receiver<Frame>,
    ping_interval: Duration,
) -> Exit {
    let (mut ws_tx, mut ws_rx): (WsSink, SplitStream<WebSocket>) = socket.split();

    let mut keepalive = time::interval(ping_interval);
    keepalive.tick().await; // First tick fires immediately; skip it.
    let mut heard_from_client = true;

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => return Exit::ClientClosed,
                    Some(Ok(_)) => heard_from_client = true,
                    Some(Err(e)) => {
                        tracing::debug!(?e, connection_id = %connection.id(), "ws read error");
                        return Exit::ReadError;
                    }
                }
            }

            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    return Exit::ServerClosed;
                };
                if let Err(e) = ws_tx.send(Message::Text(frame)).await {
                    tracing::debug!(?e, connection_id = %connection.id(), "ws write error");
                    return Exit::WriteError;
                }
            }

            _ = connection.closing() => {
                let _ = send_close(&mut ws_tx, CLOSE_GOING_AWAY, "Server closing connection").await;
                return Exit::ServerClosed;
            }

            _ = keepalive.tick() => {
                if !heard_from_client {
                    tracing::debug!(connection_id = %connection.id(), "keepalive timeout");
                    let _ = send_close(&mut ws_tx, CLOSE_IDLE_TIMEOUT, "Keepalive timeout").await;
                    return Exit::IdleTimeout;
                }
                heard_from_client = false;
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    return Exit::WriteError;
                }
            }
        }
    }
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(ws_tx: &mut WsSink, code: u16, reason: &str) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
