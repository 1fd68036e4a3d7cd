//! WebSocket upgrade and per-connection read/write loops.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::registry::{ClientConnection, ConnectionId};
use super::relay::RelayLoop;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::state::AppState;

/// `GET /ws`: upgrade and hand the socket to [`handle_socket`].
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Run one session to completion.
///
/// Registers the session, spawns the reader and writer, and runs the relay
/// loop on the current task. Returns once the peer is gone and the session
/// has been deregistered.
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let relay_settings = &state.settings.relay;
    let id = ConnectionId::new();
    let (out_tx, out_rx) = mpsc::channel(relay_settings.outbound_queue_capacity);
    let (in_tx, in_rx) = mpsc::channel(relay_settings.inbound_queue_capacity);

    let connection = Arc::new(ClientConnection::new(id, out_tx));
    let connected_at = connection.connected_at();
    let _ = state.registry.add(connection);
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    info!(conn_id = %id, "websocket client connected");

    let cancel = CancellationToken::new();
    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, out_rx, cancel.clone(), id));
    let reader = tokio::spawn(read_loop(stream, in_tx, cancel.clone(), id));

    RelayLoop::new(
        id,
        Arc::clone(&state.provider),
        Arc::clone(&state.registry),
        relay_settings.fragment_delay(),
        cancel.clone(),
    )
    .run(in_rx)
    .await;

    cancel.cancel();
    let _ = writer.await;
    let _ = reader.await;
    let _ = state.registry.remove(&id);

    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connected_at.elapsed().as_secs_f64());
    info!(conn_id = %id, "websocket client disconnected");
}

/// Drain the session's outbound channel into the socket.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
    id: ConnectionId,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = sink.close().await;
                break;
            }
            msg = rx.recv() => match msg {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        debug!(conn_id = %id, error = %e, "write failed");
                        cancel.cancel();
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

/// Push inbound text frames onto the relay's queue until the peer closes.
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    inbound: mpsc::Sender<String>,
    cancel: CancellationToken,
    id: ConnectionId,
) {
    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = stream.next() => frame,
        };
        match frame {
            Some(Ok(Message::Text(text))) => {
                trace!(conn_id = %id, chars = text.len(), "inbound message");
                // A full queue parks the reader, which backpressures the socket.
                let queued = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    r = inbound.send(text.to_string()) => r,
                };
                if queued.is_err() {
                    break;
                }
            }
            Some(Ok(Message::Binary(data))) => {
                debug!(conn_id = %id, bytes = data.len(), "ignoring binary frame");
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => {
                debug!(conn_id = %id, "peer closed");
                break;
            }
            Some(Err(e)) => {
                debug!(conn_id = %id, error = %e, "read failed");
                break;
            }
        }
    }
    cancel.cancel();
}
