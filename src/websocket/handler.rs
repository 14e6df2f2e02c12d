//! WebSocket handler for viewer connections
//!
//! Each connection gets a writer task draining its outbound queue and a
//! reader task feeding the command dispatcher. Whichever ends first tears
//! the session down.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use super::dispatcher::CommandDispatcher;
use super::registry::ViewerRegistry;

/// WebSocket handler state
#[derive(Clone)]
pub struct WebSocketState {
    pub viewers: Arc<ViewerRegistry>,
    pub dispatcher: CommandDispatcher,
    pub queue_depth: usize,
}

/// Handle WebSocket upgrade request
pub async fn ws_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<WebSocketState>,
) -> Response {
    match upgrade {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state)),
        Err(e) => {
            tracing::warn!("Rejected viewer connection: {}", e);
            (StatusCode::BAD_REQUEST, "Not a websocket handshake").into_response()
        }
    }
}

/// Handle the actual WebSocket connection
async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (sender, mut receiver) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(state.queue_depth);

    let session = state.viewers.register(outbound_tx).await;

    // Drain the outbound queue into the socket until a write fails or the
    // registry drops this session
    let mut send_task = tokio::spawn(async move {
        let mut sender = sender;
        let frames = ReceiverStream::new(outbound_rx)
            .map(|text| Ok::<_, axum::Error>(Message::Text(text)));
        if let Err(e) = frames.forward(&mut sender).await {
            debug!("Write to viewer {} failed: {}", session, e);
        }
        let _ = sender.close().await;
    });

    let dispatcher = state.dispatcher.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    debug!("Received from {}: {}", session, text);
                    dispatcher.handle_text(session, &text).await;
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Viewer {} closed the connection", session);
                    break;
                }
                Ok(_) => {
                    // Ping/pong are answered by axum, binary frames carry nothing for us
                }
                Err(e) => {
                    debug!("Read from viewer {} failed: {}", session, e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => {
            send_task.abort();
        }
        _ = &mut send_task => {
            recv_task.abort();
        }
    }

    state.viewers.unregister(session).await;
    tracing::info!("Viewer {} disconnected", session);
}
