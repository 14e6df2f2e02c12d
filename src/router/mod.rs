pub mod public;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::websocket::{self, WebSocketState};
use public::PublicState;

/// Ping route, the viewer socket at `/ws`, and the web UI for everything else
pub fn app(public: PublicState, ws_state: WebSocketState, web_dir: &str) -> Router {
    let ws_routes = Router::new()
        .route("/ws", get(websocket::ws_handler))
        .with_state(ws_state);

    public::public_router(public)
        .merge(ws_routes)
        .fallback_service(ServeDir::new(web_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitReply;
    use crate::engine::fake::{container, FakeEngine};
    use crate::state::StateStore;
    use crate::websocket::{CommandDispatcher, DiffMessage, ViewerRegistry};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use futures::{SinkExt, StreamExt};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tower::ServiceExt;

    type Client =
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    async fn test_app(web_dir: &str) -> (Router, Arc<ViewerRegistry>) {
        test_app_with_depth(web_dir, 8).await
    }

    async fn test_app_with_depth(web_dir: &str, queue_depth: usize) -> (Router, Arc<ViewerRegistry>) {
        let store = Arc::new(StateStore::new());
        store.upsert_container(container("c1", "running")).await;
        let viewers = Arc::new(ViewerRegistry::new());
        let dispatcher = CommandDispatcher::new(
            Arc::new(FakeEngine::new()),
            store.clone(),
            viewers.clone(),
            15,
            InitReply::All,
        );

        let router = app(
            PublicState {
                store,
                viewers: viewers.clone(),
                started_at: chrono::Utc::now(),
            },
            WebSocketState {
                viewers: viewers.clone(),
                dispatcher,
                queue_depth,
            },
            web_dir,
        );
        (router, viewers)
    }

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    async fn connect(addr: SocketAddr) -> Client {
        let (socket, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
        socket
    }

    /// Registration and teardown happen on the server's own tasks
    async fn wait_for_viewers(viewers: &ViewerRegistry, expected: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while viewers.len().await != expected && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(viewers.len().await, expected);
    }

    async fn next_diff(socket: &mut Client) -> DiffMessage {
        let read = async {
            loop {
                match socket.next().await {
                    Some(Ok(WsMessage::Text(text))) => return serde_json::from_str(&text).unwrap(),
                    Some(Ok(_)) => continue,
                    other => panic!("socket ended early: {:?}", other),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), read).await.unwrap()
    }

    #[tokio::test]
    async fn test_ping_reports_counts() {
        let (app, _) = test_app("web/").await;
        let response = app
            .oneshot(Request::get("/api/v1/public/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["containers"], 1);
        assert_eq!(json["images"], 0);
        assert_eq!(json["viewers"], 0);
    }

    #[tokio::test]
    async fn test_plain_request_to_ws_is_rejected() {
        let (app, _) = test_app("web/").await;
        let response = app
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Not a websocket handshake");
    }

    #[tokio::test]
    async fn test_serves_web_directory() {
        let dir = std::env::temp_dir().join(format!("dockview-web-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>dockview</html>").unwrap();

        let (app, _) = test_app(dir.to_str().unwrap()).await;
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<html>dockview</html>");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_viewer_session_over_socket() {
        let (app, viewers) = test_app("web/").await;
        let addr = serve(app).await;

        let mut socket = connect(addr).await;
        wait_for_viewers(&viewers, 1).await;

        // Garbage and binary frames are skipped, the session stays up
        socket.send(WsMessage::Text("{not json".into())).await.unwrap();
        socket.send(WsMessage::Binary(vec![1, 2, 3])).await.unwrap();
        socket
            .send(WsMessage::Text(r#"{"command":"init"}"#.into()))
            .await
            .unwrap();

        match next_diff(&mut socket).await {
            DiffMessage::Full { containers, .. } => {
                assert_eq!(containers, vec![container("c1", "running")]);
            }
            other => panic!("expected full snapshot, got {:?}", other),
        }
        assert_eq!(viewers.len().await, 1);

        socket.close(None).await.unwrap();
        wait_for_viewers(&viewers, 0).await;
    }

    #[tokio::test]
    async fn test_dropped_connection_leaves_other_viewers_served() {
        let (app, viewers) = test_app("web/").await;
        let addr = serve(app).await;

        let gone = connect(addr).await;
        let mut staying = connect(addr).await;
        wait_for_viewers(&viewers, 2).await;

        // No close frame, the TCP stream just goes away
        drop(gone);
        wait_for_viewers(&viewers, 1).await;

        assert_eq!(viewers.broadcast(&DiffMessage::destroyed("c1")).await, 1);
        assert_eq!(next_diff(&mut staying).await, DiffMessage::destroyed("c1"));
    }

    #[tokio::test]
    async fn test_stalled_viewer_is_disconnected() {
        let (app, viewers) = test_app_with_depth("web/", 2).await;
        let addr = serve(app).await;

        // Never reads until it has been dropped
        let mut stalled = connect(addr).await;
        wait_for_viewers(&viewers, 1).await;

        let payload = "x".repeat(1 << 20);
        let mut pruned = false;
        for _ in 0..256 {
            if viewers.broadcast_all(&payload).await == 0 {
                pruned = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(pruned);

        // The server flushes what was queued, then closes the socket
        let drained = async {
            while let Some(Ok(frame)) = stalled.next().await {
                if let WsMessage::Close(_) = frame {
                    break;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(10), drained).await.unwrap();
        wait_for_viewers(&viewers, 0).await;
    }
}
