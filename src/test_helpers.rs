//! Throwaway WebSocket servers for socket and viewer tests.

use std::time::Duration;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::socket::ReadyState;

/// Text that makes the test servers close the connection when a message
/// contains it.
pub const CLOSE_COMMAND: &str = "bye";

pub struct TestServer {
    pub base_url: String,
    task: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serve an echo WebSocket on each of `paths`; other paths answer 404.
pub async fn spawn_echo_server(paths: &[&str]) -> TestServer {
    let mut router = Router::new();
    for path in paths {
        router = router.route(path, get(echo_upgrade));
    }
    serve(router).await
}

/// Serve `/chat` only: every connection first receives `frame`, then behaves
/// like the echo server.
pub async fn spawn_chat_server(frame: &str) -> TestServer {
    let frame = frame.to_owned();
    let router = Router::new().route(
        "/chat",
        get(move |ws: WebSocketUpgrade| {
            let frame = frame.clone();
            async move { ws.on_upgrade(move |socket| push_then_echo(socket, frame)) }
        }),
    );
    serve(router).await
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server failed");
    });
    TestServer { base_url: format!("ws://{addr}"), task }
}

/// A URL on a port nothing listens on.
pub async fn unused_url(path: &str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("probe listener addr");
    drop(listener);
    format!("ws://{addr}{path}")
}

async fn echo_upgrade(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(echo_socket)
}

async fn push_then_echo(mut socket: WebSocket, frame: String) {
    if socket.send(Message::Text(frame.into())).await.is_err() {
        return;
    }
    echo_socket(socket).await;
}

async fn echo_socket(mut socket: WebSocket) {
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) if text.as_str().contains(CLOSE_COMMAND) => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            Message::Text(text) => {
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

/// Wait until the watched ready state equals `want`, failing after 5s.
pub async fn wait_for_state(rx: &mut watch::Receiver<ReadyState>, want: ReadyState) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|state| *state == want))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {want}"))
        .expect("socket state channel closed");
}
