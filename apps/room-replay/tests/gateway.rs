use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use room_replay::identity::DeviceProfile;
use room_replay::room::{RoomClient, RoomError, RoomRequest};
use room_replay::transport::{Connection, TransportError, WebSocketConnection, WsTarget};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

#[derive(Clone)]
struct Seen(mpsc::UnboundedSender<String>);

async fn echo_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(seen): State<Seen>,
) -> Response {
    let token = headers
        .get("x-auth-token")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let _ = seen.0.send(token);
    ws.on_upgrade(echo_binary)
}

async fn echo_binary(mut socket: WebSocket) {
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Binary(data) => {
                if socket.send(Message::Binary(data)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

#[test_timeout::tokio_timeout_test(20)]
async fn websocket_sends_binary_and_listens_with_deadline() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let router = Router::new()
        .route("/ws", get(echo_handler))
        .with_state(Seen(seen_tx));
    let addr = serve(router).await;

    let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    let target = WsTarget::new(url).with_headers(DeviceProfile::default().ws_headers("tok%3D"));
    let connection = WebSocketConnection::connect(&target).await.expect("connect");
    assert_eq!(seen_rx.recv().await.as_deref(), Some("tok%3D"));

    connection.send(b"\x0a\x03abc").await.expect("send");
    let reply = connection
        .recv_timeout(Duration::from_secs(5))
        .await
        .expect("listen");
    assert_eq!(reply.as_deref(), Some(&b"\x0a\x03abc"[..]));

    let silent = connection
        .recv_timeout(Duration::from_millis(100))
        .await
        .expect("listen");
    assert!(silent.is_none());

    connection.close().await.expect("close");
}

async fn ping_reply_then_close(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        let _ = socket.send(Message::Ping(b"keepalive".to_vec())).await;
        let _ = socket.send(Message::Binary(b"after-ping".to_vec())).await;
        let _ = socket.send(Message::Close(None)).await;
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

async fn text_reply(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        let _ = socket.send(Message::Text("joined".to_string())).await;
        while let Some(Ok(msg)) = socket.recv().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    })
}

fn local_target(addr: SocketAddr, path: &str) -> WsTarget {
    WsTarget::new(Url::parse(&format!("ws://{addr}{path}")).unwrap())
}

#[test_timeout::tokio_timeout_test(20)]
async fn listen_skips_control_frames_and_reports_peer_close() {
    let router = Router::new().route("/ws", get(ping_reply_then_close));
    let addr = serve(router).await;
    let connection = WebSocketConnection::connect(&local_target(addr, "/ws"))
        .await
        .expect("connect");

    let first = connection
        .recv_timeout(Duration::from_secs(5))
        .await
        .expect("listen");
    assert_eq!(first.as_deref(), Some(&b"after-ping"[..]));

    let second = connection.recv_timeout(Duration::from_secs(5)).await;
    assert!(matches!(second, Err(TransportError::Closed)), "got {second:?}");

    assert!(connection.send(b"\x0a\x01x").await.is_err());
    let _ = connection.close().await;
}

#[test_timeout::tokio_timeout_test(20)]
async fn listen_returns_text_replies_as_bytes() {
    let router = Router::new().route("/ws", get(text_reply));
    let addr = serve(router).await;
    let connection = WebSocketConnection::connect(&local_target(addr, "/ws"))
        .await
        .expect("connect");

    let reply = connection
        .recv_timeout(Duration::from_secs(5))
        .await
        .expect("listen");
    assert_eq!(reply.as_deref(), Some(&b"joined"[..]));

    connection.close().await.expect("close");
}

#[test_timeout::tokio_timeout_test(20)]
async fn websocket_connect_failure_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    let result = WebSocketConnection::connect(&WsTarget::new(url)).await;
    assert!(result.is_err());
}

async fn accept_room(headers: HeaderMap, body: String) -> (StatusCode, String) {
    let token = headers
        .get("x-authtoken")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if token != "tok" || !body.starts_with("sign=sig&data={") {
        return (StatusCode::OK, r#"{"result":0,"msg":"bad request"}"#.into());
    }
    (StatusCode::OK, r#"{"result":1,"msg":"ok"}"#.into())
}

async fn refuse_room() -> (StatusCode, String) {
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance".into())
}

fn room_request(addr: SocketAddr, path: &str) -> RoomRequest {
    RoomRequest {
        url: Url::parse(&format!("http://{addr}{path}")).unwrap(),
        uid: 42,
        signature: "sig".into(),
    }
}

#[test_timeout::tokio_timeout_test(20)]
async fn room_entry_checks_status_and_marker() {
    let router = Router::new()
        .route("/api/1802/1012", post(accept_room))
        .route("/down", post(refuse_room));
    let addr = serve(router).await;

    let client = RoomClient::new(&DeviceProfile::default(), "tok").expect("client");
    client
        .enter(&room_request(addr, "/api/1802/1012"))
        .await
        .expect("room accepts");

    let wrong_token = RoomClient::new(&DeviceProfile::default(), "other").expect("client");
    match wrong_token.enter(&room_request(addr, "/api/1802/1012")).await {
        Err(RoomError::Rejected { status, body }) => {
            assert_eq!(status.as_u16(), 200);
            assert!(body.contains("\"result\":0"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    match client.enter(&room_request(addr, "/down")).await {
        Err(RoomError::Rejected { status, body }) => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}
