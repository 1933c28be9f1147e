use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::accept_async;
use tungstenite::protocol::Message as WsMessage;

use super::sockjs::{self, SockJsFrame};
use super::websocket::parse_ws_url;
use super::{
    DefaultTransportFactory, EventSink, SockJsTransport, Transport, TransportEvent,
    TransportFactory, TransportMode, WebSocketTransport,
};
use crate::utils::error::TransportError;

// Loopback server: echoes text frames back. In SockJS mode it greets with
// `o` and answers each client array `["x"]` with `a["x"]`.
async fn start_echo_server(sockjs: bool) -> String {
    let addr = format!(
        "127.0.0.1:{}",
        portpicker::pick_unused_port().expect("No free ports")
    );
    let listener = TcpListener::bind(&addr).await.expect("Can't bind");

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                if sockjs && ws.send(WsMessage::text("o")).await.is_err() {
                    return;
                }
                while let Some(Ok(msg)) = ws.next().await {
                    if msg.is_close() {
                        break;
                    }
                    if msg.is_text() {
                        let text = msg.to_text().unwrap().to_string();
                        let reply = if sockjs { format!("a{text}") } else { text };
                        if ws.send(WsMessage::text(reply)).await.is_err() {
                            break;
                        }
                    }
                }
            });
        }
    });

    addr
}

async fn next_event(rx: &mut UnboundedReceiver<TransportEvent>) -> TransportEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a transport event")
        .expect("event channel closed")
}

#[test]
fn test_transport_mode_parse() {
    assert_eq!("raw".parse::<TransportMode>(), Ok(TransportMode::Raw));
    assert_eq!("WebSocket".parse::<TransportMode>(), Ok(TransportMode::Raw));
    assert_eq!(" SockJS ".parse::<TransportMode>(), Ok(TransportMode::SockJs));
    assert!("carrier-pigeon".parse::<TransportMode>().is_err());
    assert_eq!(TransportMode::SockJs.to_string(), "sockjs");
    assert_eq!(TransportMode::default(), TransportMode::Raw);
}

#[test]
fn test_event_sink_detaches_with_receiver() {
    let (sink, mut rx) = EventSink::channel();
    assert!(sink.opened());
    assert!(sink.message("hi"));
    assert_eq!(rx.try_recv().unwrap(), TransportEvent::Open);
    assert_eq!(rx.try_recv().unwrap(), TransportEvent::Message("hi".to_string()));

    drop(rx);
    assert!(sink.is_detached());
    assert!(!sink.closed(None, "gone"));
}

#[test]
fn test_parse_ws_url_requires_ws_scheme() {
    assert!(parse_ws_url("ws://localhost:8080/ws").is_ok());
    assert!(parse_ws_url("wss://example.com").is_ok());
    assert!(matches!(
        parse_ws_url("http://localhost:8080"),
        Err(TransportError::InvalidUrl { .. })
    ));
    assert!(matches!(
        parse_ws_url("not a url"),
        Err(TransportError::InvalidUrl { .. })
    ));
}

#[test]
fn test_sockjs_parse_frames() {
    assert_eq!(sockjs::parse_frame("o"), Ok(SockJsFrame::Open));
    assert_eq!(sockjs::parse_frame("h"), Ok(SockJsFrame::Heartbeat));
    assert_eq!(
        sockjs::parse_frame(r#"a["one","two"]"#),
        Ok(SockJsFrame::Messages(vec!["one".to_string(), "two".to_string()]))
    );
    assert_eq!(
        sockjs::parse_frame(r#"m"solo""#),
        Ok(SockJsFrame::Messages(vec!["solo".to_string()]))
    );
    assert_eq!(
        sockjs::parse_frame(r#"c[3000,"Go away!"]"#),
        Ok(SockJsFrame::Close {
            code: 3000,
            reason: "Go away!".to_string()
        })
    );
    assert!(sockjs::parse_frame("").is_err());
    assert!(sockjs::parse_frame("x").is_err());
    assert!(sockjs::parse_frame("a[1,2]").is_err());
}

#[test]
fn test_sockjs_wrap_outbound_escapes() {
    assert_eq!(sockjs::wrap_outbound("hello"), r#"["hello"]"#);
    assert_eq!(
        sockjs::wrap_outbound("SEND\ndestination:/a\n\n\"x\"\0"),
        r#"["SEND\ndestination:/a\n\n\"x\"\u0000"]"#
    );
}

#[test]
fn test_sockjs_websocket_url() {
    let url = sockjs::websocket_url("http://localhost:8080/stomp", 7, "abc").unwrap();
    assert_eq!(url.as_str(), "ws://localhost:8080/stomp/007/abc/websocket");

    let url = sockjs::websocket_url("https://example.com/ws/", 123, "s1").unwrap();
    assert_eq!(url.as_str(), "wss://example.com/ws/123/s1/websocket");

    assert!(sockjs::websocket_url("ftp://example.com", 1, "s").is_err());
}

#[test]
fn test_open_without_runtime_fails() {
    let (sink, _rx) = EventSink::channel();
    let mut transport = WebSocketTransport::new();
    assert!(matches!(
        transport.open("ws://127.0.0.1:1/ws", sink),
        Err(TransportError::NoRuntime)
    ));
}

#[test]
fn test_send_before_open_fails() {
    let mut transport = WebSocketTransport::new();
    assert!(matches!(transport.send("x"), Err(TransportError::NotOpen)));
    // closing something that never opened is fine
    assert!(transport.close().is_ok());
}

#[tokio::test]
async fn test_websocket_transport_echo() {
    let addr = start_echo_server(false).await;
    let (sink, mut rx) = EventSink::channel();
    let mut transport = WebSocketTransport::new();
    transport.open(&format!("ws://{addr}/ws"), sink).unwrap();

    // nothing has run yet, so the socket cannot be open
    assert!(matches!(transport.send("early"), Err(TransportError::NotOpen)));

    assert_eq!(next_event(&mut rx).await, TransportEvent::Open);

    transport.send("ping").unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        TransportEvent::Message("ping".to_string())
    );

    transport.close().unwrap();
    assert!(matches!(
        next_event(&mut rx).await,
        TransportEvent::Closed { .. }
    ));
}

#[tokio::test]
async fn test_websocket_transport_connection_refused() {
    let port = portpicker::pick_unused_port().expect("No free ports");
    let (sink, mut rx) = EventSink::channel();
    let mut transport = WebSocketTransport::new();
    transport.open(&format!("ws://127.0.0.1:{port}/ws"), sink).unwrap();

    assert!(matches!(next_event(&mut rx).await, TransportEvent::Error(_)));
    assert!(matches!(
        next_event(&mut rx).await,
        TransportEvent::Closed { .. }
    ));
}

#[tokio::test]
async fn test_wss_dial_reaches_tls_handshake() {
    // accepts TCP and hangs up, so the TLS handshake itself fails
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Can't bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });

    let (sink, mut rx) = EventSink::channel();
    let mut transport = WebSocketTransport::new();
    transport.open(&format!("wss://{addr}/ws"), sink).unwrap();

    match next_event(&mut rx).await {
        TransportEvent::Error(message) => {
            assert!(!message.contains("not compiled in"), "{message}");
        }
        other => panic!("expected a handshake error, got {other:?}"),
    }
    assert!(matches!(
        next_event(&mut rx).await,
        TransportEvent::Closed { .. }
    ));
}

#[tokio::test]
async fn test_sockjs_transport_echo() {
    let addr = start_echo_server(true).await;
    let (sink, mut rx) = EventSink::channel();
    let mut transport = SockJsTransport::new();
    transport.open(&format!("http://{addr}/stomp"), sink).unwrap();

    assert_eq!(next_event(&mut rx).await, TransportEvent::Open);

    transport.send("hello\nworld").unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        TransportEvent::Message("hello\nworld".to_string())
    );

    transport.close().unwrap();
}

#[tokio::test]
async fn test_default_factory_picks_transport() {
    let addr = start_echo_server(false).await;
    let factory = DefaultTransportFactory;

    let mut raw = factory.create(TransportMode::Raw);
    let (sink, mut rx) = EventSink::channel();
    raw.open(&format!("ws://{addr}"), sink).unwrap();
    assert_eq!(next_event(&mut rx).await, TransportEvent::Open);
    raw.close().unwrap();

    // the SockJS transport refuses URLs it cannot rewrite
    let mut sockjs = factory.create(TransportMode::SockJs);
    let (sink, _rx) = EventSink::channel();
    assert!(matches!(
        sockjs.open("ftp://example.com", sink),
        Err(TransportError::InvalidUrl { .. })
    ));
}
