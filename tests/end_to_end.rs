use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tungstenite::protocol::Message as WsMessage;

use sockprobe::event_log::{EventLog, LogLevel};
use sockprobe::session::{ConnectConfig, SendOptions, Session, SessionState};
use sockprobe::stomp::{self, StompCommand, StompFrame};

// Tiny STOMP broker: answers CONNECT, remembers subscriptions and fans SEND
// frames out to the matching subscription of the same connection.
async fn start_broker() -> String {
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
                let mut subscriptions: HashMap<String, String> = HashMap::new();

                while let Some(Ok(msg)) = ws.next().await {
                    let Ok(text) = msg.to_text() else { break };
                    let Ok(frame) = stomp::decode(text) else {
                        continue;
                    };
                    let reply = match frame.command {
                        StompCommand::Connect => Some(
                            StompFrame::new(StompCommand::Connected)
                                .with_header("version", "1.2")
                                .with_header("server", "loopback"),
                        ),
                        StompCommand::Subscribe => {
                            let destination = frame.get("destination").unwrap_or_default();
                            let id = frame.get("id").unwrap_or_default();
                            subscriptions.insert(destination.to_string(), id.to_string());
                            None
                        }
                        StompCommand::Send => {
                            let destination = frame.get("destination").unwrap_or_default();
                            subscriptions.get(destination).map(|id| {
                                StompFrame::new(StompCommand::Message)
                                    .with_header("subscription", id.as_str())
                                    .with_header("destination", destination)
                                    .with_header("message-id", "1")
                                    .with_body(frame.body.clone())
                            })
                        }
                        StompCommand::Disconnect => break,
                        _ => None,
                    };
                    if let Some(reply) = reply {
                        let wire = stomp::encode(&reply).unwrap();
                        if ws.send(WsMessage::text(wire)).await.is_err() {
                            break;
                        }
                    }
                }
            });
        }
    });

    addr
}

async fn wait_for(session: &mut Session, done: impl Fn(&Session) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(session) {
            assert!(session.process_next().await, "transport went away");
        }
    })
    .await
    .expect("timed out waiting for the session");
}

#[tokio::test]
async fn test_stomp_round_trip_over_websocket() {
    let addr = start_broker().await;
    let log = EventLog::new();
    let mut session = Session::with_default_transports(log.clone());

    session
        .connect(ConnectConfig::new(format!("ws://{addr}/ws")).with_stomp(true))
        .unwrap();
    wait_for(&mut session, |s| s.state() == SessionState::Connected).await;

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    session
        .subscribe("/topic/greetings", move |frame| {
            sink.lock().unwrap().push(frame.body.clone());
        })
        .unwrap();

    session
        .send("hello", &SendOptions::to("/topic/greetings"))
        .unwrap();
    let seen = received.clone();
    wait_for(&mut session, move |_| !seen.lock().unwrap().is_empty()).await;
    assert_eq!(*received.lock().unwrap(), vec!["hello".to_string()]);

    session.disconnect().unwrap();
    assert_eq!(session.state(), SessionState::Idle);

    let events = log.snapshot();
    assert!(events.iter().all(|e| e.level == LogLevel::Info));
    assert!(events[0].text.contains("version = 1.2"));
    assert!(events.iter().any(|e| e.text.contains("Close Connection Success")));
}

#[tokio::test]
async fn test_raw_connect_refused_is_logged() {
    let port = portpicker::pick_unused_port().expect("No free ports");
    let log = EventLog::new();
    let mut session = Session::with_default_transports(log.clone());

    session
        .connect(ConnectConfig::new(format!("ws://127.0.0.1:{port}/ws")))
        .unwrap();
    wait_for(&mut session, |s| s.state() == SessionState::Idle).await;

    assert_eq!(log.len(), 1);
    assert!(log.snapshot()[0].is_error());
}
