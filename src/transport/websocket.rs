//! WebSocket transport
//!
//! A client-side socket driven by a background tokio task:
//! - the handshake runs on the task, so `open` returns immediately
//! - outbound messages go through an unbounded channel to the task, which
//!   owns the write half of the stream
//! - inbound messages, errors and the final close are reported through the
//!   session's [`EventSink`]
//!
//! The same driver serves the SockJS transport; [`Framing`] selects how
//! payloads are wrapped on the way out and unwrapped on the way in.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;
use url::Url;

use super::sockjs::{self, SockJsFrame};
use super::{EventSink, Transport};
use crate::utils::error::TransportError;

const CONNECTING: u8 = 0;
const OPEN: u8 = 1;
const CLOSING: u8 = 2;
const CLOSED: u8 = 3;

/// Normal closure, as sent when the client hangs up.
const CLOSE_NORMAL: u16 = 1000;
/// Abnormal closure, reported when the stream dies without a close frame.
const CLOSE_ABNORMAL: u16 = 1006;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    Plain,
    SockJs,
}

enum Outbound {
    Text(String),
    Close,
}

/// Handle to a running socket task.
#[derive(Debug)]
pub(crate) struct SocketHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
    state: Arc<AtomicU8>,
}

impl SocketHandle {
    pub(crate) fn send(&self, payload: &str) -> Result<(), TransportError> {
        if self.state.load(Ordering::SeqCst) != OPEN {
            return Err(TransportError::NotOpen);
        }
        self.outbound
            .send(Outbound::Text(payload.to_string()))
            .map_err(|_| TransportError::NotOpen)
    }

    pub(crate) fn close(&self) {
        if self.state.load(Ordering::SeqCst) < CLOSING {
            self.state.store(CLOSING, Ordering::SeqCst);
        }
        // the task may already be gone, which is as closed as it gets
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Plain WebSocket transport for `ws://` and `wss://` URLs.
#[derive(Debug, Default)]
pub struct WebSocketTransport {
    socket: Option<SocketHandle>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, url: &str, events: EventSink) -> Result<(), TransportError> {
        let url = parse_ws_url(url)?;
        self.socket = Some(spawn_socket(url, Framing::Plain, events)?);
        Ok(())
    }

    fn send(&mut self, payload: &str) -> Result<(), TransportError> {
        self.socket
            .as_ref()
            .ok_or(TransportError::NotOpen)?
            .send(payload)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some(socket) = self.socket.take() {
            socket.close();
        }
        Ok(())
    }
}

/// Accept only URLs a WebSocket client can dial.
pub fn parse_ws_url(raw: &str) -> Result<Url, TransportError> {
    let url = Url::parse(raw.trim()).map_err(|e| TransportError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(TransportError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other:?}, expected ws or wss"),
        }),
    }
}

/// Start the socket task on the current tokio runtime.
pub(crate) fn spawn_socket(
    url: Url,
    framing: Framing,
    events: EventSink,
) -> Result<SocketHandle, TransportError> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
    if url.scheme() == "wss" {
        install_crypto_provider();
    }
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(AtomicU8::new(CONNECTING));

    runtime.spawn(run_socket(url, framing, events, rx, state.clone()));

    Ok(SocketHandle {
        outbound: tx,
        state,
    })
}

/// rustls needs a process-wide crypto provider before the first TLS dial.
fn install_crypto_provider() {
    // only the first install in a process succeeds, later ones are no-ops
    let _ = rustls::crypto::ring::default_provider().install_default();
}

async fn run_socket(
    url: Url,
    framing: Framing,
    events: EventSink,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    state: Arc<AtomicU8>,
) {
    debug!(%url, ?framing, "connecting");

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws, response)) => {
            debug!(%url, status = %response.status(), "handshake complete");
            ws
        }
        Err(e) => {
            state.store(CLOSED, Ordering::SeqCst);
            warn!(%url, "connect failed: {e}");
            events.error(format!("connect to {url} failed: {e}"));
            events.closed(Some(CLOSE_ABNORMAL), e.to_string());
            return;
        }
    };

    if framing == Framing::Plain {
        // a close requested during the handshake wins over the open
        if state
            .compare_exchange(CONNECTING, OPEN, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            events.opened();
        }
    }

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            outgoing = outbound.recv() => match outgoing {
                Some(Outbound::Text(text)) => {
                    let text = match framing {
                        Framing::Plain => text,
                        Framing::SockJs => sockjs::wrap_outbound(&text),
                    };
                    if let Err(e) = ws_sender.send(WsMessage::text(text)).await {
                        warn!(%url, "send failed: {e}");
                        events.error(format!("send failed: {e}"));
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = ws_sender.send(WsMessage::Close(None)).await {
                        debug!(%url, "close frame not delivered: {e}");
                    }
                    state.store(CLOSED, Ordering::SeqCst);
                    events.closed(Some(CLOSE_NORMAL), "closed by client");
                    break;
                }
            },

            incoming = ws_receiver.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    if !deliver(framing, text.as_str(), &events, &state) {
                        break;
                    }
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    let text = String::from_utf8_lossy(&data);
                    if !deliver(framing, &text, &events, &state) {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                        .unwrap_or((None, String::new()));
                    state.store(CLOSED, Ordering::SeqCst);
                    events.closed(code, reason);
                    break;
                }
                // ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    state.store(CLOSED, Ordering::SeqCst);
                    events.error(format!("read failed: {e}"));
                    events.closed(Some(CLOSE_ABNORMAL), e.to_string());
                    break;
                }
                None => {
                    state.store(CLOSED, Ordering::SeqCst);
                    events.closed(Some(CLOSE_ABNORMAL), "stream ended");
                    break;
                }
            },
        }
    }

    info!(%url, "socket task finished");
}

/// Forward one inbound payload. Returns `false` when the socket is done.
fn deliver(framing: Framing, text: &str, events: &EventSink, state: &AtomicU8) -> bool {
    if framing == Framing::Plain {
        events.message(text);
        return true;
    }

    match sockjs::parse_frame(text) {
        Ok(SockJsFrame::Open) => {
            if state
                .compare_exchange(CONNECTING, OPEN, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                events.opened();
            }
            true
        }
        Ok(SockJsFrame::Heartbeat) => true,
        Ok(SockJsFrame::Messages(messages)) => {
            for message in messages {
                events.message(message);
            }
            true
        }
        Ok(SockJsFrame::Close { code, reason }) => {
            state.store(CLOSED, Ordering::SeqCst);
            events.closed(Some(code), reason);
            false
        }
        Err(e) => {
            events.error(format!("malformed SockJS frame: {e}"));
            true
        }
    }
}
