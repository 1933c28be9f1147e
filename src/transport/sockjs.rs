//! SockJS transport
//!
//! Speaks the WebSocket flavour of the SockJS protocol, which is what a
//! SockJS client ends up using whenever the server and network allow it:
//! - the endpoint URL gets `/<server>/<session>/websocket` appended and its
//!   scheme switched from http(s) to ws(s)
//! - the server opens with `o`, keeps the line warm with `h`, delivers
//!   messages as `a["..",".."]` (or `m".."`) and hangs up with
//!   `c[code,"reason"]`
//! - the client sends JSON arrays of strings
//!
//! The XHR streaming and polling fallbacks are not implemented.

use serde_json::Value;
use url::Url;
use uuid::Uuid;

use super::websocket::{Framing, SocketHandle, spawn_socket};
use super::{EventSink, Transport};
use crate::utils::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SockJsFrame {
    Open,
    Heartbeat,
    Messages(Vec<String>),
    Close { code: u16, reason: String },
}

/// Parse one server frame.
pub fn parse_frame(text: &str) -> Result<SockJsFrame, String> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or_else(|| "empty frame".to_string())?;
    let payload = chars.as_str();

    match kind {
        'o' => Ok(SockJsFrame::Open),
        'h' => Ok(SockJsFrame::Heartbeat),
        'a' => {
            let messages: Vec<String> =
                serde_json::from_str(payload).map_err(|e| format!("bad message array: {e}"))?;
            Ok(SockJsFrame::Messages(messages))
        }
        'm' => {
            let message: String =
                serde_json::from_str(payload).map_err(|e| format!("bad message: {e}"))?;
            Ok(SockJsFrame::Messages(vec![message]))
        }
        'c' => {
            let (code, reason): (u16, String) =
                serde_json::from_str(payload).map_err(|e| format!("bad close frame: {e}"))?;
            Ok(SockJsFrame::Close { code, reason })
        }
        other => Err(format!("unknown frame type {other:?}")),
    }
}

/// Wrap an outbound payload the way SockJS servers expect it.
pub fn wrap_outbound(payload: &str) -> String {
    Value::Array(vec![Value::String(payload.to_string())]).to_string()
}

/// Turn a SockJS endpoint URL into the URL of its WebSocket sub-transport.
pub fn websocket_url(endpoint: &str, server: u16, session: &str) -> Result<Url, TransportError> {
    let invalid = |reason: String| TransportError::InvalidUrl {
        url: endpoint.to_string(),
        reason,
    };

    let mut url = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(invalid(format!(
                "unsupported scheme {other:?}, expected http, https, ws or wss"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid(format!("cannot switch scheme to {scheme}")))?;

    let base = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base}/{:03}/{session}/websocket", server % 1000));
    Ok(url)
}

/// SockJS transport. `open` expects the endpoint URL as a SockJS client
/// would be given it, e.g. `http://localhost:8080/stomp`.
#[derive(Debug, Default)]
pub struct SockJsTransport {
    socket: Option<SocketHandle>,
}

impl SockJsTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for SockJsTransport {
    fn open(&mut self, url: &str, events: EventSink) -> Result<(), TransportError> {
        let server = (Uuid::new_v4().as_u128() % 1000) as u16;
        let session = Uuid::new_v4().simple().to_string();
        let url = websocket_url(url, server, &session)?;
        self.socket = Some(spawn_socket(url, Framing::SockJs, events)?);
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
