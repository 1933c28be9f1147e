//! The `transport` module is the seam between a session and the network.
//!
//! A [`Transport`] opens one duplex message channel and reports what happens
//! on it (open, inbound message, error, close) through the [`EventSink`] it
//! was given at open time. The session owns the receiving end of that sink,
//! so dropping the receiver is all it takes to detach a transport.
//!
//! Two implementations ship with the crate: a plain WebSocket client and the
//! SockJS WebSocket sub-transport. [`DefaultTransportFactory`] picks between
//! them based on [`TransportMode`].

pub mod event;
pub mod sockjs;
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;
#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::utils::error::TransportError;

pub use event::{EventSink, TransportEvent};
pub use sockjs::SockJsTransport;
pub use websocket::WebSocketTransport;

/// Which kind of socket to open for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Native WebSocket, `ws://` or `wss://` URLs.
    #[default]
    Raw,
    /// SockJS endpoint, usually an `http://` or `https://` URL.
    SockJs,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Raw => f.write_str("raw"),
            TransportMode::SockJs => f.write_str("sockjs"),
        }
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" | "websocket" | "ws" => Ok(TransportMode::Raw),
            "sockjs" => Ok(TransportMode::SockJs),
            other => Err(format!("unknown transport {other:?}, expected raw or sockjs")),
        }
    }
}

/// A duplex message channel.
///
/// Implementations must not block: `open` only starts the attempt, and the
/// outcome is reported later as [`TransportEvent::Open`] or as an error/close.
pub trait Transport: Send {
    fn open(&mut self, url: &str, events: EventSink) -> Result<(), TransportError>;

    /// Queue one outbound text message. Fails with
    /// [`TransportError::NotOpen`] until the channel has reported open.
    fn send(&mut self, payload: &str) -> Result<(), TransportError>;

    /// Close the channel. Closing an already-closed channel is not an error.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Builds a fresh transport for every connect attempt.
pub trait TransportFactory: Send + Sync {
    fn create(&self, mode: TransportMode) -> Box<dyn Transport>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create(&self, mode: TransportMode) -> Box<dyn Transport> {
        match mode {
            TransportMode::Raw => Box::new(WebSocketTransport::new()),
            TransportMode::SockJs => Box::new(SockJsTransport::new()),
        }
    }
}
