//! Session engine
//!
//! The state machine for one logical connection:
//!
//! ```text
//! Idle --connect--> Connecting(OpeningTransport) --open--> Connected                 (plain)
//!                                     |         \--open--> Connecting(AwaitingConnected)
//!                                     |                        --CONNECTED--> Connected  (STOMP)
//!                                     \--error / close--> Idle
//! Connected --disconnect / peer close--> Disconnected --> Idle
//! ```
//!
//! Usage notes:
//! - The API is synchronous and not reentrant; drive a session from one task.
//! - Transport notifications queue up on a channel and only take effect when
//!   the host calls `poll_events`, `process_next` or `handle_event`.
//! - Problems the caller can act on right away are returned as
//!   `SessionError`; problems that surface later on the wire become Error
//!   events in the log. Nothing is retried automatically.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use url::Url;
use uuid::Uuid;

use super::options::{ConnectConfig, SendOptions};
use super::subscription::{Subscription, Subscriptions};
use crate::event_log::{EventLog, LogEvent};
use crate::stomp::headers::parse_header_document;
use crate::stomp::{self, Headers, StompCommand, StompFrame};
use crate::transport::{
    DefaultTransportFactory, EventSink, Transport, TransportEvent, TransportFactory,
    TransportMode,
};
use crate::utils::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPhase {
    /// Waiting for the transport to report open.
    OpeningTransport,
    /// STOMP only: the transport is open and CONNECT went out.
    AwaitingConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting(ConnectPhase),
    Connected,
    /// Transient: the transport is being released on the way back to `Idle`.
    Disconnected,
}

impl SessionState {
    pub fn is_connecting(&self) -> bool {
        matches!(self, SessionState::Connecting(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Connecting(ConnectPhase::OpeningTransport) => f.write_str("connecting"),
            SessionState::Connecting(ConnectPhase::AwaitingConnected) => {
                f.write_str("connecting (awaiting CONNECTED)")
            }
            SessionState::Connected => f.write_str("connected"),
            SessionState::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Everything that exists only while a transport is held.
struct Connection {
    url: String,
    mode: TransportMode,
    stomp: bool,
    connect_headers: Headers,
    /// Encoded CONNECT frame, sent once the transport opens.
    handshake: Option<String>,
    transport: Box<dyn Transport>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    subscriptions: Subscriptions,
}

pub struct Session {
    id: Uuid,
    factory: Arc<dyn TransportFactory>,
    log: EventLog,
    state: SessionState,
    connection: Option<Connection>,
    next_subscription: u64,
}

impl Session {
    pub fn new(factory: Arc<dyn TransportFactory>, log: EventLog) -> Self {
        Self {
            id: Uuid::new_v4(),
            factory,
            log,
            state: SessionState::Idle,
            connection: None,
            next_subscription: 0,
        }
    }

    /// A session using the bundled WebSocket and SockJS transports.
    pub fn with_default_transports(log: EventLog) -> Self {
        Self::new(Arc::new(DefaultTransportFactory), log)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn has_transport(&self) -> bool {
        self.connection.is_some()
    }

    pub fn url(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.url.as_str())
    }

    pub fn mode(&self) -> Option<TransportMode> {
        self.connection.as_ref().map(|c| c.mode)
    }

    pub fn is_stomp(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.stomp)
    }

    pub fn connect_headers(&self) -> Option<&Headers> {
        self.connection.as_ref().map(|c| &c.connect_headers)
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.connection
            .iter()
            .flat_map(|c| c.subscriptions.iter())
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn get_log(&self) -> Vec<LogEvent> {
        self.log.snapshot()
    }

    pub fn clear_log(&self) {
        self.log.clear();
    }

    /// Start connecting. Only valid from `Idle`.
    ///
    /// In STOMP mode the connect header document is parsed and the CONNECT
    /// frame encoded before any transport is created, so malformed headers
    /// fail without side effects.
    pub fn connect(&mut self, config: ConnectConfig) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::State(format!(
                "cannot connect while {}",
                self.state
            )));
        }

        let url = config.url.trim().to_string();
        if url.is_empty() {
            return Err(SessionError::Validation("url can not be empty".to_string()));
        }

        let (connect_headers, handshake) = if config.stomp {
            let headers = parse_header_document(&config.connect_headers)?;
            let host = Url::parse(&url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string));
            let frame = StompFrame::connect(host.as_deref(), headers.clone());
            (headers, Some(stomp::encode(&frame)?))
        } else {
            (Headers::new(), None)
        };

        // the previous transport, if any, must be gone before a new one opens
        self.release();

        let mut transport = self.factory.create(config.mode);
        let (sink, events) = EventSink::channel();
        if let Err(e) = transport.open(&url, sink) {
            self.log
                .error(format!("Connect error, url = {url}, message = {e}"));
            return Err(SessionError::Connection(e));
        }

        debug!(session = %self.id, %url, mode = %config.mode, stomp = config.stomp, "connecting");

        self.connection = Some(Connection {
            url,
            mode: config.mode,
            stomp: config.stomp,
            connect_headers,
            handshake,
            transport,
            events,
            subscriptions: Subscriptions::default(),
        });
        self.state = SessionState::Connecting(ConnectPhase::OpeningTransport);
        Ok(())
    }

    /// Hang up. Only valid from `Connected`; always ends in `Idle`.
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Connecting(_) => {
                return Err(SessionError::State(
                    "cannot disconnect while connecting: wait for the connect attempt to finish"
                        .to_string(),
                ));
            }
            state => {
                return Err(SessionError::State(format!(
                    "cannot disconnect while {state}: not connected yet"
                )));
            }
        }

        let Some(mut connection) = self.connection.take() else {
            self.state = SessionState::Idle;
            return Err(SessionError::State("not connected yet".to_string()));
        };

        if connection.stomp {
            // a failed DISCONNECT does not stop the close below
            if let Err(e) = transmit(&mut connection, &StompFrame::disconnect()) {
                warn!(session = %self.id, "DISCONNECT frame not sent: {e}");
            }
        }

        self.state = SessionState::Disconnected;
        match connection.transport.close() {
            Ok(()) => self.log.info(format!(
                "Close Connection Success, url = {}",
                connection.url
            )),
            Err(e) => self.log.error(format!(
                "disconnect fail, url = {}, message = {e}",
                connection.url
            )),
        }

        debug!(session = %self.id, subscriptions = connection.subscriptions.len(), "released");
        drop(connection);
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Send `content`. Plain sessions send it verbatim; STOMP sessions wrap
    /// it in a SEND frame for `options.destination`.
    pub fn send(&mut self, content: &str, options: &SendOptions) -> Result<(), SessionError> {
        self.ensure_connected("send")?;
        let Some(connection) = self.connection.as_mut() else {
            return Err(not_connected("send"));
        };

        let result = if connection.stomp {
            let destination = options.destination.trim();
            if destination.is_empty() {
                return Err(SessionError::Validation(
                    "STOMP send destination can not be empty".to_string(),
                ));
            }
            let headers = parse_header_document(&options.headers)?;
            transmit(connection, &StompFrame::send(destination, headers, content))
        } else {
            connection
                .transport
                .send(content)
                .map_err(SessionError::Send)
        };

        match result {
            Ok(()) if connection.stomp => self.log.info(format!(
                "send STOMP message, destination = {}, content = {content}, header = {}",
                options.destination.trim(),
                options.headers
            )),
            Ok(()) => self.log.info(format!("send message, content = {content}")),
            Err(e) => {
                self.log.error(format!("send message fail, message = {e}"));
                return Err(e);
            }
        }
        Ok(())
    }

    /// Subscribe to a STOMP destination. Returns the subscription id.
    pub fn subscribe<F>(&mut self, destination: &str, callback: F) -> Result<String, SessionError>
    where
        F: FnMut(&StompFrame) + Send + 'static,
    {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(SessionError::Validation(
                "STOMP subscribe destination can not be empty".to_string(),
            ));
        }
        self.ensure_connected("subscribe")?;
        let Some(connection) = self.connection.as_mut() else {
            return Err(not_connected("subscribe"));
        };
        if !connection.stomp {
            return Err(SessionError::State(
                "cannot subscribe: not in STOMP mode".to_string(),
            ));
        }
        if connection.subscriptions.contains(destination) {
            return Err(SessionError::Validation(format!(
                "already subscribed to {destination}"
            )));
        }

        let id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;

        if let Err(e) = transmit(connection, &StompFrame::subscribe(&id, destination)) {
            self.log.error(format!(
                "subscribe destination {destination} fail, message = {e}"
            ));
            return Err(e);
        }

        connection.subscriptions.insert(Subscription::new(
            id.clone(),
            destination.to_string(),
            Box::new(callback),
        ));
        self.log.info(format!(
            "subscribe destination {destination} success, id = {id}"
        ));
        Ok(id)
    }

    pub fn unsubscribe(&mut self, destination: &str) -> Result<(), SessionError> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(SessionError::Validation(
                "STOMP unsubscribe destination can not be empty".to_string(),
            ));
        }
        self.ensure_connected("unsubscribe")?;
        let Some(connection) = self.connection.as_mut() else {
            return Err(not_connected("unsubscribe"));
        };
        if !connection.stomp {
            return Err(SessionError::State(
                "cannot unsubscribe: not in STOMP mode".to_string(),
            ));
        }
        let Some(id) = connection
            .subscriptions
            .get(destination)
            .map(|s| s.id.clone())
        else {
            return Err(SessionError::Validation(format!(
                "not subscribed to {destination}"
            )));
        };

        if let Err(e) = transmit(connection, &StompFrame::unsubscribe(&id)) {
            self.log.error(format!(
                "unsubscribe destination {destination} fail, message = {e}"
            ));
            return Err(e);
        }

        connection.subscriptions.remove(destination);
        self.log.info(format!(
            "unsubscribe destination {destination} success, id = {id}"
        ));
        Ok(())
    }

    /// Apply every notification already queued by the transport. Returns how
    /// many were handled.
    pub fn poll_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let Some(connection) = self.connection.as_mut() else {
                break;
            };
            let Ok(event) = connection.events.try_recv() else {
                break;
            };
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next transport notification and apply it. Returns
    /// `false` straight away when there is no transport to wait on.
    pub async fn process_next(&mut self) -> bool {
        let Some(connection) = self.connection.as_mut() else {
            return false;
        };
        let event = connection
            .events
            .recv()
            .await
            .unwrap_or_else(|| TransportEvent::Closed {
                code: None,
                reason: "transport went away".to_string(),
            });
        self.handle_event(event);
        true
    }

    /// Apply one transport notification.
    pub fn handle_event(&mut self, event: TransportEvent) {
        if self.connection.is_none() {
            debug!(session = %self.id, ?event, "no transport held, event ignored");
            return;
        }

        match event {
            TransportEvent::Open => self.on_open(),
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Error(message) => self.on_transport_error(&message),
            TransportEvent::Closed { code, reason } => self.on_closed(code, &reason),
        }
    }

    fn on_open(&mut self) {
        if self.state != SessionState::Connecting(ConnectPhase::OpeningTransport) {
            warn!(session = %self.id, state = %self.state, "unexpected open notification");
            return;
        }
        let Some(connection) = self.connection.as_mut() else {
            return;
        };

        let Some(handshake) = connection.handshake.as_deref() else {
            self.state = SessionState::Connected;
            self.log
                .info(format!("Connect success, url = {}", connection.url));
            return;
        };

        match connection.transport.send(handshake) {
            Ok(()) => {
                debug!(session = %self.id, "CONNECT sent, waiting for CONNECTED");
                self.state = SessionState::Connecting(ConnectPhase::AwaitingConnected);
            }
            Err(e) => {
                self.log.error(format!(
                    "Connect error, url = {}, message = CONNECT frame not sent: {e}",
                    connection.url
                ));
                self.release();
            }
        }
    }

    fn on_message(&mut self, text: &str) {
        if !self.is_stomp() {
            self.log.info(format!("Received message: {text}"));
            return;
        }

        if stomp::is_heartbeat(text) {
            trace!(session = %self.id, "heart-beat");
            return;
        }

        // a transport message may carry several frames back to back
        for decoded in stomp::decode_all(text) {
            match decoded {
                Ok(frame) => self.on_frame(&frame),
                Err(e) => self
                    .log
                    .error(format!("Malformed STOMP frame ignored: {e}, raw = {text:?}")),
            }
        }
    }

    fn on_frame(&mut self, frame: &StompFrame) {
        match frame.command {
            StompCommand::Connected => self.on_connected(frame),
            StompCommand::Message => self.on_stomp_message(frame),
            StompCommand::Error => self.log.error(format!(
                "Received STOMP ERROR, message = {}, body = {}",
                frame.get("message").unwrap_or_default(),
                frame.body
            )),
            StompCommand::Receipt => self.log.info(format!(
                "Received STOMP RECEIPT, receipt-id = {}",
                frame.get("receipt-id").unwrap_or_default()
            )),
            _ => self.log.info(format!("Received message: {frame}")),
        }
    }

    fn on_connected(&mut self, frame: &StompFrame) {
        if self.state != SessionState::Connecting(ConnectPhase::AwaitingConnected) {
            warn!(session = %self.id, state = %self.state, "unexpected CONNECTED frame ignored");
            return;
        }
        self.state = SessionState::Connected;

        let mut text = format!(
            "Connect STOMP server success, url = {}",
            self.url().unwrap_or_default()
        );
        if let Some(version) = frame.get("version") {
            text.push_str(&format!(", version = {version}"));
        }
        if let Some(server) = frame.get("server") {
            text.push_str(&format!(", server = {server}"));
        }
        if let Some(headers) = self.connect_headers().filter(|h| !h.is_empty()) {
            if let Ok(document) = serde_json::to_string(headers) {
                text.push_str(&format!(", connectHeader = {document}"));
            }
        }
        self.log.info(text);
    }

    fn on_stomp_message(&mut self, frame: &StompFrame) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };

        let subscription = frame
            .get("subscription")
            .and_then(|id| connection.subscriptions.by_id_mut(id));

        match subscription {
            Some(subscription) => {
                self.log.info(format!(
                    "Receive subscribed message from destination {}, content = {}",
                    subscription.destination, frame.body
                ));
                subscription.deliver(frame);
            }
            None => self.log.info(format!("Received message: {frame}")),
        }
    }

    fn on_transport_error(&mut self, message: &str) {
        if self.state.is_connecting() {
            let text = format!(
                "Connect error, url = {}, message = {message}",
                self.url().unwrap_or_default()
            );
            self.log.error(text);
            self.release();
        } else {
            self.log.error(format!("Transport error, message = {message}"));
        }
    }

    fn on_closed(&mut self, code: Option<u16>, reason: &str) {
        let mut detail = String::new();
        if let Some(code) = code {
            detail.push_str(&format!(", code = {code}"));
        }
        if !reason.is_empty() {
            detail.push_str(&format!(", reason = {reason}"));
        }
        let url = self.url().unwrap_or_default().to_string();

        match self.state {
            SessionState::Connecting(_) => {
                self.log.error(format!(
                    "Connection closed before it was established, url = {url}{detail}"
                ));
            }
            SessionState::Connected => {
                self.state = SessionState::Disconnected;
                self.log
                    .info(format!("Connection closed by peer, url = {url}{detail}"));
            }
            SessionState::Idle | SessionState::Disconnected => {}
        }
        self.release();
    }

    fn ensure_connected(&self, operation: &str) -> Result<(), SessionError> {
        if self.state == SessionState::Connected && self.connection.is_some() {
            Ok(())
        } else {
            Err(SessionError::State(format!(
                "cannot {operation} while {}: not connected yet",
                self.state
            )))
        }
    }

    /// Close and forget the current transport, detaching its notifications.
    fn release(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.transport.close() {
                debug!(session = %self.id, "closing released transport: {e}");
            }
            debug!(
                session = %self.id,
                url = %connection.url,
                subscriptions = connection.subscriptions.len(),
                "transport released"
            );
        }
        self.state = SessionState::Idle;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("url", &self.url())
            .finish_non_exhaustive()
    }
}

fn transmit(connection: &mut Connection, frame: &StompFrame) -> Result<(), SessionError> {
    let wire = stomp::encode(frame)?;
    connection.transport.send(&wire).map_err(SessionError::Send)
}

fn not_connected(operation: &str) -> SessionError {
    SessionError::State(format!("cannot {operation}: not connected yet"))
}
