use tokio::sync::mpsc;

/// Something that happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(String),
    Error(String),
    Closed { code: Option<u16>, reason: String },
}

/// Sending half handed to a transport at open time.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report an event. Returns `false` once the receiver has been dropped,
    /// i.e. the session no longer listens to this transport.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn opened(&self) -> bool {
        self.emit(TransportEvent::Open)
    }

    pub fn message(&self, text: impl Into<String>) -> bool {
        self.emit(TransportEvent::Message(text.into()))
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.emit(TransportEvent::Error(message.into()))
    }

    pub fn closed(&self, code: Option<u16>, reason: impl Into<String>) -> bool {
        self.emit(TransportEvent::Closed {
            code,
            reason: reason.into(),
        })
    }

    pub fn is_detached(&self) -> bool {
        self.tx.is_closed()
    }
}
