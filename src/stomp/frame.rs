use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::error::CodecError;

/// Header mapping of a frame. Ordered so encoding is deterministic.
pub type Headers = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StompCommand {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Message,
    Receipt,
    Error,
    Disconnect,
}

impl StompCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            StompCommand::Connect => "CONNECT",
            StompCommand::Stomp => "STOMP",
            StompCommand::Connected => "CONNECTED",
            StompCommand::Send => "SEND",
            StompCommand::Subscribe => "SUBSCRIBE",
            StompCommand::Unsubscribe => "UNSUBSCRIBE",
            StompCommand::Message => "MESSAGE",
            StompCommand::Receipt => "RECEIPT",
            StompCommand::Error => "ERROR",
            StompCommand::Disconnect => "DISCONNECT",
        }
    }

    /// Headers a frame with this command must carry before it may be encoded.
    pub fn required_headers(&self) -> &'static [&'static str] {
        match self {
            StompCommand::Send => &["destination"],
            StompCommand::Subscribe => &["destination", "id"],
            StompCommand::Unsubscribe => &["id"],
            _ => &[],
        }
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StompCommand {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s {
            "CONNECT" => StompCommand::Connect,
            "STOMP" => StompCommand::Stomp,
            "CONNECTED" => StompCommand::Connected,
            "SEND" => StompCommand::Send,
            "SUBSCRIBE" => StompCommand::Subscribe,
            "UNSUBSCRIBE" => StompCommand::Unsubscribe,
            "MESSAGE" => StompCommand::Message,
            "RECEIPT" => StompCommand::Receipt,
            "ERROR" => StompCommand::Error,
            "DISCONNECT" => StompCommand::Disconnect,
            other => {
                return Err(CodecError::Decode(format!("unknown command {other:?}")));
            }
        };
        Ok(command)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: StompCommand,
    pub headers: Headers,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Headers::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Merge `headers` into the frame. Existing keys are overwritten.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// CONNECT frame. Caller `headers` are merged over the defaults.
    pub fn connect(host: Option<&str>, headers: Headers) -> Self {
        let mut frame = StompFrame::new(StompCommand::Connect)
            .with_header("accept-version", "1.2,1.1,1.0")
            .with_header("heart-beat", "0,0");
        if let Some(host) = host {
            frame = frame.with_header("host", host);
        }
        frame.with_headers(headers)
    }

    /// SEND frame. A `content-length` header is added for non-empty bodies
    /// unless the caller already supplied one.
    pub fn send(destination: &str, headers: Headers, body: &str) -> Self {
        let mut frame = StompFrame::new(StompCommand::Send)
            .with_headers(headers)
            .with_header("destination", destination)
            .with_body(body);
        if !body.is_empty() && !frame.headers.contains_key("content-length") {
            frame = frame.with_header("content-length", body.len().to_string());
        }
        frame
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        StompFrame::new(StompCommand::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        StompFrame::new(StompCommand::Unsubscribe).with_header("id", id)
    }

    pub fn disconnect() -> Self {
        StompFrame::new(StompCommand::Disconnect)
    }
}

impl fmt::Display for StompFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for (key, value) in &self.headers {
            write!(f, " {key}={value}")?;
        }
        if !self.body.is_empty() {
            write!(f, " body={}", self.body)?;
        }
        Ok(())
    }
}

/// Reason a header pair cannot travel on the wire unescaped, if any.
pub(crate) fn header_violation(key: &str, value: &str) -> Option<&'static str> {
    let line_break = |s: &str| s.contains(['\n', '\r']);
    if key.is_empty() {
        Some("empty header name")
    } else if line_break(key) {
        Some("line break in header name")
    } else if key.contains(':') {
        Some("':' in header name")
    } else if line_break(value) {
        Some("line break in header value")
    } else {
        None
    }
}
