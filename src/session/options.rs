use crate::transport::TransportMode;

/// What to connect to and how.
///
/// `connect_headers` is a JSON object document (for example
/// `{"login":"guest","passcode":"guest"}`); it is only read in STOMP mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectConfig {
    pub url: String,
    pub mode: TransportMode,
    pub stomp: bool,
    pub connect_headers: String,
}

impl ConnectConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: TransportMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_stomp(mut self, stomp: bool) -> Self {
        self.stomp = stomp;
        self
    }

    pub fn with_connect_headers(mut self, document: impl Into<String>) -> Self {
        self.connect_headers = document.into();
        self
    }
}

/// Extra input for `Session::send`. Both fields only matter in STOMP mode:
/// `destination` is then required, `headers` is an optional JSON object
/// document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub destination: String,
    pub headers: String,
}

impl SendOptions {
    pub fn to(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            headers: String::new(),
        }
    }

    pub fn with_headers(mut self, document: impl Into<String>) -> Self {
        self.headers = document.into();
        self
    }
}
