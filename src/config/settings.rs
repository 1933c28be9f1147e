use serde::Deserialize;

use crate::session::ConnectConfig;
use crate::transport::TransportMode;

/// Top-level configuration for the probe.
///
/// `connection` seeds the connect form, `logging` sets the tracing level.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub logging: LoggingSettings,
}

/// Initial values for the connect form.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub url: String,
    pub transport: TransportMode,
    pub stomp: bool,
    /// JSON object document, only read in STOMP mode.
    pub connect_headers: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Settings as found in files or the environment, every value optional.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub connection: Option<PartialConnectionSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialConnectionSettings {
    pub url: Option<String>,
    pub transport: Option<TransportMode>,
    pub stomp: Option<bool>,
    pub connect_headers: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connection: ConnectionSettings {
                url: "ws://127.0.0.1:8080/ws".to_string(),
                transport: TransportMode::Raw,
                stomp: false,
                connect_headers: String::new(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Fill the gaps of `partial` with defaults.
    pub fn merge(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let connection = partial.connection.unwrap_or_default();
        let logging = partial.logging.unwrap_or_default();

        Settings {
            connection: ConnectionSettings {
                url: connection.url.unwrap_or(default.connection.url),
                transport: connection
                    .transport
                    .unwrap_or(default.connection.transport),
                stomp: connection.stomp.unwrap_or(default.connection.stomp),
                connect_headers: connection
                    .connect_headers
                    .unwrap_or(default.connection.connect_headers),
            },
            logging: LoggingSettings {
                level: logging.level.unwrap_or(default.logging.level),
            },
        }
    }

    pub fn connect_config(&self) -> ConnectConfig {
        ConnectConfig::new(self.connection.url.clone())
            .with_mode(self.connection.transport)
            .with_stomp(self.connection.stomp)
            .with_connect_headers(self.connection.connect_headers.clone())
    }
}
