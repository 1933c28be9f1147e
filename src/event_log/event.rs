use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => f.write_str("_INFO_"),
            LogLevel::Error => f.write_str("_ERROR_"),
        }
    }
}

/// One entry of the event log. Values handed out by the log are copies;
/// the stored entry never changes after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub sequence: u64,
    pub level: LogLevel,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {}:{}",
            self.sequence,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.text
        )
    }
}
