//! session
//!
//! The session is the core of the crate: a state machine that owns one
//! transport at a time, optionally speaks STOMP over it, and writes what
//! happens to an [`EventLog`](crate::event_log::EventLog).
//!
//! Public types:
//! - `Session`: connect/disconnect/send/subscribe plus event handling.
//! - `ConnectConfig` / `SendOptions`: caller input for those operations.
//! - `SessionState`: where the connection lifecycle currently is.

pub mod engine;
pub mod options;
pub mod subscription;

pub use engine::{ConnectPhase, Session, SessionState};
pub use options::{ConnectConfig, SendOptions};
pub use subscription::{MessageCallback, Subscription};
