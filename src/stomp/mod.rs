//! STOMP framing
//!
//! Frames are text: a command line, one `key:value` line per header, a
//! blank line, the body and a NUL terminator. This module only converts
//! between [`StompFrame`] values and that wire text; deciding which frame to
//! send when is the session's job.
//!
//! Header values are carried verbatim (no STOMP 1.2 escaping), so a value
//! may contain `:` but never a line break.

mod codec;
mod frame;
pub mod headers;

pub use codec::{decode, decode_all, encode, is_heartbeat};
pub use frame::{Headers, StompCommand, StompFrame};
