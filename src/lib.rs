//! # sockprobe
//!
//! `sockprobe` is the core of an interactive debugging client for WebSocket
//! endpoints. It can speak plain WebSocket or the SockJS WebSocket
//! sub-transport, optionally layer STOMP on top, and records everything that
//! happens in an ordered event log a console or UI can render.
//!
//! ## Core Modules
//!
//! - `session`: The connection state machine: connect, disconnect, send, subscribe.
//! - `stomp`: STOMP frame model, text codec and header document parsing.
//! - `transport`: The transport seam plus the WebSocket and SockJS clients.
//! - `event_log`: Append-only, sequenced log of session events.
//! - `console`: Line-oriented command console over a session.
//! - `config`: Loading settings from files and environment variables.
//! - `utils`: Shared error types and tracing setup.

pub mod config;
pub mod console;
pub mod event_log;
pub mod session;
pub mod stomp;
pub mod transport;
pub mod utils;
