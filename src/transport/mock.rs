//! In-memory transport for tests.
//!
//! `MockNetwork` is both the factory handed to a session and the test's
//! remote control: it fires events at whichever transport was opened last
//! and records everything the session sent.

use std::sync::{Arc, Mutex};

use super::{EventSink, Transport, TransportEvent, TransportFactory, TransportMode};
use crate::stomp::{self, StompFrame};
use crate::utils::error::TransportError;

#[derive(Debug, Default)]
struct MockState {
    modes: Vec<TransportMode>,
    opened: Vec<String>,
    sent: Vec<String>,
    closes: usize,
    fail_open: bool,
    fail_send: bool,
    fail_close: bool,
    sink: Option<EventSink>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockNetwork {
    state: Arc<Mutex<MockState>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self, event: TransportEvent) -> bool {
        let sink = self.state.lock().unwrap().sink.clone();
        sink.is_some_and(|sink| sink.emit(event))
    }

    pub fn open(&self) -> bool {
        self.fire(TransportEvent::Open)
    }

    pub fn deliver(&self, text: &str) -> bool {
        self.fire(TransportEvent::Message(text.to_string()))
    }

    pub fn deliver_frame(&self, frame: &StompFrame) -> bool {
        self.deliver(&stomp::encode(frame).unwrap())
    }

    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_frames(&self) -> Vec<StompFrame> {
        self.sent()
            .iter()
            .map(|wire| stomp::decode(wire).unwrap())
            .collect()
    }

    pub fn opened(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn modes(&self) -> Vec<TransportMode> {
        self.state.lock().unwrap().modes.clone()
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub fn fail_open(&self, fail: bool) {
        self.state.lock().unwrap().fail_open = fail;
    }

    pub fn fail_send(&self, fail: bool) {
        self.state.lock().unwrap().fail_send = fail;
    }

    pub fn fail_close(&self, fail: bool) {
        self.state.lock().unwrap().fail_close = fail;
    }
}

impl TransportFactory for MockNetwork {
    fn create(&self, mode: TransportMode) -> Box<dyn Transport> {
        self.state.lock().unwrap().modes.push(mode);
        Box::new(MockTransport {
            state: self.state.clone(),
        })
    }
}

struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl Transport for MockTransport {
    fn open(&mut self, url: &str, events: EventSink) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_open {
            return Err(TransportError::InvalidUrl {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        state.opened.push(url.to_string());
        state.sink = Some(events);
        Ok(())
    }

    fn send(&mut self, payload: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_send {
            return Err(TransportError::NotOpen);
        }
        if state.sink.is_none() {
            return Err(TransportError::NotOpen);
        }
        state.sent.push(payload.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.closes += 1;
        if state.fail_close {
            return Err(TransportError::NotOpen);
        }
        Ok(())
    }
}
