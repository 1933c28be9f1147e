//! Line-oriented console over a [`Session`].
//!
//! The console keeps the connect and send forms between commands, runs one
//! [`Command`] at a time and prints new event log entries as they appear.
//! Session errors are printed and never end the console.

mod command;

pub use command::{Command, HELP, ParseError, parse_command};

use std::io::{self, Write};

use tracing::debug;

use crate::event_log::EventLog;
use crate::session::{ConnectConfig, SendOptions, Session};

/// Whether the console should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    session: Session,
    log: EventLog,
    /// Sequence number of the next log event to print.
    cursor: u64,
    connect: ConnectConfig,
    send: SendOptions,
}

impl Console {
    /// `log` must be the log the session writes to.
    pub fn new(session: Session, log: EventLog, connect: ConnectConfig) -> Self {
        Self {
            session,
            log,
            cursor: 0,
            connect,
            send: SendOptions::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn connect_form(&self) -> &ConnectConfig {
        &self.connect
    }

    pub fn send_form(&self) -> &SendOptions {
        &self.send
    }

    /// Parse and run one input line.
    pub fn handle_line(&mut self, line: &str, out: &mut impl Write) -> io::Result<Flow> {
        match parse_command(line) {
            Ok(Some(command)) => self.execute(command, out),
            Ok(None) => Ok(Flow::Continue),
            Err(e) => {
                writeln!(out, "error: {e}")?;
                Ok(Flow::Continue)
            }
        }
    }

    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> io::Result<Flow> {
        debug!(?command, "console command");

        let result = match command {
            Command::Connect => self.session.connect(self.connect.clone()),
            Command::Disconnect => self.session.disconnect(),
            Command::Url(url) => {
                self.connect.url = url;
                Ok(())
            }
            Command::Transport(mode) => {
                self.connect.mode = mode;
                Ok(())
            }
            Command::Stomp(stomp) => {
                self.connect.stomp = stomp;
                Ok(())
            }
            Command::ConnectHeaders(document) => {
                self.connect.connect_headers = document;
                Ok(())
            }
            Command::Destination(destination) => {
                self.send.destination = destination;
                Ok(())
            }
            Command::Headers(document) => {
                self.send.headers = document;
                Ok(())
            }
            Command::Send(content) => self.session.send(&content, &self.send),
            Command::Subscribe(destination) => self
                .session
                .subscribe(&destination, |frame| {
                    debug!(destination = frame.get("destination"), "subscription callback");
                })
                .map(|_| ()),
            Command::Unsubscribe(destination) => self.session.unsubscribe(&destination),
            Command::Log { json } => {
                self.print_log(json, out)?;
                return Ok(Flow::Continue);
            }
            Command::Clear => {
                self.session.clear_log();
                self.cursor = 0;
                Ok(())
            }
            Command::State => {
                self.print_state(out)?;
                return Ok(Flow::Continue);
            }
            Command::Help => {
                writeln!(out, "{HELP}")?;
                return Ok(Flow::Continue);
            }
            Command::Quit => {
                self.shutdown(out)?;
                return Ok(Flow::Quit);
            }
        };

        self.flush(out)?;
        if let Err(e) = result {
            writeln!(out, "error: {e}")?;
        }
        Ok(Flow::Continue)
    }

    /// Apply queued transport notifications and print what they logged.
    pub fn pump(&mut self, out: &mut impl Write) -> io::Result<()> {
        self.session.poll_events();
        self.flush(out)
    }

    /// Print log events appended since the last flush.
    pub fn flush(&mut self, out: &mut impl Write) -> io::Result<()> {
        for event in self.log.since(self.cursor) {
            writeln!(out, "{event}")?;
            self.cursor = event.sequence + 1;
        }
        out.flush()
    }

    /// Hang up if connected and print the final log lines.
    pub fn shutdown(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.session.is_connected() {
            if let Err(e) = self.session.disconnect() {
                writeln!(out, "error: {e}")?;
            }
        }
        self.flush(out)
    }

    fn print_log(&mut self, json: bool, out: &mut impl Write) -> io::Result<()> {
        let events = self.session.get_log();
        if json {
            let text = serde_json::to_string_pretty(&events).map_err(io::Error::other)?;
            writeln!(out, "{text}")?;
        } else {
            for event in &events {
                writeln!(out, "{event}")?;
            }
        }
        if let Some(event) = events.last() {
            self.cursor = self.cursor.max(event.sequence + 1);
        }
        out.flush()
    }

    fn print_state(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "state: {}", self.session.state())?;
        if let Some(url) = self.session.url() {
            writeln!(out, "url: {url}")?;
        }
        for subscription in self.session.subscriptions() {
            writeln!(
                out,
                "subscribed: {} ({})",
                subscription.destination, subscription.id
            )?;
        }
        writeln!(
            out,
            "form: url = {}, transport = {}, stomp = {}, destination = {}",
            self.connect.url, self.connect.mode, self.connect.stomp, self.send.destination
        )
    }
}
