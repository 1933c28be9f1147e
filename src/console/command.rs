use std::fmt;

use crate::transport::TransportMode;

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    Url(String),
    Transport(TransportMode),
    Stomp(bool),
    ConnectHeaders(String),
    Destination(String),
    Headers(String),
    Send(String),
    Subscribe(String),
    Unsubscribe(String),
    Log { json: bool },
    Clear,
    State,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
commands:
  connect                  connect with the current form
  disconnect               close the connection
  url <url>                set the connect url
  transport <raw|sockjs>   set the transport
  stomp <on|off>           toggle STOMP mode
  connect-headers <json>   set the CONNECT header document
  dest <destination>       set the STOMP send destination
  headers <json>           set the STOMP send header document
  send <content>           send a message
  subscribe <destination>  subscribe to a STOMP destination
  unsubscribe <destination>
  log [json]               print the whole event log
  clear                    clear the event log
  state                    show the session state
  help                     show this text
  quit                     disconnect and exit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim_start();
    if line.trim().is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line.trim_end(), ""),
    };

    let command = match word.to_lowercase().as_str() {
        "connect" => Command::Connect,
        "disconnect" => Command::Disconnect,
        "url" => Command::Url(required(word, rest)?),
        "transport" => Command::Transport(rest.parse().map_err(ParseError)?),
        "stomp" => Command::Stomp(parse_switch(rest)?),
        "connect-headers" => Command::ConnectHeaders(rest.to_string()),
        "dest" => Command::Destination(rest.to_string()),
        "headers" => Command::Headers(rest.to_string()),
        "send" => Command::Send(rest.to_string()),
        "subscribe" => Command::Subscribe(rest.to_string()),
        "unsubscribe" => Command::Unsubscribe(rest.to_string()),
        "log" => match rest {
            "" => Command::Log { json: false },
            "json" => Command::Log { json: true },
            other => return Err(ParseError(format!("unknown log format {other:?}"))),
        },
        "clear" => Command::Clear,
        "state" => Command::State,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => {
            return Err(ParseError(format!(
                "unknown command {other:?}, type help for a list"
            )));
        }
    };
    Ok(Some(command))
}

fn required(word: &str, rest: &str) -> Result<String, ParseError> {
    if rest.is_empty() {
        return Err(ParseError(format!("{word} needs an argument")));
    }
    Ok(rest.to_string())
}

fn parse_switch(value: &str) -> Result<bool, ParseError> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(ParseError(format!("expected on or off, got {other:?}"))),
    }
}
