use super::frame::{StompFrame, header_violation};
use crate::utils::error::CodecError;

const NUL: char = '\0';

/// Serialize a frame to its wire text, NUL terminator included.
pub fn encode(frame: &StompFrame) -> Result<String, CodecError> {
    for required in frame.command.required_headers() {
        if frame.get(required).is_none_or(str::is_empty) {
            return Err(CodecError::Encode(format!(
                "{} frame requires a {required:?} header",
                frame.command
            )));
        }
    }

    let mut out = String::with_capacity(frame.command.as_str().len() + frame.body.len() + 64);
    out.push_str(frame.command.as_str());
    out.push('\n');

    for (key, value) in &frame.headers {
        if let Some(reason) = header_violation(key, value) {
            return Err(CodecError::Encode(format!("header {key:?}: {reason}")));
        }
        out.push_str(key);
        out.push(':');
        out.push_str(value);
        out.push('\n');
    }
    out.push('\n');

    match frame.get("content-length") {
        Some(length) if length.parse::<usize>().ok() != Some(frame.body.len()) => {
            return Err(CodecError::Encode(format!(
                "content-length {length:?} does not match a body of {} bytes",
                frame.body.len()
            )));
        }
        None if frame.body.contains(NUL) => {
            return Err(CodecError::Encode(
                "body contains NUL but no content-length header".to_string(),
            ));
        }
        _ => {}
    }

    out.push_str(&frame.body);
    out.push(NUL);
    Ok(out)
}

/// Parse exactly one frame from `wire`.
///
/// Leading line breaks (heart-beats) are skipped, CRLF line endings are
/// accepted, and trailing line breaks after the NUL are ignored. Duplicate
/// header names keep the last value.
pub fn decode(wire: &str) -> Result<StompFrame, CodecError> {
    let (frame, trailer) = decode_next(wire)?;
    if !is_heartbeat(trailer) {
        return Err(CodecError::Decode("unexpected data after NUL terminator".to_string()));
    }
    Ok(frame)
}

/// Parse every frame packed into `wire`, in order.
///
/// Frames may be separated by line breaks. Decoding stops at the first
/// malformed frame, which is returned as the last element; the frames
/// before it are kept.
pub fn decode_all(wire: &str) -> Vec<Result<StompFrame, CodecError>> {
    let mut frames = Vec::new();
    let mut rest = wire;
    while !is_heartbeat(rest) {
        match decode_next(rest) {
            Ok((frame, tail)) => {
                frames.push(Ok(frame));
                rest = tail;
            }
            Err(e) => {
                frames.push(Err(e));
                break;
            }
        }
    }
    frames
}

/// Parse the first frame of `wire`, returning it and the text after its
/// NUL terminator.
fn decode_next(wire: &str) -> Result<(StompFrame, &str), CodecError> {
    let mut rest = wire.trim_start_matches(['\r', '\n']);

    let command_line = next_line(&mut rest)
        .ok_or_else(|| CodecError::Decode("missing line break after command".to_string()))?;
    let command = command_line.parse()?;

    let mut frame = StompFrame::new(command);
    loop {
        let line = next_line(&mut rest).ok_or_else(|| {
            CodecError::Decode("missing blank line after headers".to_string())
        })?;
        if line.is_empty() {
            break;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| CodecError::Decode(format!("header line without ':': {line:?}")))?;
        frame.headers.insert(key.to_string(), value.to_string());
    }

    let (body, trailer) = match frame.get("content-length") {
        Some(length) => {
            let length: usize = length
                .trim()
                .parse()
                .map_err(|_| CodecError::Decode(format!("invalid content-length {length:?}")))?;
            if rest.len() <= length || !rest.is_char_boundary(length) {
                return Err(CodecError::Decode(format!(
                    "body shorter than content-length {length}"
                )));
            }
            let (body, after) = rest.split_at(length);
            let trailer = after
                .strip_prefix(NUL)
                .ok_or_else(|| CodecError::Decode("missing NUL terminator".to_string()))?;
            (body, trailer)
        }
        None => rest
            .split_once(NUL)
            .ok_or_else(|| CodecError::Decode("missing NUL terminator".to_string()))?,
    };

    frame.body = body.to_string();
    Ok((frame, trailer))
}

/// True when `wire` carries nothing but line breaks, which is how a STOMP
/// peer sends heart-beats.
pub fn is_heartbeat(wire: &str) -> bool {
    wire.chars().all(|c| c == '\n' || c == '\r')
}

fn next_line<'a>(rest: &mut &'a str) -> Option<&'a str> {
    let (line, tail) = rest.split_once('\n')?;
    *rest = tail;
    Some(line.strip_suffix('\r').unwrap_or(line))
}
