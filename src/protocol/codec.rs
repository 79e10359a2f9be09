//! Protocol codec
//!
//! Encoding of commands and parsing of reply lines, plus the stream helpers
//! that combine the two framing disciplines: line reads for headers and
//! exact-length reads for payloads.

use std::borrow::Cow;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};

use super::{Command, Response, ValueHeader, FLAGS};
use crate::error::{McError, Result};
use crate::network::ByteStream;

/// Line terminator used by every line of the protocol
pub const CRLF: &[u8] = b"\r\n";

/// Longest reply line accepted before the stream is considered corrupt
pub const MAX_LINE_LEN: usize = 8 * 1024;

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command, including its payload block when it has one
///
/// The byte count in the command line is always taken from the payload
/// itself, so the two cannot disagree.
pub fn encode_command(command: &Command<'_>) -> BytesMut {
    let payload_len = command.payload().map_or(0, |p| p.len() + CRLF.len());
    let mut buf = BytesMut::with_capacity(64 + payload_len);

    buf.put_slice(command.verb().as_bytes());

    match command {
        Command::Store { key, ttl, value, .. } => {
            put_field(&mut buf, key);
            put_number(&mut buf, FLAGS as u64);
            put_number(&mut buf, *ttl as u64);
            put_number(&mut buf, value.len() as u64);
        }
        Command::Cas {
            key,
            ttl,
            cas,
            value,
        } => {
            put_field(&mut buf, key);
            put_number(&mut buf, FLAGS as u64);
            put_number(&mut buf, *ttl as u64);
            put_number(&mut buf, value.len() as u64);
            put_number(&mut buf, *cas);
        }
        Command::Get { keys } | Command::Gets { keys } => {
            for key in keys {
                put_field(&mut buf, key);
            }
        }
        Command::Delete { key, delay } => {
            put_field(&mut buf, key);
            put_number(&mut buf, *delay as u64);
        }
        Command::Incr { key, delta } | Command::Decr { key, delta } => {
            put_field(&mut buf, key);
            put_number(&mut buf, *delta);
        }
        Command::Stats { group } => {
            if let Some(group) = group {
                put_field(&mut buf, group.as_bytes());
            }
        }
        Command::FlushAll => {}
    }
    buf.put_slice(CRLF);

    if let Some(payload) = command.payload() {
        buf.put_slice(payload);
        buf.put_slice(CRLF);
    }

    buf
}

fn put_field(buf: &mut BytesMut, field: &[u8]) {
    buf.put_u8(b' ');
    buf.put_slice(field);
}

fn put_number(buf: &mut BytesMut, n: u64) {
    put_field(buf, n.to_string().as_bytes());
}

/// Check a key against the protocol's rules: non-empty, at most `max_len`
/// bytes, no whitespace or control characters
pub fn validate_key(key: &[u8], max_len: usize) -> Result<()> {
    if key.is_empty() {
        return Err(McError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > max_len {
        return Err(McError::InvalidKey(format!(
            "key is {} bytes (max {})",
            key.len(),
            max_len
        )));
    }
    if let Some(pos) = key.iter().position(|&b| b <= b' ' || b == 0x7f) {
        return Err(McError::InvalidKey(format!(
            "key {:?} has a space or control character at byte {}",
            lossy(key),
            pos
        )));
    }
    Ok(())
}

// =============================================================================
// Reply Parsing
// =============================================================================

/// Parse one reply line, terminator included
pub fn parse_response(line: &[u8]) -> Result<Response> {
    let body = line.strip_suffix(CRLF).ok_or_else(|| {
        McError::Protocol(format!("reply not terminated by CRLF: {:?}", lossy(line)))
    })?;
    let body = trim_trailing_spaces(body);
    let (token, rest) = split_token(body);

    match token {
        b"STORED" => bare(rest, Response::Stored),
        b"NOT_STORED" => bare(rest, Response::NotStored),
        b"EXISTS" => bare(rest, Response::Exists),
        b"DELETED" => bare(rest, Response::Deleted),
        b"NOT_FOUND" => bare(rest, Response::NotFound),
        b"OK" => bare(rest, Response::Ok),
        b"END" => bare(rest, Response::End),
        b"ERROR" => Ok(Response::Error),
        b"CLIENT_ERROR" => Ok(Response::ClientError(lossy(rest).into_owned())),
        b"SERVER_ERROR" => Ok(Response::ServerError(lossy(rest).into_owned())),
        b"VALUE" => parse_value_header(rest),
        b"STAT" => parse_stat(rest),
        _ if rest.is_empty() && !token.is_empty() && token.iter().all(u8::is_ascii_digit) => {
            Ok(Response::Counter(parse_field(token, "counter value")?))
        }
        _ => Err(McError::Protocol(format!(
            "unrecognized reply: {:?}",
            lossy(body)
        ))),
    }
}

/// `VALUE <key> <flags> <bytes> [<cas>]`
fn parse_value_header(rest: &[u8]) -> Result<Response> {
    let fields: Vec<&[u8]> = rest.split(|&b| b == b' ').filter(|f| !f.is_empty()).collect();

    if fields.len() != 3 && fields.len() != 4 {
        return Err(McError::Protocol(format!(
            "VALUE line needs 3 or 4 fields, got {}: {:?}",
            fields.len(),
            lossy(rest)
        )));
    }

    let cas = match fields.get(3) {
        Some(field) => Some(parse_field(field, "cas token")?),
        None => None,
    };

    Ok(Response::Value(ValueHeader {
        key: fields[0].to_vec(),
        flags: parse_field(fields[1], "flags")?,
        length: parse_field(fields[2], "byte count")?,
        cas,
    }))
}

/// `STAT <name> <value>`; the value runs to the end of the line
fn parse_stat(rest: &[u8]) -> Result<Response> {
    let (name, value) = split_token(rest);
    if name.is_empty() {
        return Err(McError::Protocol("STAT line without a name".to_string()));
    }
    Ok(Response::Stat {
        name: lossy(name).into_owned(),
        value: lossy(value).into_owned(),
    })
}

fn bare(rest: &[u8], response: Response) -> Result<Response> {
    if rest.is_empty() {
        Ok(response)
    } else {
        Err(McError::Protocol(format!(
            "unexpected data after {:?}: {:?}",
            response,
            lossy(rest)
        )))
    }
}

fn parse_field<T: FromStr>(field: &[u8], what: &str) -> Result<T> {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| McError::Protocol(format!("invalid {}: {:?}", what, lossy(field))))
}

fn split_token(line: &[u8]) -> (&[u8], &[u8]) {
    match line.iter().position(|&b| b == b' ') {
        Some(i) => (&line[..i], &line[i + 1..]),
        None => (line, &line[line.len()..]),
    }
}

fn trim_trailing_spaces(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b' '] = line {
        line = rest;
    }
    line
}

pub(crate) fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a command (and its payload block) as one unit
pub fn write_command<S: ByteStream + ?Sized>(stream: &mut S, command: &Command<'_>) -> Result<()> {
    let bytes = encode_command(command);
    stream.write_all(&bytes)?;
    Ok(())
}

/// Read and parse one reply line
pub fn read_response<S: ByteStream + ?Sized>(stream: &mut S) -> Result<Response> {
    let line = stream.read_line()?;
    tracing::trace!("Received line: {:?}", lossy(&line));
    parse_response(&line)
}

/// Read the payload announced by `header`, then consume the CRLF that
/// follows it
pub fn read_value_body<S: ByteStream + ?Sized>(
    stream: &mut S,
    header: &ValueHeader,
) -> Result<Vec<u8>> {
    let data = stream.read_exact(header.length)?;

    let terminator = stream.read_exact(CRLF.len())?;
    if terminator != CRLF {
        tracing::warn!(
            "Payload for {:?} not followed by CRLF, stream is out of sync",
            lossy(&header.key)
        );
        return Err(McError::Protocol(format!(
            "payload of {} bytes for key {:?} not followed by CRLF",
            header.length,
            lossy(&header.key)
        )));
    }

    Ok(data)
}
