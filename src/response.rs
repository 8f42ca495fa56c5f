//! POP3 response parsing
//!
//! Pure helpers that turn server lines into values: status checks,
//! dot-stuffing, the APOP greeting timestamp and the numeric payloads
//! of STAT, LIST and UIDL. None of these touch the network.

use crate::error::{Error, Result};
use md5::{Digest, Md5};
use serde::Serialize;

/// Positive status indicator.
pub const OK: &str = "+OK";

/// Terminator line of a multi-line response.
pub const TERMINATOR: &str = ".";

/// Message count and total size from `STAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MailboxStat {
    pub messages: usize,
    pub octets: u64,
}

/// Check the status of a response line and return the text after it.
///
/// `+OK` alone yields an empty string. Anything other than `+OK`,
/// including `-ERR`, is a protocol error.
pub fn parse_status(line: &str) -> Result<&str> {
    let (status, rest) = line.split_once(' ').unwrap_or((line, ""));
    if status == OK {
        Ok(rest)
    } else {
        Err(Error::Protocol(format!("request failed: {line}")))
    }
}

/// Undo dot-stuffing: one leading dot is removed.
#[must_use]
pub fn unstuff(line: &str) -> &str {
    line.strip_prefix('.').unwrap_or(line)
}

/// Extract the APOP timestamp from a greeting.
///
/// The timestamp is the first `<...>` segment, returned with its
/// brackets. A segment without `@` (or starting with it) is not a
/// timestamp.
#[must_use]
pub fn apop_timestamp(greeting: &str) -> Option<String> {
    let start = greeting.find('<')?;
    let len = greeting[start..].find('>')?;
    let inner = &greeting[start + 1..start + len];
    match inner.find('@') {
        Some(at) if at > 0 => Some(format!("<{inner}>")),
        _ => None,
    }
}

/// Lowercase hex MD5 of the timestamp followed by the password
/// (RFC 1939 section 7).
#[must_use]
pub fn apop_digest(timestamp: &str, password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Parse the `count octets` pair of a STAT response.
pub fn parse_stat(rest: &str) -> Result<MailboxStat> {
    let mut fields = rest.split_whitespace();
    let messages = number(fields.next(), "STAT message count", rest)?;
    let octets = number(fields.next(), "STAT size", rest)?;
    Ok(MailboxStat { messages, octets })
}

/// Parse a `msgno octets` scan listing, as sent by LIST.
pub fn parse_scan_line(line: &str) -> Result<(u32, u64)> {
    let mut fields = line.split_whitespace();
    let msgno = number(fields.next(), "LIST message number", line)?;
    let octets = number(fields.next(), "LIST size", line)?;
    Ok((msgno, octets))
}

/// Parse a `msgno unique-id` listing, as sent by UIDL.
pub fn parse_uid_line(line: &str) -> Result<(u32, String)> {
    let (msgno, uid) = line
        .trim()
        .split_once(' ')
        .ok_or_else(|| Error::Protocol(format!("malformed UIDL line: {line}")))?;
    let msgno = number(Some(msgno), "UIDL message number", line)?;
    Ok((msgno, uid.trim().to_string()))
}

fn number<T: std::str::FromStr>(field: Option<&str>, what: &str, line: &str) -> Result<T> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| Error::Protocol(format!("invalid {what} in '{line}'")))
}
