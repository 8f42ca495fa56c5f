//! POP3 client library
//!
//! An async client for the Post Office Protocol version 3
//! ([RFC 1939](https://www.rfc-editor.org/rfc/rfc1939)) over plain
//! TCP, implicit TLS, or a connection upgraded with `STLS`
//! ([RFC 2595](https://www.rfc-editor.org/rfc/rfc2595)).
//!
//! [`Pop3Client`] drives one session at a time: greeting, optional
//! APOP, USER/PASS, then the mailbox commands (STAT, LIST, UIDL, TOP,
//! RETR, DELE, RSET, NOOP, CAPA) and QUIT. Messages are returned as
//! raw text; parsing them is left to the caller.

mod capability;
mod client;
mod config;
mod error;
mod response;
mod security;
mod transport;

pub use capability::Capability;
pub use client::{Pop3Client, SessionState, TopSupport};
pub use config::{DEFAULT_TIMEOUT, Pop3Config};
pub use error::{Error, Result};
pub use response::{MailboxStat, apop_digest, apop_timestamp};
pub use security::{POP3_PORT, POP3S_PORT, Security};
