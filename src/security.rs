//! Transport security modes
//!
//! Provides a strongly-typed enum for how the POP3 connection is
//! protected instead of raw strings or booleans. Each mode knows its
//! conventional default port.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Default port for plain-text POP3 and STLS (RFC 1939).
pub const POP3_PORT: u16 = 110;

/// Default port for POP3 over implicit TLS (RFC 8314).
pub const POP3S_PORT: u16 = 995;

/// How the connection to the POP3 server is secured.
///
/// # Examples
///
/// ```
/// use pop3_client::Security;
///
/// assert_eq!(Security::Plain.default_port(), 110);
/// assert_eq!(Security::Tls.default_port(), 995);
/// assert_eq!("stls".parse::<Security>().unwrap(), Security::StartTls);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Security {
    /// Plain text for the whole session.
    #[default]
    Plain,
    /// TLS handshake right after the TCP connect (POP3S).
    Tls,
    /// Plain connect, then upgraded with the `STLS` command.
    StartTls,
}

impl Security {
    /// The port used when none is configured.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Plain | Self::StartTls => POP3_PORT,
            Self::Tls => POP3S_PORT,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Tls => "tls",
            Self::StartTls => "starttls",
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Security {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "plain" | "none" => Ok(Self::Plain),
            "tls" | "ssl" | "pop3s" => Ok(Self::Tls),
            "starttls" | "stls" => Ok(Self::StartTls),
            other => Err(Error::Config(format!("Unknown security mode: {other}"))),
        }
    }
}
