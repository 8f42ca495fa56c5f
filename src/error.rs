//! Error types for pop3-client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// TCP connect failed: DNS, refusal or timeout.
    #[error("Cannot connect to host: {0}")]
    Connect(String),

    #[error("TLS error: {0}")]
    Tls(String),

    /// Write failed or the session is already closed.
    #[error("Send failed: {0}")]
    Send(String),

    /// Read failed, timed out or hit EOF.
    #[error("Receive failed: {0}")]
    Receive(String),

    /// The server answered with something other than `+OK`, or the
    /// payload could not be parsed.
    #[error("POP3 error: {0}")]
    Protocol(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error means the socket can no longer be used.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Send(_) | Self::Receive(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
