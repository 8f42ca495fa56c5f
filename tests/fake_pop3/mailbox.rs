//! Test data model for the fake POP3 server
//!
//! Provides a builder-style API for constructing maildrop state and
//! server behaviour:
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .credentials("testuser", "testpass")
//!     .apop_timestamp("<1896.6971@dbc.mtview.ca.us>")
//!     .message("uid-1", raw_rfc2822_text)
//!     .message("uid-2", raw_rfc2822_text)
//!     .without_top()
//!     .build();
//! ```
//!
//! The `Mailbox` is shared with the fake server via `Arc<Mutex<_>>`.
//! Deletions are only applied to it when a session ends with QUIT,
//! matching the POP3 UPDATE state.

/// How the fake server secures connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain text only; STLS is rejected.
    None,
    /// TLS handshake right after accept (POP3S).
    Implicit,
    /// Plain greeting, STLS upgrades.
    StartTls,
}

/// The maildrop plus the knobs that shape the server's behaviour.
#[derive(Debug, Clone)]
pub struct Mailbox {
    pub messages: Vec<TestMessage>,
    pub username: String,
    pub password: String,
    /// Text after `+OK` in the greeting.
    pub greeting: String,
    /// Timestamp used to check APOP digests; `None` rejects APOP.
    pub apop_timestamp: Option<String>,
    pub supports_top: bool,
    pub tls: TlsMode,
    /// Drop the connection, without replying, on this command verb.
    pub hang_up_on: Option<String>,
}

impl Mailbox {
    /// Look up a message by its 1-based message number.
    pub fn get(&self, msgno: usize) -> Option<&TestMessage> {
        msgno.checked_sub(1).and_then(|i| self.messages.get(i))
    }
}

/// A test message in the maildrop.
///
/// - `uid`: the UIDL unique id, stable across sessions.
/// - `raw`: the complete RFC 2822 message with CRLF line endings.
#[derive(Debug, Clone)]
pub struct TestMessage {
    pub uid: String,
    pub raw: String,
}

impl TestMessage {
    /// Size in octets, as reported by STAT and LIST.
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    /// The message split into lines, without terminators.
    pub fn lines(&self) -> Vec<&str> {
        self.raw
            .strip_suffix("\r\n")
            .unwrap_or(&self.raw)
            .split("\r\n")
            .collect()
    }

    /// Header lines, the blank separator, and the first `body_lines`
    /// lines of the body (what TOP returns).
    pub fn top(&self, body_lines: usize) -> Vec<&str> {
        let lines = self.lines();
        let header_end = lines
            .iter()
            .position(|line| line.is_empty())
            .unwrap_or(lines.len());
        let end = (header_end + 1 + body_lines).min(lines.len());
        lines[..end].to_vec()
    }
}

/// Builder for constructing a `Mailbox` step by step.
pub struct MailboxBuilder {
    mailbox: Mailbox,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            mailbox: Mailbox {
                messages: Vec::new(),
                username: "testuser".to_string(),
                password: "testpass".to_string(),
                greeting: "POP3 fake server ready".to_string(),
                apop_timestamp: None,
                supports_top: true,
                tls: TlsMode::None,
                hang_up_on: None,
            },
        }
    }

    /// Accepted USER/PASS (and APOP) credentials.
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.mailbox.username = username.to_string();
        self.mailbox.password = password.to_string();
        self
    }

    /// Replace the greeting text (after `+OK`).
    pub fn greeting(mut self, text: &str) -> Self {
        self.mailbox.greeting = text.to_string();
        self
    }

    /// Advertise `timestamp` in the greeting and accept APOP digests
    /// computed from it.
    pub fn apop_timestamp(mut self, timestamp: &str) -> Self {
        self.mailbox.greeting = format!("POP3 fake server ready {timestamp}");
        self.mailbox.apop_timestamp = Some(timestamp.to_string());
        self
    }

    /// Append a message. Message numbers follow insertion order.
    pub fn message(mut self, uid: &str, raw: &str) -> Self {
        self.mailbox.messages.push(TestMessage {
            uid: uid.to_string(),
            raw: raw.to_string(),
        });
        self
    }

    /// Answer TOP with `-ERR`, like servers without the extension.
    pub fn without_top(mut self) -> Self {
        self.mailbox.supports_top = false;
        self
    }

    pub fn tls(mut self, mode: TlsMode) -> Self {
        self.mailbox.tls = mode;
        self
    }

    /// Close the connection when `verb` is received.
    pub fn hang_up_on(mut self, verb: &str) -> Self {
        self.mailbox.hang_up_on = Some(verb.to_ascii_uppercase());
        self
    }

    /// Consume the builder and return the finished `Mailbox`.
    pub fn build(self) -> Mailbox {
        self.mailbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "From: a@example.com\r\nSubject: Hi\r\n\r\nbody 1\r\nbody 2\r\n";

    #[test]
    fn top_keeps_headers_and_blank_line() {
        let msg = TestMessage {
            uid: "u1".into(),
            raw: RAW.into(),
        };
        assert_eq!(
            msg.top(1),
            vec!["From: a@example.com", "Subject: Hi", "", "body 1"]
        );
        assert_eq!(msg.top(0).len(), 3);
        assert_eq!(msg.top(99).len(), 5);
    }

    #[test]
    fn message_numbers_are_one_based() {
        let mailbox = MailboxBuilder::new().message("u1", RAW).build();
        assert!(mailbox.get(0).is_none());
        assert_eq!(mailbox.get(1).unwrap().uid, "u1");
        assert!(mailbox.get(2).is_none());
    }
}
