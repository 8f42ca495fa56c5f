//! POP3 client

use crate::capability::Capability;
use crate::config::Pop3Config;
use crate::error::{Error, Result};
use crate::response::{
    MailboxStat, TERMINATOR, apop_digest, apop_timestamp, parse_scan_line, parse_stat,
    parse_status, parse_uid_line, unstuff,
};
use crate::security::Security;
use crate::transport::Transport;
use std::collections::BTreeMap;
use tracing::{debug, info, trace, warn};

/// Where the client is in the POP3 session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No usable connection: never connected, logged out, or broken.
    Disconnected,
    /// Greeting received, not logged in yet.
    Connected,
    /// USER/PASS accepted.
    Authenticated,
}

/// Whether the server supports the optional TOP command.
///
/// Settled by the first TOP attempt and not probed again afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopSupport {
    #[default]
    Unknown,
    Supported,
    Unsupported,
}

/// Async POP3 client over a single connection.
///
/// Every operation takes `&mut self` and reads the whole response
/// before returning, so only one request is ever in flight. If an
/// operation's future is dropped part way through, the next request
/// closes the connection instead of reading the leftover reply.
///
/// # Example
///
/// ```no_run
/// use pop3_client::{Pop3Client, Pop3Config};
///
/// # async fn example() -> pop3_client::Result<()> {
/// let config = Pop3Config::new("pop.example.com", "user", "secret");
/// let mut client = Pop3Client::open(&config).await?;
///
/// let stat = client.status().await?;
/// for msgno in client.list().await?.keys() {
///     let headers = client.top(*msgno, 0, true).await?;
///     println!("{headers}");
/// }
/// println!("{} messages", stat.messages);
///
/// client.logout().await;
/// # Ok(())
/// # }
/// ```
pub struct Pop3Client {
    transport: Transport,
    state: SessionState,
    greeting: String,
    timestamp: Option<String>,
    top: TopSupport,
    /// Set while a request's response has not been fully read.
    in_flight: bool,
}

impl Pop3Client {
    /// Connect and read the server greeting.
    ///
    /// With [`Security::StartTls`] the connection is upgraded with
    /// `STLS` before returning. Any failure leaves nothing open.
    ///
    /// # Errors
    ///
    /// [`Error::Connect`] if the TCP connection cannot be made,
    /// [`Error::Tls`] if the TLS handshake fails, [`Error::Protocol`]
    /// if the greeting or `STLS` is rejected.
    pub async fn connect(config: &Pop3Config) -> Result<Self> {
        debug!(
            "Connecting to POP3 server at {}:{}",
            config.host,
            config.port()
        );

        let transport = Transport::open(config).await?;
        let mut client = Self {
            transport,
            state: SessionState::Connected,
            greeting: String::new(),
            timestamp: None,
            top: TopSupport::Unknown,
            in_flight: false,
        };

        if let Err(e) = client.handshake(config.security).await {
            client.close().await;
            return Err(e);
        }

        info!("Connected to POP3 server");
        Ok(client)
    }

    /// Connect and log in with the credentials from `config`.
    ///
    /// # Errors
    ///
    /// Anything [`Pop3Client::connect`] or [`Pop3Client::login`]
    /// returns. The connection is closed if login fails.
    pub async fn open(config: &Pop3Config) -> Result<Self> {
        let mut client = Self::connect(config).await?;
        if let Err(e) = client
            .login(&config.username, &config.password, config.try_apop)
            .await
        {
            client.logout().await;
            return Err(e);
        }
        Ok(client)
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.transport.is_encrypted()
    }

    /// Text of the greeting line after `+OK`.
    #[must_use]
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// The APOP timestamp from the greeting, brackets included.
    #[must_use]
    pub fn apop_timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    #[must_use]
    pub const fn top_support(&self) -> TopSupport {
        self.top
    }

    /// Send one command and read its complete response.
    ///
    /// Returns the text after `+OK` or, for `multiline`, the body with
    /// dot-stuffing undone and each line ending in `\n`. A transport
    /// failure closes the connection for good.
    ///
    /// # Errors
    ///
    /// [`Error::Send`] / [`Error::Receive`] on I/O failure, when the
    /// connection is already closed, or when an earlier request was
    /// cancelled before its response was read. [`Error::Protocol`] if
    /// the server does not answer `+OK`.
    pub async fn request(&mut self, command: &str, multiline: bool) -> Result<String> {
        if !self.transport.is_open() {
            return Err(Error::Send("not connected".into()));
        }
        if self.in_flight {
            warn!("Previous request was cancelled mid-response, closing connection");
            self.close().await;
            return Err(Error::Send(
                "connection out of sync after a cancelled request".into(),
            ));
        }

        self.in_flight = true;
        let result = self.exchange(command, multiline).await;
        self.in_flight = false;
        if let Err(e) = &result
            && e.is_fatal()
        {
            warn!("Connection lost: {}", e);
            self.close().await;
        }
        result
    }

    /// Log in, trying APOP first when asked and offered.
    ///
    /// A failed APOP attempt is ignored. USER and PASS are always sent
    /// afterwards, even when APOP was accepted.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if USER or PASS is rejected, or a transport
    /// error.
    pub async fn login(&mut self, user: &str, password: &str, try_apop: bool) -> Result<()> {
        let timestamp = self.timestamp.clone().filter(|_| try_apop);
        if let Some(timestamp) = timestamp {
            let digest = apop_digest(&timestamp, password);
            match self.request(&format!("APOP {user} {digest}"), false).await {
                Ok(_) => debug!("APOP accepted for {}", user),
                Err(e) => debug!("APOP failed, falling back to USER/PASS: {}", e),
            }
        }

        self.request(&format!("USER {user}"), false).await?;
        self.request(&format!("PASS {password}"), false).await?;

        self.state = SessionState::Authenticated;
        info!("Logged in as {}", user);
        Ok(())
    }

    /// Raw `CAPA` lines, in the order the server sent them.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the server does not know `CAPA`.
    pub async fn capabilities(&mut self) -> Result<Vec<String>> {
        let body = self.request("CAPA", true).await?;
        Ok(body
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// `CAPA` lines interpreted as [`Capability`] values.
    ///
    /// # Errors
    ///
    /// Same as [`Pop3Client::capabilities`].
    pub async fn capability_set(&mut self) -> Result<Vec<Capability>> {
        let lines = self.capabilities().await?;
        Ok(lines.iter().map(|line| Capability::parse(line)).collect())
    }

    /// Message count and total size (`STAT`).
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the reply is rejected or not two numbers.
    pub async fn status(&mut self) -> Result<MailboxStat> {
        let rest = self.request("STAT", false).await?;
        parse_stat(&rest)
    }

    /// Size of every message, keyed by message number (`LIST`).
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the reply is rejected or malformed.
    pub async fn list(&mut self) -> Result<BTreeMap<u32, u64>> {
        let body = self.request("LIST", true).await?;
        body.lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_scan_line)
            .collect()
    }

    /// Size of one message (`LIST n`).
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if there is no such message.
    pub async fn list_one(&mut self, msgno: u32) -> Result<u64> {
        let rest = self.request(&format!("LIST {msgno}"), false).await?;
        Ok(parse_scan_line(&rest)?.1)
    }

    /// Unique id of every message, keyed by message number (`UIDL`).
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the reply is rejected or malformed.
    pub async fn unique_ids(&mut self) -> Result<BTreeMap<u32, String>> {
        let body = self.request("UIDL", true).await?;
        body.lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_uid_line)
            .collect()
    }

    /// Unique id of one message (`UIDL n`).
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if there is no such message.
    pub async fn unique_id(&mut self, msgno: u32) -> Result<String> {
        let rest = self.request(&format!("UIDL {msgno}"), false).await?;
        Ok(parse_uid_line(&rest)?.1)
    }

    /// Headers plus the first `lines` body lines of a message (`TOP`).
    ///
    /// Negative `lines` is treated as zero. The first rejected TOP
    /// marks the command unsupported for the rest of the session; with
    /// `fallback` the whole message is retrieved instead, and it is not
    /// trimmed to `lines`.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] if TOP is known not to work and
    /// `fallback` is false; the server's [`Error::Protocol`] on the
    /// rejected attempt itself; transport errors unchanged.
    pub async fn top(&mut self, msgno: u32, lines: i64, fallback: bool) -> Result<String> {
        if self.top == TopSupport::Unsupported {
            if fallback {
                return self.retrieve(msgno).await;
            }
            return Err(Error::Unsupported(
                "TOP not supported and no fallback wanted".into(),
            ));
        }

        let lines = lines.max(0);
        match self.request(&format!("TOP {msgno} {lines}"), true).await {
            Ok(message) => {
                self.top = TopSupport::Supported;
                Ok(message)
            }
            Err(Error::Protocol(reason)) => {
                debug!("TOP rejected, marking unsupported: {}", reason);
                self.top = TopSupport::Unsupported;
                if fallback {
                    self.retrieve(msgno).await
                } else {
                    Err(Error::Protocol(reason))
                }
            }
            Err(e) => Err(e),
        }
    }

    /// A complete message (`RETR`).
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if there is no such message.
    pub async fn retrieve(&mut self, msgno: u32) -> Result<String> {
        self.request(&format!("RETR {msgno}"), true).await
    }

    /// Mark a message for deletion at logout (`DELE`).
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the message does not exist or is already
    /// marked.
    pub async fn delete(&mut self, msgno: u32) -> Result<()> {
        self.request(&format!("DELE {msgno}"), false).await?;
        Ok(())
    }

    /// Unmark every message marked for deletion (`RSET`).
    ///
    /// # Errors
    ///
    /// Transport errors only, in practice.
    pub async fn undelete(&mut self) -> Result<()> {
        self.request("RSET", false).await?;
        Ok(())
    }

    /// Keep the connection alive (`NOOP`).
    ///
    /// # Errors
    ///
    /// Transport errors only, in practice.
    pub async fn noop(&mut self) -> Result<()> {
        self.request("NOOP", false).await?;
        Ok(())
    }

    /// Send `QUIT` and close the connection.
    ///
    /// Errors are ignored: the connection is closed whatever the server
    /// answers, and calling this on a closed client is harmless.
    pub async fn logout(&mut self) {
        if self.transport.is_open()
            && !self.in_flight
            && let Err(e) = self.request("QUIT", false).await
        {
            debug!("QUIT failed, closing anyway: {}", e);
        }
        self.close().await;
        debug!("Logged out");
    }

    // -- private helpers --

    async fn handshake(&mut self, security: Security) -> Result<()> {
        self.greeting = self.read_response(false).await?;
        self.timestamp = apop_timestamp(&self.greeting);
        debug!("Server greeting: {}", self.greeting);

        if security == Security::StartTls {
            self.request("STLS", false).await?;
            self.transport.upgrade_to_tls().await?;
        }
        Ok(())
    }

    async fn exchange(&mut self, command: &str, multiline: bool) -> Result<String> {
        self.send_request(command).await?;
        self.read_response(multiline).await
    }

    async fn send_request(&mut self, command: &str) -> Result<()> {
        trace!("C: {}", redact(command));
        self.transport.write_line(command).await
    }

    async fn read_response(&mut self, multiline: bool) -> Result<String> {
        let line = self.transport.read_line().await?;
        let rest = parse_status(line.trim())?.to_string();
        if !multiline {
            return Ok(rest);
        }

        let mut message = String::new();
        loop {
            let line = self.transport.read_line().await?;
            if line == TERMINATOR {
                break;
            }
            message.push_str(unstuff(&line));
            message.push('\n');
        }
        Ok(message)
    }

    async fn close(&mut self) {
        self.transport.close().await;
        self.state = SessionState::Disconnected;
        self.in_flight = false;
    }
}

/// Hide secrets from logged commands.
fn redact(command: &str) -> String {
    let mut words = command.splitn(3, ' ');
    match (words.next(), words.next()) {
        (Some(verb), _) if verb.eq_ignore_ascii_case("PASS") => "PASS ***".to_string(),
        (Some(verb), Some(user)) if verb.eq_ignore_ascii_case("APOP") => {
            format!("APOP {user} ***")
        }
        _ => command.to_string(),
    }
}
