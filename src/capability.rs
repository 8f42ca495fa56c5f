//! POP3 capabilities
//!
//! Typed reading of the lines returned by `CAPA` (RFC 2449). Unknown
//! tags are kept verbatim in [`Capability::Other`].

use std::fmt;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// One capability advertised by the server.
///
/// # Examples
///
/// ```
/// use pop3_client::Capability;
///
/// assert_eq!(Capability::parse("TOP"), Capability::Top);
/// assert_eq!(
///     Capability::parse("SASL PLAIN CRAM-MD5"),
///     Capability::Sasl(vec!["PLAIN".into(), "CRAM-MD5".into()])
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// The TOP command works.
    Top,
    /// USER/PASS login is allowed.
    User,
    /// SASL mechanisms accepted by `AUTH`.
    Sasl(Vec<String>),
    /// Extended response codes (RFC 2449 section 8).
    RespCodes,
    /// Minimum delay between logins.
    LoginDelay(Duration),
    /// The server accepts pipelined commands (RFC 2197).
    Pipelining,
    /// How long messages are kept; `None` means never expire.
    Expire(Option<Duration>),
    /// The UIDL command works.
    Uidl,
    /// Free-form server implementation string.
    Implementation(String),
    /// The STLS command works (RFC 2595).
    Stls,
    /// Anything not listed above, kept as sent.
    Other(String),
}

impl Capability {
    /// Interpret a single `CAPA` line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (tag, args) = line.split_once(' ').unwrap_or((line, ""));
        let args = args.trim();

        match tag.to_ascii_uppercase().as_str() {
            "TOP" => Self::Top,
            "USER" => Self::User,
            "SASL" => Self::Sasl(args.split_whitespace().map(str::to_string).collect()),
            "RESP-CODES" => Self::RespCodes,
            "LOGIN-DELAY" => args
                .split_whitespace()
                .next()
                .and_then(|secs| secs.parse().ok())
                .map_or_else(
                    || Self::Other(line.to_string()),
                    |secs| Self::LoginDelay(Duration::from_secs(secs)),
                ),
            "PIPELINING" => Self::Pipelining,
            "EXPIRE" => parse_expire(args).unwrap_or_else(|| Self::Other(line.to_string())),
            "UIDL" => Self::Uidl,
            "IMPLEMENTATION" => Self::Implementation(args.to_string()),
            "STLS" => Self::Stls,
            _ => Self::Other(line.to_string()),
        }
    }
}

fn parse_expire(args: &str) -> Option<Capability> {
    let value = args.split_whitespace().next()?;
    if value.eq_ignore_ascii_case("NEVER") {
        return Some(Capability::Expire(None));
    }
    let days: u64 = value.parse().ok()?;
    let secs = days.checked_mul(SECONDS_PER_DAY)?;
    Some(Capability::Expire(Some(Duration::from_secs(secs))))
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => f.write_str("TOP"),
            Self::User => f.write_str("USER"),
            Self::Sasl(mechs) => write!(f, "SASL {}", mechs.join(" ")),
            Self::RespCodes => f.write_str("RESP-CODES"),
            Self::LoginDelay(delay) => write!(f, "LOGIN-DELAY {}", delay.as_secs()),
            Self::Pipelining => f.write_str("PIPELINING"),
            Self::Expire(None) => f.write_str("EXPIRE NEVER"),
            Self::Expire(Some(keep)) => write!(f, "EXPIRE {}", keep.as_secs() / SECONDS_PER_DAY),
            Self::Uidl => f.write_str("UIDL"),
            Self::Implementation(text) => write!(f, "IMPLEMENTATION {text}"),
            Self::Stls => f.write_str("STLS"),
            Self::Other(line) => f.write_str(line),
        }
    }
}
