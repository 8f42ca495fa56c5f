//! POP3 connection configuration

use crate::error::{Error, Result};
use crate::security::Security;
use std::env;
use std::time::Duration;

/// Default I/O timeout for connecting and for each read or write.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// POP3 connection configuration
#[derive(Debug, Clone)]
pub struct Pop3Config {
    pub host: String,
    /// `None` picks the default port for `security`.
    pub port: Option<u16>,
    pub security: Security,
    pub timeout: Duration,
    pub username: String,
    pub password: String,
    /// Try APOP before USER/PASS when the greeting offers a timestamp.
    pub try_apop: bool,
    /// Skip certificate verification (self-signed local servers).
    pub accept_invalid_certs: bool,
}

impl Pop3Config {
    /// Configuration with defaults for everything but the server and
    /// credentials.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            timeout: DEFAULT_TIMEOUT,
            username: username.into(),
            password: password.into(),
            try_apop: true,
            accept_invalid_certs: false,
        }
    }

    /// The port to connect to, falling back to the security mode's
    /// conventional port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.security.default_port())
    }

    /// Load POP3 configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `POP3_USERNAME`
    /// - `POP3_PASSWORD`
    ///
    /// Optional (with defaults):
    /// - `POP3_HOST` (default: `127.0.0.1`)
    /// - `POP3_PORT` (default: 110, or 995 for implicit TLS)
    /// - `POP3_SECURITY` (default: `plain`; also `tls`, `starttls`)
    /// - `POP3_TIMEOUT` in seconds (default: `30`)
    /// - `POP3_APOP` (default: `true`)
    /// - `POP3_ACCEPT_INVALID_CERTS` (default: `false`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port = match env::var("POP3_PORT") {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|e| Error::Config(format!("Invalid POP3_PORT: {e}")))?,
            ),
            Err(_) => None,
        };

        let timeout = match env::var("POP3_TIMEOUT") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .map_err(|e| Error::Config(format!("Invalid POP3_TIMEOUT: {e}")))?,
            ),
            Err(_) => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            host: env::var("POP3_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            security: env::var("POP3_SECURITY")
                .unwrap_or_default()
                .parse()?,
            timeout,
            username: env::var("POP3_USERNAME")
                .map_err(|_| Error::Config("POP3_USERNAME not set".into()))?,
            password: env::var("POP3_PASSWORD")
                .map_err(|_| Error::Config("POP3_PASSWORD not set".into()))?,
            try_apop: env_flag("POP3_APOP", true)?,
            accept_invalid_certs: env_flag("POP3_ACCEPT_INVALID_CERTS", false)?,
        })
    }
}

fn env_flag(name: &str, default: bool) -> Result<bool> {
    env::var(name).map_or(Ok(default), |raw| parse_flag(&raw).ok_or_else(|| {
        Error::Config(format!("Invalid {name}: expected true or false, got '{raw}'"))
    }))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
