//! POP3 transport session
//!
//! Owns the socket (plain TCP or TLS over TCP) and provides the
//! line-level `write_line()` and `read_line()` primitives used by
//! `Pop3Client`, plus the in-place STLS upgrade.

use crate::config::Pop3Config;
use crate::error::{Error, Result};
use crate::security::Security;
use rustls::RootCertStore;
use rustls::crypto::{CryptoProvider, ring};
use rustls::pki_types::ServerName;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::{debug, trace, warn};

/// Longest line accepted from the server, terminator included.
const MAX_LINE_LENGTH: u64 = 64 * 1024;

/// The byte stream under the session, before or after TLS.
enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Self::Tls(s) => Pin::new(&mut **s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Self::Tls(s) => Pin::new(&mut **s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_flush(cx),
            Self::Tls(s) => Pin::new(&mut **s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Self::Tls(s) => Pin::new(&mut **s).poll_shutdown(cx),
        }
    }
}

/// A single connection to a POP3 server.
///
/// `None` in `stream` means closed: every read or write fails without
/// touching the network.
pub struct Transport {
    stream: Option<BufReader<Stream>>,
    host: String,
    timeout: Duration,
    accept_invalid_certs: bool,
}

impl Transport {
    /// Open a connection as described by `config`.
    ///
    /// Connects via TCP within `config.timeout`. For
    /// [`Security::Tls`] the TLS handshake follows immediately;
    /// [`Security::StartTls`] is left to the caller, which must issue
    /// `STLS` first and then call [`Transport::upgrade_to_tls`].
    pub async fn open(config: &Pop3Config) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port());
        debug!("Opening {} connection to {}", config.security, addr);

        let tcp = timeout(config.timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                Error::Connect(format!(
                    "{addr}: timed out after {}s",
                    config.timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::Connect(format!("{addr}: {e}")))?;

        let mut transport = Self {
            stream: None,
            host: config.host.clone(),
            timeout: config.timeout,
            accept_invalid_certs: config.accept_invalid_certs,
        };

        let stream = if config.security == Security::Tls {
            Stream::Tls(Box::new(transport.handshake(tcp).await?))
        } else {
            Stream::Plain(tcp)
        };
        transport.stream = Some(BufReader::new(stream));
        Ok(transport)
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        matches!(
            self.stream.as_ref().map(BufReader::get_ref),
            Some(Stream::Tls(_))
        )
    }

    /// Write `line` followed by CRLF and flush.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let limit = self.timeout;
        let reader = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::Send("connection closed".into()))?;

        let mut data = Vec::with_capacity(line.len() + 2);
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(b"\r\n");

        let stream = reader.get_mut();
        timeout(limit, async {
            stream.write_all(&data).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| Error::Send(format!("timed out after {}s", limit.as_secs())))?
        .map_err(|e| Error::Send(e.to_string()))
    }

    /// Read the next line, without its CRLF (or bare LF) terminator.
    ///
    /// A line that does not end within 64 KiB is a receive error.
    /// Invalid UTF-8 is replaced rather than rejected, since message
    /// bodies are not guaranteed to be UTF-8.
    pub async fn read_line(&mut self) -> Result<String> {
        let limit = self.timeout;
        let reader = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::Receive("connection closed".into()))?;

        let mut buf = Vec::new();
        let mut bounded = AsyncReadExt::take(&mut *reader, MAX_LINE_LENGTH);
        let read = timeout(limit, bounded.read_until(b'\n', &mut buf))
            .await
            .map_err(|_| Error::Receive(format!("timed out after {}s", limit.as_secs())))?
            .map_err(|e| Error::Receive(e.to_string()))?;

        if read == 0 {
            return Err(Error::Receive("connection closed by server".into()));
        }
        if buf.last() != Some(&b'\n') && bounded.limit() == 0 {
            return Err(Error::Receive(format!(
                "line longer than {MAX_LINE_LENGTH} bytes"
            )));
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }

        let line = String::from_utf8_lossy(&buf).into_owned();
        trace!("S: {}", line);
        Ok(line)
    }

    /// Run the TLS handshake over the open plain connection.
    ///
    /// On failure the connection is closed. Upgrading a session that is
    /// already encrypted is refused and leaves it untouched.
    pub async fn upgrade_to_tls(&mut self) -> Result<()> {
        if self.is_encrypted() {
            return Err(Error::Tls("connection is already encrypted".into()));
        }

        let reader = self
            .stream
            .take()
            .ok_or_else(|| Error::Tls("connection closed".into()))?;

        // Plaintext read ahead of the handshake would otherwise be
        // treated as if it came over TLS.
        if !reader.buffer().is_empty() {
            return Err(Error::Tls(
                "server sent data before the TLS handshake".into(),
            ));
        }

        let Stream::Plain(tcp) = reader.into_inner() else {
            return Err(Error::Tls("connection is already encrypted".into()));
        };

        let tls = self.handshake(tcp).await?;
        self.stream = Some(BufReader::new(Stream::Tls(Box::new(tls))));
        debug!("Connection to {} upgraded to TLS", self.host);
        Ok(())
    }

    /// Shut the connection down. Does nothing if already closed.
    pub async fn close(&mut self) {
        if let Some(mut reader) = self.stream.take() {
            match timeout(self.timeout, reader.get_mut().shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Error while closing connection: {}", e),
                Err(_) => debug!("Timed out while closing connection"),
            }
        }
    }

    async fn handshake(&self, tcp: TcpStream) -> Result<TlsStream<TcpStream>> {
        let connector = tls_connector(self.accept_invalid_certs)?;
        let server_name = ServerName::try_from(self.host.clone())
            .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

        timeout(self.timeout, connector.connect(server_name, tcp))
            .await
            .map_err(|_| {
                Error::Tls(format!(
                    "handshake timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::Tls(e.to_string()))
    }
}

/// Build a TLS connector on the ring provider.
///
/// Certificates are checked against the Mozilla root set unless
/// `accept_invalid_certs` is set.
fn tls_connector(accept_invalid_certs: bool) -> Result<TlsConnector> {
    let provider = Arc::new(ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(e.to_string()))?;

    let config = if accept_invalid_certs {
        warn!("TLS certificate verification disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
            .with_no_client_auth()
    } else {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Certificate verifier that trusts any certificate chain but still
/// checks handshake signatures (for self-signed servers).
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &rustls::pki_types::CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &rustls::pki_types::CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
