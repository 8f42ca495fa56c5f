//! CAPA handler (RFC 2449).
//!
//! Advertises TOP only when the mailbox supports it and STLS only
//! before the connection has been upgraded.

use crate::fake_pop3::io::write_multiline;
use crate::fake_pop3::mailbox::{Mailbox, TlsMode};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the CAPA command.
pub async fn handle_capa<S: AsyncRead + AsyncWrite + Unpin>(
    mailbox: &Mailbox,
    encrypted: bool,
    stream: &mut BufReader<S>,
) {
    let mut lines = vec!["USER", "UIDL"];
    if mailbox.supports_top {
        lines.push("TOP");
    }
    if mailbox.tls == TlsMode::StartTls && !encrypted {
        lines.push("STLS");
    }
    lines.push("IMPLEMENTATION fake-pop3");

    let _ = write_multiline(stream, "+OK Capability list follows", &lines).await;
}
