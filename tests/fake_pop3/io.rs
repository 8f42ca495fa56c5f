//! Shared I/O helpers for the fake POP3 server.
//!
//! These are thin wrappers around `AsyncWriteExt` that flush after
//! every write, which keeps the test server simple and deterministic.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Write a single response line, adding CRLF, and flush.
pub async fn write_line<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    line: &str,
) -> std::io::Result<()> {
    let stream = stream.get_mut();
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await
}

/// Write a multi-line response: the status line, each body line with a
/// leading dot doubled (RFC 1939 section 3), then the `.` terminator.
pub async fn write_multiline<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    status: &str,
    lines: &[&str],
) -> std::io::Result<()> {
    let mut out = String::new();
    out.push_str(status);
    out.push_str("\r\n");
    for line in lines {
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }
    out.push_str(".\r\n");

    let stream = stream.get_mut();
    stream.write_all(out.as_bytes()).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn multiline_doubles_leading_dots() {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        write_multiline(&mut stream, "+OK", &["line1", ".escaped", ""])
            .await
            .unwrap();
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "+OK\r\nline1\r\n..escaped\r\n\r\n.\r\n"
        );
    }
}
