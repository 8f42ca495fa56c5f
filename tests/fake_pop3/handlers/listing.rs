//! STAT, LIST and UIDL handlers.
//!
//! All three skip messages marked deleted in the current session.

use super::{Session, live_message, live_messages};
use crate::fake_pop3::io::{write_line, write_multiline};
use crate::fake_pop3::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle `STAT`: `+OK count octets`.
pub async fn handle_stat<S: AsyncRead + AsyncWrite + Unpin>(
    mailbox: &Mailbox,
    session: &Session,
    stream: &mut BufReader<S>,
) {
    let live = live_messages(mailbox, session);
    let octets: usize = live
        .iter()
        .filter_map(|n| mailbox.get(*n))
        .map(|m| m.size())
        .sum();
    let _ = write_line(stream, &format!("+OK {} {octets}", live.len())).await;
}

/// Handle `LIST [n]`.
pub async fn handle_list<S: AsyncRead + AsyncWrite + Unpin>(
    args: Option<&str>,
    mailbox: &Mailbox,
    session: &Session,
    stream: &mut BufReader<S>,
) {
    listing(args, mailbox, session, stream, |n| {
        mailbox.get(n).map(|m| m.size().to_string())
    })
    .await;
}

/// Handle `UIDL [n]`.
pub async fn handle_uidl<S: AsyncRead + AsyncWrite + Unpin>(
    args: Option<&str>,
    mailbox: &Mailbox,
    session: &Session,
    stream: &mut BufReader<S>,
) {
    listing(args, mailbox, session, stream, |n| {
        mailbox.get(n).map(|m| m.uid.clone())
    })
    .await;
}

/// Shared shape of LIST and UIDL: one `+OK n value` line for an
/// argument, otherwise a multi-line `n value` listing.
async fn listing<S, F>(
    args: Option<&str>,
    mailbox: &Mailbox,
    session: &Session,
    stream: &mut BufReader<S>,
    value: F,
) where
    S: AsyncRead + AsyncWrite + Unpin,
    F: Fn(usize) -> Option<String>,
{
    if args.is_some() {
        let line = live_message(args, mailbox, session)
            .and_then(|n| value(n).map(|v| format!("+OK {n} {v}")))
            .unwrap_or_else(|| "-ERR no such message".to_string());
        let _ = write_line(stream, &line).await;
        return;
    }

    let entries: Vec<String> = live_messages(mailbox, session)
        .into_iter()
        .filter_map(|n| value(n).map(|v| format!("{n} {v}")))
        .collect();
    let lines: Vec<&str> = entries.iter().map(String::as_str).collect();
    let _ = write_multiline(stream, "+OK listing follows", &lines).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_pop3::MailboxBuilder;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn stat_skips_deleted() {
        let mailbox = MailboxBuilder::new()
            .message("a", "12345\r\n")
            .message("b", "123\r\n")
            .build();
        let mut session = Session::default();
        session.deleted.insert(1);

        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);
        handle_stat(&mailbox, &session, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "+OK 1 5\r\n");
    }
}
