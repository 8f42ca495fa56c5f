//! Fake POP3 server for integration testing
//!
//! This module provides an in-process POP3 server that speaks enough
//! of the protocol to test `Pop3Client` end-to-end:
//!
//! TCP -> greeting -> [STLS -> TLS handshake] -> APOP/USER/PASS -> commands -> QUIT
//!
//! ## Module layout
//!
//! - `server` -- TCP listener, TLS setup, and the command loop
//! - `handlers/` -- one file per group of POP3 commands
//! - `mailbox` -- test data model (messages, server options, builder)
//! - `io` -- shared write helpers, including dot-stuffing

mod io;
pub mod mailbox;

pub use mailbox::MailboxBuilder;
pub use server::FakePop3Server;
