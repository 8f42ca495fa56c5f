#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for inspecting a POP3 mailbox

use clap::{Parser, Subcommand};
use pop3_client::{Pop3Client, Pop3Config};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pop3-cli")]
#[command(about = "Inspect a POP3 mailbox (server and credentials from POP3_* variables)")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show message count and mailbox size
    Stat,

    /// Show message sizes
    List {
        /// Only this message
        msgno: Option<u32>,
    },

    /// Show unique ids
    Uidl {
        /// Only this message
        msgno: Option<u32>,
    },

    /// Show the headers and first lines of a message
    Top {
        /// Message number
        msgno: u32,

        /// Number of body lines
        #[arg(long, default_value = "0")]
        lines: i64,

        /// Retrieve the whole message if TOP is not supported
        #[arg(long)]
        fallback: bool,
    },

    /// Print a complete message
    Retr {
        /// Message number
        msgno: u32,
    },

    /// Delete messages
    Dele {
        /// Message numbers
        #[arg(required = true)]
        msgnos: Vec<u32>,
    },

    /// List server capabilities
    Capa,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Pop3Config::from_env()?;
    let mut client = Pop3Client::open(&config).await?;

    let result = run(&mut client, &args).await;
    client.logout().await;
    result
}

async fn run(client: &mut Pop3Client, args: &Args) -> anyhow::Result<()> {
    match &args.command {
        Command::Stat => {
            let stat = client.status().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&stat)?);
            } else {
                println!("{} message(s), {} octets", stat.messages, stat.octets);
            }
        }
        Command::List { msgno: Some(msgno) } => {
            let size = client.list_one(*msgno).await?;
            print_listing(args, &BTreeMap::from([(*msgno, size)]))?;
        }
        Command::List { msgno: None } => {
            let sizes = client.list().await?;
            print_listing(args, &sizes)?;
        }
        Command::Uidl { msgno: Some(msgno) } => {
            let uid = client.unique_id(*msgno).await?;
            print_listing(args, &BTreeMap::from([(*msgno, uid)]))?;
        }
        Command::Uidl { msgno: None } => {
            let uids = client.unique_ids().await?;
            print_listing(args, &uids)?;
        }
        Command::Top {
            msgno,
            lines,
            fallback,
        } => {
            let text = client.top(*msgno, *lines, *fallback).await?;
            print_message(args, *msgno, &text)?;
        }
        Command::Retr { msgno } => {
            let text = client.retrieve(*msgno).await?;
            print_message(args, *msgno, &text)?;
        }
        Command::Dele { msgnos } => {
            for msgno in msgnos {
                client.delete(*msgno).await?;
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(msgnos)?);
            } else {
                println!("{} message(s) deleted", msgnos.len());
            }
        }
        Command::Capa => {
            let caps = client.capabilities().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&caps)?);
            } else {
                for cap in &caps {
                    println!("{cap}");
                }
            }
        }
    }

    Ok(())
}

fn print_listing<V: Display + serde::Serialize>(
    args: &Args,
    entries: &BTreeMap<u32, V>,
) -> anyhow::Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No messages.");
        return Ok(());
    }

    for (msgno, value) in entries {
        println!("{msgno:<8} {value}");
    }
    println!("\n{} message(s)", entries.len());
    Ok(())
}

fn print_message(args: &Args, msgno: u32, text: &str) -> anyhow::Result<()> {
    if args.json {
        let value = serde_json::json!({ "msgno": msgno, "text": text });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{text}");
    }
    Ok(())
}
