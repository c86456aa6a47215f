//! p2plink-ctl: command-line interface for the p2plinkd daemon.

use anyhow::{Context, Result};

mod cmd;

const DEFAULT_PORT: u16 = 9101;

fn print_usage() {
    println!("Usage: p2plink-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status                          Show link, discovery and advertisement state");
    println!("  events [since]                  Show daemon events from sequence number");
    println!("  find <prefix>                   Discover names starting with prefix");
    println!("  cancel-find <prefix>            Stop discovering a prefix");
    println!("  advertise <name> [guid]         Advertise a well-known name");
    println!("  cancel-advertise <name> [guid]  Withdraw an advertised name");
    println!("  link <device> [intent]          Connect to a peer device (intent 0-15)");
    println!("  release <handle>                Tear down a link");
    println!("  iface <handle>                  Show the network interface of a link");
    println!("  shutdown                        Stop the daemon");
    println!();
    println!("Options:");
    println!(
        "  --port <port>   API port (default: $P2PLINK_API__PORT or {})",
        DEFAULT_PORT
    );
}

fn default_port() -> u16 {
    std::env::var("P2PLINK_API__PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

fn parse_handle(value: &str) -> Result<i32> {
    value.parse().context("handle must be a number")
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = default_port();
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd::status::cmd_status(port).await,
        ["events"] => cmd::status::cmd_events(port, 0).await,
        ["events", since] => {
            let since = since.parse().context("since must be a number")?;
            cmd::status::cmd_events(port, since).await
        }
        ["find", prefix] => cmd::names::cmd_find(port, prefix).await,
        ["cancel-find", prefix] => cmd::names::cmd_cancel_find(port, prefix).await,
        ["advertise", name] => cmd::names::cmd_advertise(port, name, "").await,
        ["advertise", name, guid] => cmd::names::cmd_advertise(port, name, guid).await,
        ["cancel-advertise", name] => cmd::names::cmd_cancel_advertise(port, name, "").await,
        ["cancel-advertise", name, guid] => {
            cmd::names::cmd_cancel_advertise(port, name, guid).await
        }
        ["link", device] => cmd::links::cmd_link(port, device, None).await,
        ["link", device, intent] => {
            let intent = intent.parse().context("intent must be 0-15")?;
            cmd::links::cmd_link(port, device, Some(intent)).await
        }
        ["release", handle] => cmd::links::cmd_release(port, parse_handle(handle)?).await,
        ["iface", handle] => cmd::links::cmd_iface(port, parse_handle(handle)?).await,
        ["shutdown"] => cmd::status::cmd_shutdown(port).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
