//! Status, event and daemon commands.

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

use super::http::{base_url, get_json, post_json};

#[derive(Deserialize)]
struct StatusResponse {
    enabled: bool,
    started: bool,
    peer_state: String,
    find_state: String,
    initiator: bool,
    pending_connect: bool,
    target_device: Option<String>,
    target_handle: Option<i32>,
    group_owner: Option<String>,
    interface: Option<String>,
    this_device: Option<String>,
    requested_names: Vec<String>,
    service_requests: usize,
    advertised_names: Vec<String>,
    discovered_devices: usize,
    discovered_services: usize,
    known_peers: usize,
    pending_withdrawals: usize,
}

#[derive(Deserialize)]
struct EventsResponse {
    events: Vec<Value>,
    next: u64,
}

#[derive(Deserialize)]
struct ShutdownResponse {
    message: String,
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  P2P Link Manager Status");
    println!("═══════════════════════════════════════");
    println!("  Enabled          : {}", resp.enabled);
    println!("  Started          : {}", resp.started);
    println!("  This device      : {}", or_dash(&resp.this_device));
    println!("  Peer state       : {}", resp.peer_state);
    println!("  Find state       : {}", resp.find_state);
    println!("  Known peers      : {}", resp.known_peers);

    println!("\n  Link:");
    println!("  ┌─ target    : {}", or_dash(&resp.target_device));
    match resp.target_handle {
        Some(handle) => println!("  │  handle    : {}", handle),
        None => println!("  │  handle    : -"),
    }
    println!("  │  initiator : {}", resp.initiator);
    println!("  │  pending   : {}", resp.pending_connect);
    println!("  │  owner     : {}", or_dash(&resp.group_owner));
    println!("  └─ interface : {}", or_dash(&resp.interface));

    println!("\n  Discovery:");
    if resp.requested_names.is_empty() {
        println!("  No name prefixes requested.");
    } else {
        for name in &resp.requested_names {
            println!("  ? {}", name);
        }
    }
    println!(
        "  {} service requests, {} services on {} devices",
        resp.service_requests, resp.discovered_services, resp.discovered_devices
    );

    println!("\n  Advertising:");
    if resp.advertised_names.is_empty() {
        println!("  No advertised names.");
    } else {
        for name in &resp.advertised_names {
            println!("  + {}", name);
        }
    }
    if resp.pending_withdrawals > 0 {
        println!("  {} withdrawals pending", resp.pending_withdrawals);
    }

    Ok(())
}

pub async fn cmd_events(port: u16, since: u64) -> Result<()> {
    let resp: EventsResponse =
        get_json(&format!("{}/events?since={}", base_url(port), since)).await?;

    if resp.events.is_empty() {
        println!("No events since {}.", since);
        return Ok(());
    }

    for event in &resp.events {
        let seq = event["seq"].as_u64().unwrap_or_default();
        let kind = event["event"].as_str().unwrap_or("?");
        let detail = match kind {
            "found_advertised_name" | "lost_advertised_name" => format!(
                "{} on {}",
                event["name"].as_str().unwrap_or("?"),
                event["device"].as_str().unwrap_or("?")
            ),
            "link_established" => format!(
                "handle {} on {}",
                event["handle"],
                event["interface_name"].as_str().unwrap_or("?")
            ),
            "link_error" => format!(
                "handle {} error {:#x}",
                event["handle"],
                event["error"].as_i64().unwrap_or_default().unsigned_abs()
            ),
            _ => format!("handle {}", event["handle"]),
        };
        println!("  {:>5}  {:<22} {}", seq, kind, detail);
    }
    println!("\n  Next: p2plink-ctl events {}", resp.next);

    Ok(())
}

pub async fn cmd_shutdown(port: u16) -> Result<()> {
    let resp: ShutdownResponse =
        post_json(&format!("{}/daemon/shutdown", base_url(port))).await?;
    println!("{}", resp.message);
    Ok(())
}
