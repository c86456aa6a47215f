//! Link commands.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{CommandResponse, base_url, delete_json, get_json, post_json_body};

#[derive(Serialize)]
struct EstablishLinkRequest<'a> {
    device: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_owner_intent: Option<u8>,
}

#[derive(Deserialize)]
struct EstablishLinkResponse {
    handle: Option<i32>,
    #[serde(flatten)]
    result: CommandResponse,
}

#[derive(Deserialize)]
struct InterfaceResponse {
    handle: i32,
    interface: Option<String>,
}

pub async fn cmd_link(port: u16, device: &str, intent: Option<u8>) -> Result<()> {
    let req = EstablishLinkRequest {
        device,
        group_owner_intent: intent,
    };
    let resp: EstablishLinkResponse =
        post_json_body(&format!("{}/links", base_url(port)), &req).await?;

    match resp.handle {
        Some(handle) => {
            println!("✓ Link to {} requested, handle {}", device, handle);
            println!("  Watch `p2plink-ctl events` for link_established or link_error.");
        }
        None => resp.result.report(&format!("link to {}", device)),
    }
    Ok(())
}

pub async fn cmd_release(port: u16, handle: i32) -> Result<()> {
    let resp: CommandResponse =
        delete_json(&format!("{}/links/{}", base_url(port), handle)).await?;
    resp.report(&format!("release link {}", handle));
    Ok(())
}

pub async fn cmd_iface(port: u16, handle: i32) -> Result<()> {
    let resp: InterfaceResponse =
        get_json(&format!("{}/links/{}/interface", base_url(port), handle)).await?;
    match resp.interface {
        Some(name) => println!("{}", name),
        None => println!("No interface for handle {}.", resp.handle),
    }
    Ok(())
}
