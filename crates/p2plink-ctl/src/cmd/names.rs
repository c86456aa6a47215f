//! Name discovery and advertisement commands.

use anyhow::Result;
use serde::Serialize;

use super::http::{CommandResponse, base_url, post_json_body};

#[derive(Serialize)]
struct FindRequest<'a> {
    prefix: &'a str,
}

#[derive(Serialize)]
struct AdvertiseRequest<'a> {
    name: &'a str,
    guid: &'a str,
}

pub async fn cmd_find(port: u16, prefix: &str) -> Result<()> {
    let resp: CommandResponse =
        post_json_body(&format!("{}/names/find", base_url(port)), &FindRequest { prefix }).await?;
    resp.report(&format!("find {}", prefix));
    Ok(())
}

pub async fn cmd_cancel_find(port: u16, prefix: &str) -> Result<()> {
    let resp: CommandResponse = post_json_body(
        &format!("{}/names/find/cancel", base_url(port)),
        &FindRequest { prefix },
    )
    .await?;
    resp.report(&format!("cancel find {}", prefix));
    Ok(())
}

pub async fn cmd_advertise(port: u16, name: &str, guid: &str) -> Result<()> {
    let resp: CommandResponse = post_json_body(
        &format!("{}/names/advertise", base_url(port)),
        &AdvertiseRequest { name, guid },
    )
    .await?;
    resp.report(&format!("advertise {}", name));
    Ok(())
}

pub async fn cmd_cancel_advertise(port: u16, name: &str, guid: &str) -> Result<()> {
    let resp: CommandResponse = post_json_body(
        &format!("{}/names/advertise/cancel", base_url(port)),
        &AdvertiseRequest { name, guid },
    )
    .await?;
    resp.report(&format!("cancel advertise {}", name));
    Ok(())
}
