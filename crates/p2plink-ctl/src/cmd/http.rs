//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api", port)
}

fn connect_error(url: &str) -> String {
    format!("failed to connect to p2plinkd at {}, is it running?", url)
}

async fn parse<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if status.is_client_error() || status.is_server_error() {
        let text = resp.text().await.unwrap_or_default();
        bail!("request rejected ({}): {}", status, text);
    }
    resp.json::<T>().await.context("failed to parse response")
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::get(url)
        .await
        .with_context(|| connect_error(url))?;
    parse(resp).await
}

pub async fn post_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::Client::new()
        .post(url)
        .send()
        .await
        .with_context(|| connect_error(url))?;
    parse(resp).await
}

pub async fn post_json_body<T, R>(url: &str, body: &T) -> Result<R>
where
    T: Serialize,
    R: for<'de> Deserialize<'de>,
{
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| connect_error(url))?;
    parse(resp).await
}

pub async fn delete_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::Client::new()
        .delete(url)
        .send()
        .await
        .with_context(|| connect_error(url))?;
    parse(resp).await
}

/// Result of a coordinator command.
#[derive(Deserialize)]
pub struct CommandResponse {
    pub status: i32,
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn report(&self, what: &str) {
        if self.status == 0 {
            println!("✓ {}", what);
        } else {
            let name = self.error.as_deref().unwrap_or("unknown status");
            println!("✗ {} failed: {} ({:#x})", what, name, self.status.unsigned_abs());
        }
    }
}
