//! Discord REST API (types + HTTP).

pub mod permissions;

use anyhow::{Context, Result};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_BASE: &str = "https://discord.com/api/v10";

/// REST calls run inline with the gateway loop, so each one must finish well
/// inside a heartbeat interval.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest message content Discord accepts.
pub const MESSAGE_LIMIT: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// `MESSAGE_CREATE` dispatch payload (the parts we use).
#[derive(Debug, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author: User,
    pub member: Option<Member>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct Ready {
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Role {
    pub id: String,
    /// Permission bit set, serialized by Discord as a decimal string.
    pub permissions: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Guild {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
struct GatewayBot {
    url: String,
}

#[derive(Debug, Serialize)]
struct NewMessage<'a> {
    content: &'a str,
}

fn bot_auth(token: &str) -> String {
    format!("Bot {}", token)
}

pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Websocket URL to open the gateway session on.
pub async fn fetch_gateway_url(client: &reqwest::Client, token: &str) -> Result<String> {
    let url = format!("{}/gateway/bot", API_BASE);

    let resp = client
        .get(&url)
        .header(AUTHORIZATION, bot_auth(token))
        .send()
        .await
        .context("Discord gateway lookup failed")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("Discord gateway lookup error {}: {}", status, text);
    }

    let info: GatewayBot = resp.json().await.context("parse gateway info")?;
    Ok(info.url)
}

pub async fn fetch_guild(client: &reqwest::Client, token: &str, guild_id: &str) -> Result<Guild> {
    let url = format!("{}/guilds/{}", API_BASE, guild_id);

    let resp = client
        .get(&url)
        .header(AUTHORIZATION, bot_auth(token))
        .send()
        .await
        .context("Discord guild request failed")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("Discord guild error {}: {}", status, text);
    }

    let guild: Guild = resp.json().await.context("parse guild")?;
    Ok(guild)
}

/// Posts `content` to a channel, one message per chunk when it runs past
/// [`MESSAGE_LIMIT`].
pub async fn post_message(
    client: &reqwest::Client,
    token: &str,
    channel_id: &str,
    content: &str,
) -> Result<()> {
    let url = format!("{}/channels/{}/messages", API_BASE, channel_id);

    for chunk in crate::util::split_message(content, MESSAGE_LIMIT) {
        let resp = client
            .post(&url)
            .header(AUTHORIZATION, bot_auth(token))
            .json(&NewMessage { content: &chunk })
            .send()
            .await
            .context("Discord post message failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Discord post error {}: {}", status, text);
        }
    }

    Ok(())
}
