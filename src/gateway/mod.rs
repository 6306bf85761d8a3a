//! Discord gateway session with automatic reconnects.

use crate::config::BotConfig;
use crate::discord;
use anyhow::{Result, bail};

mod connection;
mod handler;

pub use handler::Dispatcher;

use connection::{SessionEnd, gateway_ws_url, run_session};

/// Keeps a gateway session open, reconnecting after `reconnect_delay` whenever
/// it drops. Only returns on conditions a reconnect cannot fix.
pub async fn run_gateway(
    client: &reqwest::Client,
    config: &BotConfig,
    dispatcher: &mut Dispatcher,
) -> Result<()> {
    loop {
        tracing::info!("Connecting to Discord gateway…");

        let session = match discord::fetch_gateway_url(client, &config.bot_secret).await {
            Ok(base) => match gateway_ws_url(&base) {
                Ok(url) => run_session(dispatcher, &config.bot_secret, &url).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match session {
            Ok(SessionEnd::Reconnect) => {}
            Ok(SessionEnd::Fatal(reason)) => bail!("Discord refused the session: {reason}"),
            Err(e) => tracing::error!(error = ?e, "Gateway session failed"),
        }

        tracing::info!(
            "Gateway connection lost. Reconnecting in {} seconds…",
            config.reconnect_delay.as_secs()
        );
        tokio::time::sleep(config.reconnect_delay).await;
    }
}
