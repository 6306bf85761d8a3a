mod command;
mod config;
mod discord;
mod gateway;
mod keyword_store;
mod logging;
mod selector;
mod state;
mod util;

use crate::command::CommandRouter;
use crate::gateway::Dispatcher;
use crate::keyword_store::KeywordStore;
use crate::state::Session;
use anyhow::Result;
use config::{BotConfig, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging("info", LogFormat::Pretty);
            tracing::error!("{:#}. Please fix the configuration and restart.", e);
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.log_level, config.log_format);
    tracing::info!("config = {:?}", config.redacted());

    // 1. keywords from the data directory
    let mut store = KeywordStore::new(&config.data_dir);
    if let Err(e) = store.reload().await {
        tracing::error!(error = %e, "Failed to load keywords, starting with none");
    }

    // 2. gateway session until Ctrl-C
    let client = match discord::build_client(discord::REQUEST_TIMEOUT) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    };
    let router = CommandRouter::new(config.admin_keyword.clone());
    let mut dispatcher =
        Dispatcher::new(client.clone(), config.bot_secret.clone(), router, store, Session::new());

    tracing::info!("Starting Quippy v{}…", env!("CARGO_PKG_VERSION"));

    tokio::select! {
        res = gateway::run_gateway(&client, &config, &mut dispatcher) => {
            if let Err(e) = res {
                tracing::error!("{:#}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
