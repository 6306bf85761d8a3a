use crate::config::env_parsing::{self, Lookup};
use crate::config::{LogFormat, Redacted};
use anyhow::{Result, bail};
use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_ADMIN_KEYWORD: &str = "!quippy";

#[derive(Clone, Debug)]
pub struct BotConfig {
    // --- required ---
    pub bot_secret: String,

    // --- optional (with defaults) ---
    pub data_dir: PathBuf,
    /// Literal token every admin command starts with.
    pub admin_keyword: String,
    pub reconnect_delay: Duration,

    pub log_level: String,
    pub log_format: LogFormat,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(env: &impl Lookup) -> Result<Self> {
        let bot_secret = env_parsing::must(env, "BOT_SECRET")?;

        let data_dir = env_parsing::opt(env, "BOT_DATA_DIR").unwrap_or_else(|| "data".into());
        let admin_keyword = env_parsing::opt(env, "BOT_ADMIN_KEYWORD")
            .unwrap_or_else(|| DEFAULT_ADMIN_KEYWORD.into());
        if admin_keyword.chars().any(char::is_whitespace) {
            bail!("BOT_ADMIN_KEYWORD must be a single token, got '{admin_keyword}'");
        }

        let reconnect_delay_secs: u64 = env_parsing::parse(env, "BOT_RECONNECT_DELAY_SECS", 5)?;

        let log_level = env_parsing::opt(env, "BOT_LOG_LEVEL").unwrap_or_else(|| "info".into());
        let log_format: LogFormat = env_parsing::parse(env, "BOT_LOG_FORMAT", LogFormat::Pretty)?;

        Ok(Self {
            bot_secret,
            data_dir: PathBuf::from(data_dir),
            admin_keyword,
            reconnect_delay: Duration::from_secs(reconnect_delay_secs),
            log_level,
            log_format,
        })
    }

    pub fn redacted(&self) -> Redacted<'_> {
        Redacted(self)
    }
}
