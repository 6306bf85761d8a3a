mod bot_config;
mod env_parsing;
mod log_format;
mod redacted;

pub use bot_config::BotConfig;
pub use log_format::LogFormat;
pub use redacted::Redacted;
