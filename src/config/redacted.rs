use super::BotConfig;

pub struct Redacted<'a>(pub(crate) &'a BotConfig);

impl std::fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = self.0;
        f.debug_struct("BotConfig")
            .field("bot_secret", &mask(&c.bot_secret))
            .field("data_dir", &c.data_dir)
            .field("admin_keyword", &c.admin_keyword)
            .field("reconnect_delay_secs", &c.reconnect_delay.as_secs())
            .field("log_level", &c.log_level)
            .field("log_format", &c.log_format)
            .finish()
    }
}

fn mask(s: &str) -> String {
    match s.get(..3) {
        Some(head) if s.len() > 6 => format!("{head}***"),
        _ => "***".into(),
    }
}
