use anyhow::Result;
use std::env;

/// Bot configuration loaded from environment variables.
pub struct BotConfig {
    pub bot_token: String,
    pub database_url: String,
    pub log_file: String,
    /// When set, only this user may talk to the bot.
    pub admin_id: Option<i64>,
    /// Optional Telegram Bot API base URL (point at a mock server in
    /// tests). Env: `TELEGRAM_API_URL` or `TELOXIDE_API_URL`.
    pub telegram_api_url: Option<String>,
}

impl BotConfig {
    /// Loads configuration from environment variables. A token passed in
    /// takes precedence over `BOT_TOKEN`.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN")
                .map_err(|_| anyhow::anyhow!("BOT_TOKEN not set"))?,
        };
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://tgbase.db".to_string());
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/tgbase.log".to_string());
        let admin_id = env::var("ADMIN_ID").ok().and_then(|s| s.parse().ok());
        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok();

        Ok(Self {
            bot_token,
            database_url,
            log_file,
            admin_id,
            telegram_api_url,
        })
    }
}
