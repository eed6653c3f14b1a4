//! CLI: argument parsing and config loading.

use clap::{Parser, Subcommand};

use crate::config::BotConfig;

#[derive(Parser)]
#[command(name = "tgbase", about = "Telegram bot with a CRUD-backed user store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (long polling).
    Run {
        /// Bot token; falls back to the BOT_TOKEN environment variable.
        #[arg(long)]
        token: Option<String>,
    },
}

pub fn load_config(token: Option<String>) -> anyhow::Result<BotConfig> {
    BotConfig::load(token)
}
