//! # telegram-bot
//!
//! Binary crate wiring: config, CLI, teloxide adapters and the REPL
//! runner.

mod adapters;
mod cli;
mod config;
mod runner;

pub use adapters::{TelegramMessageWrapper, TelegramUserWrapper};
pub use cli::{load_config, Cli, Commands};
pub use config::BotConfig;
pub use runner::{build_handler_chain, run_bot, run_repl};
