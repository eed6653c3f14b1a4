//! Bot wiring and REPL runner: builds the handler chain, converts teloxide
//! messages to core messages and dispatches them, sending Reply bodies back
//! through the [`Bot`] trait.

use std::sync::Arc;

use anyhow::Result;
use bot_core::{init_tracing, Bot, HandlerResponse, TelegramBot, ToCoreMessage};
use handler_chain::HandlerChain;
use handlers::{StartHandler, StopHandler, UsersHandler};
use middleware::{AuthMiddleware, DbSessionMiddleware, LoggingMiddleware};
use storage::{models::CREATE_USERS_TABLE, Database};
use teloxide::prelude::*;
use tracing::{error, info, instrument};

use crate::adapters::TelegramMessageWrapper;
use crate::config::BotConfig;

/// Builds the full chain: logging → optional auth → session-per-update →
/// command handlers.
pub fn build_handler_chain(config: &BotConfig, db: Database) -> HandlerChain {
    let mut chain = HandlerChain::new().add_middleware(Arc::new(LoggingMiddleware));
    if let Some(admin_id) = config.admin_id {
        chain = chain.add_middleware(Arc::new(AuthMiddleware::new(vec![admin_id])));
    }
    chain
        .add_middleware(Arc::new(DbSessionMiddleware::new(db)))
        .add_handler(Arc::new(StartHandler))
        .add_handler(Arc::new(UsersHandler))
        .add_handler(Arc::new(StopHandler))
}

fn build_teloxide_bot(config: &BotConfig) -> Result<teloxide::Bot> {
    let bot = teloxide::Bot::new(&config.bot_token);
    match &config.telegram_api_url {
        Some(url) => Ok(bot.set_api_url(url.parse()?)),
        None => Ok(bot),
    }
}

/// Main entry: init logging, connect the database, ensure schema, run the
/// REPL until shutdown.
#[instrument(skip(config))]
pub async fn run_bot(config: BotConfig) -> Result<()> {
    init_tracing(&config.log_file)?;

    let db = Database::connect(&config.database_url).await?;
    db.run_ddl(CREATE_USERS_TABLE).await?;
    info!(database_url = %config.database_url, "database ready");

    let chain = build_handler_chain(&config, db);
    let bot = build_teloxide_bot(&config)?;
    run_repl(bot, chain).await
}

/// Starts the teloxide REPL; each update is converted to a core message
/// and dispatched on a spawned task so the REPL stays responsive.
pub async fn run_repl(bot: teloxide::Bot, chain: HandlerChain) -> Result<()> {
    let sender = Arc::new(TelegramBot::from_teloxide(bot.clone()));

    teloxide::repl(
        bot,
        move |_bot: teloxide::Bot, msg: teloxide::types::Message| {
            let chain = chain.clone();
            let sender = Arc::clone(&sender);

            async move {
                let core_msg = TelegramMessageWrapper(&msg).to_core();

                if msg.text().is_none() {
                    info!(
                        user_id = core_msg.user.id,
                        chat_id = core_msg.chat.id,
                        "Received non-text message"
                    );
                    return Ok(());
                }

                tokio::spawn(async move {
                    match chain.handle(&core_msg).await {
                        Ok(HandlerResponse::Reply(text)) => {
                            if let Err(e) = sender.reply_to(&core_msg, &text).await {
                                error!(error = %e, chat_id = core_msg.chat.id, "Failed to send reply");
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, user_id = core_msg.user.id, "Handler chain failed");
                        }
                    }
                });

                Ok(())
            }
        },
    )
    .await;

    Ok(())
}
