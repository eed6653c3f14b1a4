//! Basic bot commands backed by the user repository.
//!
//! Each handler pulls the request's session from the context, builds a
//! [`UserRepo`] for the duration of the update, and replies through the
//! chain.

use async_trait::async_trait;
use bot_core::{BotError, Handler, HandlerResponse, Message, RequestContext, Result};
use storage::{StorageError, UserRepo, Values};
use tracing::{info, instrument, warn};

fn command(message: &Message) -> Option<&str> {
    let text = message.content.trim();
    if !text.starts_with('/') {
        return None;
    }
    // "/start@my_bot arg" -> "/start"
    let first = text.split_whitespace().next()?;
    Some(first.split('@').next().unwrap_or(first))
}

/// `/start`: registers the user if unknown and greets them with the list
/// of known users.
pub struct StartHandler;

#[async_trait]
impl Handler for StartHandler {
    #[instrument(skip(self, message, ctx))]
    async fn handle(&self, message: &Message, ctx: &RequestContext) -> Result<HandlerResponse> {
        if command(message) != Some("/start") {
            return Ok(HandlerResponse::Continue);
        }

        let session = ctx.session()?;
        let repo = UserRepo::new(&session);

        let user = repo
            .get_or_create(
                message.user.id,
                Values::new()
                    .set("username", message.user.username.clone())
                    .set("first_name", message.user.first_name.clone())
                    .set("last_name", message.user.last_name.clone()),
            )
            .await
            .map_err(BotError::from)?;

        let all_users = repo.all().await.map_err(BotError::from)?;
        let names: Vec<String> = all_users.iter().map(|u| u.display_name()).collect();

        info!(
            user_id = user.telegram_id,
            total_users = all_users.len(),
            "user started the bot"
        );

        Ok(HandlerResponse::Reply(format!(
            "Hello, {}!\nAll users in bot:\n{}",
            user.display_name(),
            names.join(", ")
        )))
    }
}

/// `/users`: lists active users.
pub struct UsersHandler;

#[async_trait]
impl Handler for UsersHandler {
    #[instrument(skip(self, message, ctx))]
    async fn handle(&self, message: &Message, ctx: &RequestContext) -> Result<HandlerResponse> {
        if command(message) != Some("/users") {
            return Ok(HandlerResponse::Continue);
        }

        let session = ctx.session()?;
        let repo = UserRepo::new(&session);

        let active = repo.active().await.map_err(BotError::from)?;
        if active.is_empty() {
            return Ok(HandlerResponse::Reply("No active users yet.".to_string()));
        }

        let names: Vec<String> = active.iter().map(|u| u.display_name()).collect();
        Ok(HandlerResponse::Reply(format!(
            "Active users:\n{}",
            names.join(", ")
        )))
    }
}

/// `/stop`: deactivates the sender.
pub struct StopHandler;

#[async_trait]
impl Handler for StopHandler {
    #[instrument(skip(self, message, ctx))]
    async fn handle(&self, message: &Message, ctx: &RequestContext) -> Result<HandlerResponse> {
        if command(message) != Some("/stop") {
            return Ok(HandlerResponse::Continue);
        }

        let session = ctx.session()?;
        let repo = UserRepo::new(&session);

        match repo.deactivate(message.user.id).await {
            Ok(user) => Ok(HandlerResponse::Reply(format!(
                "Goodbye, {}! You will no longer be listed.",
                user.display_name()
            ))),
            Err(StorageError::NotFound(_)) => {
                warn!(user_id = message.user.id, "stop from unregistered user");
                Ok(HandlerResponse::Reply(
                    "You are not registered yet. Send /start first.".to_string(),
                ))
            }
            Err(err) => Err(BotError::from(err)),
        }
    }
}
