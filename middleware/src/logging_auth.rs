use async_trait::async_trait;
use bot_core::{HandlerError, HandlerResponse, Message, Middleware, RequestContext, Result};
use tracing::{debug, error, info, instrument};

pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    #[instrument(skip(self, message, _ctx))]
    async fn before(&self, message: &Message, _ctx: &mut RequestContext) -> Result<bool> {
        info!(
            user_id = message.user.id,
            username = %message.user.username.as_deref().unwrap_or("unknown"),
            message_content = %message.content,
            "Received message"
        );
        Ok(true)
    }

    #[instrument(skip(self, message, response, _ctx))]
    async fn after(
        &self,
        message: &Message,
        response: &HandlerResponse,
        _ctx: &mut RequestContext,
    ) -> Result<()> {
        debug!(
            message_id = ?message.id,
            response = ?response,
            "Processed message"
        );
        Ok(())
    }
}

pub struct AuthMiddleware {
    allowed_users: Vec<i64>,
}

impl AuthMiddleware {
    pub fn new(allowed_users: Vec<i64>) -> Self {
        Self { allowed_users }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    #[instrument(skip(self, message, _ctx))]
    async fn before(&self, message: &Message, _ctx: &mut RequestContext) -> Result<bool> {
        let user_id = message.user.id;
        if self.allowed_users.contains(&user_id) {
            info!(user_id = user_id, "User authorized");
            Ok(true)
        } else {
            error!(user_id = user_id, "Unauthorized access attempt");
            Err(HandlerError::Unauthorized.into())
        }
    }
}
