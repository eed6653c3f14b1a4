//! Unit tests for LoggingMiddleware and AuthMiddleware.

use bot_core::{
    BotError, Chat, HandlerError, HandlerResponse, Message, MessageDirection, Middleware,
    RequestContext, User,
};

use crate::logging_auth::{AuthMiddleware, LoggingMiddleware};

fn message_from(user_id: i64) -> Message {
    Message {
        id: "1".to_string(),
        user: User {
            id: user_id,
            username: None,
            first_name: None,
            last_name: None,
        },
        chat: Chat {
            id: 456,
            chat_type: "private".to_string(),
        },
        content: "hello".to_string(),
        message_type: "text".to_string(),
        direction: MessageDirection::Incoming,
        created_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn test_logging_middleware_passes_through() {
    let middleware = LoggingMiddleware;
    let message = message_from(123);
    let mut ctx = RequestContext::new();

    assert!(middleware
        .before(&message, &mut ctx)
        .await
        .expect("before failed"));
    middleware
        .after(&message, &HandlerResponse::Continue, &mut ctx)
        .await
        .expect("after failed");
}

#[tokio::test]
async fn test_auth_middleware_allows_listed_user() {
    let middleware = AuthMiddleware::new(vec![123]);
    let mut ctx = RequestContext::new();

    assert!(middleware
        .before(&message_from(123), &mut ctx)
        .await
        .expect("before failed"));
}

#[tokio::test]
async fn test_auth_middleware_rejects_unlisted_user() {
    let middleware = AuthMiddleware::new(vec![123]);
    let mut ctx = RequestContext::new();

    let err = middleware
        .before(&message_from(999), &mut ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BotError::Handler(HandlerError::Unauthorized)
    ));
}
