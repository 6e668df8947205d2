use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{AcceptMessagesRequest, AcceptMessagesResponse, MessagesResponse, SendMessageRequest},
    services::MessagingService,
};
use crate::{
    auth::AuthUser,
    error::AppResult,
    extract::{AppJson, AppPath},
    response::ApiResponse,
    state::AppState,
    validation::{MessageContent, Username},
};

/// Reachable without a session: the shareable link.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/send-message", post(send_message))
}

pub fn owner_routes() -> Router<AppState> {
    Router::new()
        .route("/get-messages", get(get_messages))
        .route("/delete-message/:message_id", delete(delete_message))
        .route(
            "/accept-messages",
            get(get_accept_messages).post(set_accept_messages),
        )
}

#[instrument(skip(messaging, payload), fields(recipient = %payload.username))]
pub async fn send_message(
    State(messaging): State<MessagingService>,
    AppJson(payload): AppJson<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse>)> {
    let recipient = Username::parse(&payload.username)?;
    let content = MessageContent::parse(&payload.content)?;
    messaging.post_message(&recipient, &content).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Message sent successfully")),
    ))
}

#[instrument(skip(messaging), fields(user_id = %user.id, username = %user.username))]
pub async fn get_messages(
    State(messaging): State<MessagingService>,
    user: AuthUser,
) -> AppResult<Json<MessagesResponse>> {
    let messages = messaging.list_messages(user.id).await?;
    let message = if messages.is_empty() {
        "No messages yet".to_string()
    } else {
        format!("{} message(s)", messages.len())
    };
    Ok(Json(MessagesResponse {
        success: true,
        message,
        messages,
    }))
}

#[instrument(skip(messaging), fields(user_id = %user.id, username = %user.username))]
pub async fn delete_message(
    State(messaging): State<MessagingService>,
    user: AuthUser,
    AppPath(message_id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse>> {
    messaging.delete_message(user.id, message_id).await?;
    Ok(Json(ApiResponse::ok("Message deleted")))
}

#[instrument(skip(messaging), fields(user_id = %user.id, username = %user.username))]
pub async fn get_accept_messages(
    State(messaging): State<MessagingService>,
    user: AuthUser,
) -> AppResult<Json<AcceptMessagesResponse>> {
    let accepting = messaging.accepting_status(user.id).await?;
    Ok(Json(AcceptMessagesResponse {
        success: true,
        message: if accepting {
            "Accepting messages".into()
        } else {
            "Not accepting messages".into()
        },
        is_accepting_messages: accepting,
    }))
}

#[instrument(skip(messaging, payload), fields(user_id = %user.id, username = %user.username))]
pub async fn set_accept_messages(
    State(messaging): State<MessagingService>,
    user: AuthUser,
    AppJson(payload): AppJson<AcceptMessagesRequest>,
) -> AppResult<Json<AcceptMessagesResponse>> {
    let accepting = messaging
        .set_accepting(user.id, payload.accept_messages)
        .await?;
    Ok(Json(AcceptMessagesResponse {
        success: true,
        message: "Message acceptance status updated successfully".into(),
        is_accepting_messages: accepting,
    }))
}
