use serde::{Deserialize, Serialize};

use crate::store::Message;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub username: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub message: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptMessagesRequest {
    pub accept_messages: bool,
}

#[derive(Debug, Serialize)]
pub struct AcceptMessagesResponse {
    pub success: bool,
    pub message: String,
    pub is_accepting_messages: bool,
}
