use std::sync::Arc;

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    store::{Message, UserStore},
    validation::{MessageContent, Username},
};

#[derive(Clone)]
pub struct MessagingService {
    store: Arc<dyn UserStore>,
}

impl MessagingService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Anonymous post to `recipient`. Unverified accounts cannot receive messages.
    pub async fn post_message(
        &self,
        recipient: &Username,
        content: &MessageContent,
    ) -> AppResult<Message> {
        let user = self
            .store
            .find_by_username(recipient.as_str())
            .await?
            .filter(|u| u.is_verified)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        if !user.is_accepting_messages {
            return Err(AppError::NotAccepting);
        }

        let message = Message {
            id: Uuid::new_v4(),
            content: content.as_str().to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        // The flag may have flipped since the lookup; the store re-checks it.
        let stored = self
            .store
            .append_message(user.id, message)
            .await?
            .ok_or(AppError::NotAccepting)?;

        info!(recipient_id = %user.id, message_id = %stored.id, "message delivered");
        Ok(stored)
    }

    pub async fn list_messages(&self, owner: Uuid) -> AppResult<Vec<Message>> {
        if self.store.find_by_id(owner).await?.is_none() {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(self.store.list_messages(owner).await?)
    }

    pub async fn delete_message(&self, owner: Uuid, message_id: Uuid) -> AppResult<()> {
        if !self.store.delete_message(owner, message_id).await? {
            warn!(owner_id = %owner, message_id = %message_id, "delete of unknown message");
            return Err(AppError::NotFound(
                "Message not found or already deleted".into(),
            ));
        }
        info!(owner_id = %owner, message_id = %message_id, "message deleted");
        Ok(())
    }

    pub async fn accepting_status(&self, owner: Uuid) -> AppResult<bool> {
        self.store
            .find_by_id(owner)
            .await?
            .map(|u| u.is_accepting_messages)
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    pub async fn set_accepting(&self, owner: Uuid, accepting: bool) -> AppResult<bool> {
        if !self.store.set_accepting_messages(owner, accepting).await? {
            return Err(AppError::NotFound("User not found".into()));
        }
        info!(owner_id = %owner, accepting, "message acceptance updated");
        Ok(accepting)
    }
}

impl FromRef<AppState> for MessagingService {
    fn from_ref(state: &AppState) -> Self {
        MessagingService::new(state.store.clone())
    }
}
