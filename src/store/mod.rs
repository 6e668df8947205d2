use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// User record as persisted.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verify_code: Option<String>,
    pub verify_code_expiry: Option<OffsetDateTime>,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
    pub created_at: OffsetDateTime,
}

/// Anonymous message owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate {0:?}")]
    Duplicate(UniqueField),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for users and their messages.
///
/// Uniqueness, code consumption and gated message appends are atomic in every
/// backend; services rely on that instead of locking.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Matches `identifier` against the username, or against the email case-insensitively.
    async fn find_by_identifier(&self, identifier: &str) -> StoreResult<Option<User>>;

    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    /// Rewrites an unverified account's username and password. `None` if the
    /// account is gone or already verified.
    async fn update_pending(
        &self,
        id: Uuid,
        username: &str,
        password_hash: &str,
    ) -> StoreResult<Option<User>>;
    /// Removes an unverified account and its messages.
    async fn delete_unverified(&self, id: Uuid) -> StoreResult<bool>;

    async fn set_verify_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<bool>;
    /// Marks the user verified and clears the code, only if `code` is still pending
    /// and unexpired at `now`.
    async fn consume_verify_code(
        &self,
        id: Uuid,
        code: &str,
        now: OffsetDateTime,
    ) -> StoreResult<bool>;

    async fn set_accepting_messages(&self, id: Uuid, accepting: bool) -> StoreResult<bool>;
    /// Appends only while the owner accepts messages; `None` otherwise.
    async fn append_message(&self, owner: Uuid, message: Message) -> StoreResult<Option<Message>>;
    /// Newest first.
    async fn list_messages(&self, owner: Uuid) -> StoreResult<Vec<Message>>;
    async fn delete_message(&self, owner: Uuid, message_id: Uuid) -> StoreResult<bool>;
}
