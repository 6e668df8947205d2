use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Message, NewUser, StoreError, StoreResult, UniqueField, User, UserStore};

/// Process-local store. Every mutation runs under one write lock, which gives the
/// same atomicity the Postgres constraints and conditional updates provide.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    // insertion order, oldest first
    messages: HashMap<Uuid, Vec<Message>>,
}

impl Inner {
    fn find(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        self.users.values().find(|u| pred(u)).cloned()
    }

    fn taken(&self, except: Option<Uuid>, field: UniqueField, value: &str) -> bool {
        self.users.values().any(|u| {
            Some(u.id) != except
                && match field {
                    UniqueField::Username => u.username == value,
                    UniqueField::Email => u.email == value,
                }
        })
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.find(|u| u.username == username))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.find(|u| u.email == email))
    }

    async fn find_by_identifier(&self, identifier: &str) -> StoreResult<Option<User>> {
        let lowered = identifier.to_lowercase();
        Ok(self
            .inner
            .read()
            .await
            .find(|u| u.username == identifier || u.email == lowered))
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.taken(None, UniqueField::Username, &user.username) {
            return Err(StoreError::Duplicate(UniqueField::Username));
        }
        if inner.taken(None, UniqueField::Email, &user.email) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        let record = User {
            id: user.id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            verify_code: None,
            verify_code_expiry: None,
            is_verified: false,
            is_accepting_messages: true,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_pending(
        &self,
        id: Uuid,
        username: &str,
        password_hash: &str,
    ) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if inner.taken(Some(id), UniqueField::Username, username) {
            return Err(StoreError::Duplicate(UniqueField::Username));
        }
        let Some(user) = inner.users.get_mut(&id).filter(|u| !u.is_verified) else {
            return Ok(None);
        };
        user.username = username.to_string();
        user.password_hash = password_hash.to_string();
        Ok(Some(user.clone()))
    }

    async fn delete_unverified(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.users.get(&id) {
            Some(u) if !u.is_verified => {
                inner.users.remove(&id);
                inner.messages.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_verify_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(false);
        };
        user.verify_code = Some(code.to_string());
        user.verify_code_expiry = Some(expires_at);
        Ok(true)
    }

    async fn consume_verify_code(
        &self,
        id: Uuid,
        code: &str,
        now: OffsetDateTime,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(false);
        };
        let pending = !user.is_verified
            && user.verify_code.as_deref() == Some(code)
            && user.verify_code_expiry.is_some_and(|exp| exp >= now);
        if !pending {
            return Ok(false);
        }
        user.is_verified = true;
        user.verify_code = None;
        user.verify_code_expiry = None;
        Ok(true)
    }

    async fn set_accepting_messages(&self, id: Uuid, accepting: bool) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(false);
        };
        user.is_accepting_messages = accepting;
        Ok(true)
    }

    async fn append_message(&self, owner: Uuid, message: Message) -> StoreResult<Option<Message>> {
        let mut inner = self.inner.write().await;
        let accepting = inner
            .users
            .get(&owner)
            .is_some_and(|u| u.is_accepting_messages);
        if !accepting {
            return Ok(None);
        }
        inner.messages.entry(owner).or_default().push(message.clone());
        Ok(Some(message))
    }

    async fn list_messages(&self, owner: Uuid) -> StoreResult<Vec<Message>> {
        let inner = self.inner.read().await;
        let mut out: Vec<Message> = inner
            .messages
            .get(&owner)
            .map(|m| m.iter().rev().cloned().collect())
            .unwrap_or_default();
        // stable: equal timestamps keep newest-appended first
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn delete_message(&self, owner: Uuid, message_id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(messages) = inner.messages.get_mut(&owner) else {
            return Ok(false);
        };
        let before = messages.len();
        messages.retain(|m| m.id != message_id);
        Ok(messages.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    fn message(content: &str, at: OffsetDateTime) -> Message {
        Message {
            id: Uuid::new_v4(),
            content: content.into(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_username_and_email() {
        let store = MemoryUserStore::new();
        store.create_user(new_user("alice", "a@x.io")).await.unwrap();

        let err = store.create_user(new_user("alice", "b@x.io")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Username)));

        let err = store.create_user(new_user("bob", "a@x.io")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Email)));
    }

    #[tokio::test]
    async fn identifier_matches_username_or_email() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("alice", "a@x.io")).await.unwrap();

        let by_name = store.find_by_identifier("alice").await.unwrap().unwrap();
        let by_mail = store.find_by_identifier("A@X.io").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_mail.id, user.id);
        assert!(store.find_by_identifier("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn code_is_consumed_once() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("alice", "a@x.io")).await.unwrap();
        let now = OffsetDateTime::now_utc();
        store
            .set_verify_code(user.id, "123456", now + Duration::minutes(15))
            .await
            .unwrap();

        assert!(!store.consume_verify_code(user.id, "000000", now).await.unwrap());
        assert!(store.consume_verify_code(user.id, "123456", now).await.unwrap());
        assert!(!store.consume_verify_code(user.id, "123456", now).await.unwrap());

        let user = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(user.is_verified);
        assert!(user.verify_code.is_none());
        assert!(user.verify_code_expiry.is_none());
    }

    #[tokio::test]
    async fn expired_code_is_not_consumed() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("alice", "a@x.io")).await.unwrap();
        let now = OffsetDateTime::now_utc();
        store.set_verify_code(user.id, "123456", now).await.unwrap();

        let later = now + Duration::seconds(1);
        assert!(!store.consume_verify_code(user.id, "123456", later).await.unwrap());
    }

    #[tokio::test]
    async fn append_respects_accepting_flag() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("alice", "a@x.io")).await.unwrap();
        let now = OffsetDateTime::now_utc();

        assert!(store.append_message(user.id, message("hi", now)).await.unwrap().is_some());
        store.set_accepting_messages(user.id, false).await.unwrap();
        assert!(store.append_message(user.id, message("yo", now)).await.unwrap().is_none());
        assert_eq!(store.list_messages(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn messages_listed_newest_first() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("alice", "a@x.io")).await.unwrap();
        let t0 = OffsetDateTime::now_utc();

        store.append_message(user.id, message("second", t0 + Duration::seconds(1))).await.unwrap();
        store.append_message(user.id, message("first", t0)).await.unwrap();
        store.append_message(user.id, message("third", t0 + Duration::seconds(2))).await.unwrap();

        let contents: Vec<_> = store
            .list_messages(user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn delete_only_touches_owner_messages() {
        let store = MemoryUserStore::new();
        let alice = store.create_user(new_user("alice", "a@x.io")).await.unwrap();
        let bob = store.create_user(new_user("bob", "b@x.io")).await.unwrap();
        let msg = message("hi", OffsetDateTime::now_utc());
        store.append_message(alice.id, msg.clone()).await.unwrap();

        assert!(!store.delete_message(bob.id, msg.id).await.unwrap());
        assert!(store.delete_message(alice.id, msg.id).await.unwrap());
        assert!(!store.delete_message(alice.id, msg.id).await.unwrap());
    }

    #[tokio::test]
    async fn verified_users_are_not_rewritten_or_deleted() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("alice", "a@x.io")).await.unwrap();
        let now = OffsetDateTime::now_utc();
        store.set_verify_code(user.id, "123456", now + Duration::minutes(1)).await.unwrap();
        store.consume_verify_code(user.id, "123456", now).await.unwrap();

        assert!(store.update_pending(user.id, "eve", "h2").await.unwrap().is_none());
        assert!(!store.delete_unverified(user.id).await.unwrap());
    }
}
