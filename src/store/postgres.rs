use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Message, NewUser, StoreError, StoreResult, UniqueField, User, UserStore};

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

/// Unique constraint name (see `migrations/`) to the field it guards.
fn unique_field(constraint: Option<&str>) -> UniqueField {
    match constraint {
        Some("users_email_key") => UniqueField::Email,
        _ => UniqueField::Username,
    }
}

fn map_unique(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate(unique_field(db_err.constraint()));
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, verify_code, verify_code_expiry,
                   is_verified, is_accepting_messages, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, verify_code, verify_code_expiry,
                   is_verified, is_accepting_messages, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, verify_code, verify_code_expiry,
                   is_verified, is_accepting_messages, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_identifier(&self, identifier: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, verify_code, verify_code_expiry,
                   is_verified, is_accepting_messages, created_at
            FROM users
            WHERE username = $1 OR email = lower($1)
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, verify_code, verify_code_expiry,
                      is_verified, is_accepting_messages, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique)
    }

    async fn update_pending(
        &self,
        id: Uuid,
        username: &str,
        password_hash: &str,
    ) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET username = $2, password_hash = $3
             WHERE id = $1 AND is_verified = false
            RETURNING id, username, email, password_hash, verify_code, verify_code_expiry,
                      is_verified, is_accepting_messages, created_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await
        .map_err(map_unique)
    }

    async fn delete_unverified(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query(r#"DELETE FROM users WHERE id = $1 AND is_verified = false"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_verify_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"UPDATE users SET verify_code = $2, verify_code_expiry = $3 WHERE id = $1"#,
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn consume_verify_code(
        &self,
        id: Uuid,
        code: &str,
        now: OffsetDateTime,
    ) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET is_verified = true, verify_code = NULL, verify_code_expiry = NULL
             WHERE id = $1
               AND is_verified = false
               AND verify_code = $2
               AND verify_code_expiry >= $3
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(now)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn set_accepting_messages(&self, id: Uuid, accepting: bool) -> StoreResult<bool> {
        let res = sqlx::query(r#"UPDATE users SET is_accepting_messages = $2 WHERE id = $1"#)
            .bind(id)
            .bind(accepting)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn append_message(&self, owner: Uuid, message: Message) -> StoreResult<Option<Message>> {
        let row = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, user_id, content, created_at)
            SELECT $1, u.id, $3, $4
              FROM users u
             WHERE u.id = $2 AND u.is_accepting_messages
            RETURNING id, content, created_at
            "#,
        )
        .bind(message.id)
        .bind(owner)
        .bind(&message.content)
        .bind(message.created_at)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_messages(&self, owner: Uuid) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, content, created_at
              FROM messages
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn delete_message(&self, owner: Uuid, message_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query(r#"DELETE FROM messages WHERE id = $1 AND user_id = $2"#)
            .bind(message_id)
            .bind(owner)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
