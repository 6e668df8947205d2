use std::sync::Arc;

use axum::extract::FromRef;
use rand::Rng;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};

use super::email::verification_email;
use crate::{
    error::{AppError, AppResult},
    mailer::{MailError, Mailer},
    state::AppState,
    store::{User, UserStore},
    validation::{Username, VerificationCode},
};

/// Outcome of handing the code to the mailer. A failed delivery leaves the code
/// persisted; callers decide whether that is fatal.
#[derive(Debug)]
pub enum DeliveryStatus {
    Sent,
    Failed(MailError),
}

#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    code_ttl: Duration,
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

impl VerificationService {
    pub fn new(store: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>, code_ttl: Duration) -> Self {
        Self {
            store,
            mailer,
            code_ttl,
        }
    }

    /// Stores a fresh code on `user` and emails it.
    pub async fn issue_code(&self, user: &User) -> AppResult<DeliveryStatus> {
        self.issue_code_at(user, OffsetDateTime::now_utc()).await
    }

    pub(crate) async fn issue_code_at(
        &self,
        user: &User,
        now: OffsetDateTime,
    ) -> AppResult<DeliveryStatus> {
        let code = generate_code();
        let expires_at = now + self.code_ttl;
        if !self.store.set_verify_code(user.id, &code, expires_at).await? {
            return Err(AppError::NotFound("User not found".into()));
        }

        let email = verification_email(
            &user.email,
            &user.username,
            &code,
            self.code_ttl.whole_minutes(),
        );
        match self.mailer.send(email).await {
            Ok(()) => {
                info!(user_id = %user.id, "verification code sent");
                Ok(DeliveryStatus::Sent)
            }
            Err(e) => {
                error!(user_id = %user.id, error = %e, "failed to send verification email");
                Ok(DeliveryStatus::Failed(e))
            }
        }
    }

    pub async fn verify(&self, username: &Username, code: &VerificationCode) -> AppResult<()> {
        self.verify_at(username, code, OffsetDateTime::now_utc()).await
    }

    pub(crate) async fn verify_at(
        &self,
        username: &Username,
        code: &VerificationCode,
        now: OffsetDateTime,
    ) -> AppResult<()> {
        let user = self
            .store
            .find_by_username(username.as_str())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        if user.verify_code_expiry.is_some_and(|exp| now > exp) {
            warn!(user_id = %user.id, "verification code expired");
            return Err(AppError::CodeExpired);
        }
        if user.verify_code.as_deref() != Some(code.as_str()) {
            warn!(user_id = %user.id, "verification code mismatch");
            return Err(AppError::CodeMismatch);
        }
        // Lost a race with a concurrent submission of the same code.
        if !self.store.consume_verify_code(user.id, code.as_str(), now).await? {
            return Err(AppError::CodeMismatch);
        }

        info!(user_id = %user.id, username = %user.username, "account verified");
        Ok(())
    }

    /// Replaces the pending code of an unverified account and sends it again.
    pub async fn resend_code(&self, username: &Username) -> AppResult<()> {
        let user = self
            .store
            .find_by_username(username.as_str())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        if user.is_verified {
            return Err(AppError::Conflict("Account is already verified".into()));
        }
        match self.issue_code(&user).await? {
            DeliveryStatus::Sent => Ok(()),
            DeliveryStatus::Failed(e) => Err(e.into()),
        }
    }
}

impl FromRef<AppState> for VerificationService {
    fn from_ref(state: &AppState) -> Self {
        state.verification.clone()
    }
}
