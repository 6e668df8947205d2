use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    jwt::JwtKeys,
    password::{hash_password, verify_against_dummy, verify_password},
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    store::{NewUser, User, UserStore},
    validation::{EmailAddress, Password, Username, PASSWORD_MAX},
    verification::{DeliveryStatus, VerificationService},
};

pub struct Registration {
    pub user: User,
    pub delivery: DeliveryStatus,
}

pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    verification: VerificationService,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, verification: VerificationService, keys: JwtKeys) -> Self {
        Self {
            store,
            verification,
            keys,
        }
    }

    /// Creates (or refreshes a still-unverified) account and sends it a code.
    /// Email delivery failure does not undo the account.
    pub async fn register(
        &self,
        username: &Username,
        email: &EmailAddress,
        password: &Password,
    ) -> AppResult<Registration> {
        let by_username = self.store.find_by_username(username.as_str()).await?;
        if by_username.as_ref().is_some_and(|u| u.is_verified) {
            return Err(AppError::Conflict("Username is already taken".into()));
        }

        let by_email = self.store.find_by_email(email.as_str()).await?;
        if by_email.as_ref().is_some_and(|u| u.is_verified) {
            return Err(AppError::Conflict("User already exists with this email".into()));
        }

        // An unverified claim on the username under another email never proved
        // ownership of anything; it gives way.
        if let Some(stale) = by_username.filter(|u| Some(u.id) != by_email.as_ref().map(|e| e.id)) {
            if self.store.delete_unverified(stale.id).await? {
                info!(user_id = %stale.id, username = %stale.username, "dropped unverified username claim");
            }
        }

        let password_hash = hash_password(password.expose())?;
        let user = match by_email {
            Some(pending) => self
                .store
                .update_pending(pending.id, username.as_str(), &password_hash)
                .await?
                .ok_or_else(|| AppError::Conflict("User already exists with this email".into()))?,
            None => {
                self.store
                    .create_user(NewUser {
                        id: Uuid::new_v4(),
                        username: username.to_string(),
                        email: email.to_string(),
                        password_hash,
                    })
                    .await?
            }
        };

        let delivery = self.verification.issue_code(&user).await?;
        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(Registration { user, delivery })
    }

    /// A username is taken only once a verified account holds it.
    pub async fn username_available(&self, username: &Username) -> AppResult<bool> {
        let existing = self.store.find_by_username(username.as_str()).await?;
        Ok(!existing.is_some_and(|u| u.is_verified))
    }

    /// Unknown identifiers and wrong passwords fail identically.
    pub async fn sign_in(&self, identifier: &str, password: &str) -> AppResult<Session> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Identifier and password are required".into()));
        }
        if password.chars().count() > PASSWORD_MAX {
            warn!("sign-in with oversized password");
            return Err(AppError::InvalidCredentials);
        }

        let Some(user) = self.store.find_by_identifier(identifier).await? else {
            verify_against_dummy(password);
            warn!("sign-in for unknown identifier");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "sign-in with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_verified {
            warn!(user_id = %user.id, "sign-in before verification");
            return Err(AppError::NotVerified);
        }

        let session = self.issue_session(user)?;
        info!(user_id = %session.user.id, "user signed in");
        Ok(session)
    }

    pub async fn refresh(&self, refresh_token: &str) -> AppResult<Session> {
        let claims = self
            .keys
            .verify_refresh(refresh_token)
            .map_err(|_| AppError::Unauthorized("Invalid or expired refresh token".into()))?;
        let user = self
            .store
            .find_by_id(claims.sub)
            .await?
            .filter(|u| u.is_verified)
            .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
        self.issue_session(user)
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<User> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    fn issue_session(&self, user: User) -> AppResult<Session> {
        let access_token = self.keys.sign_access(user.id, &user.username)?;
        let refresh_token = self.keys.sign_refresh(user.id, &user.username)?;
        Ok(Session {
            access_token,
            refresh_token,
            user,
        })
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        AuthService::new(
            state.store.clone(),
            state.verification.clone(),
            JwtKeys::from_ref(state),
        )
    }
}
