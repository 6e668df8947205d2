use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::error::AppError;

/// Authenticated session owner, taken from a `Bearer` access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::Unauthorized("Access token required".into()));
        }

        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use axum::http::{header, Request};

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "extractor-secret".into(),
            issuer: "test".into(),
            audience: "test".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    fn parts(auth: Option<String>) -> Parts {
        let mut req = Request::get("/api/get-messages");
        if let Some(value) = auth {
            req = req.header(header::AUTHORIZATION, value);
        }
        req.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn access_token_yields_id_and_username() {
        let keys = keys();
        let id = Uuid::new_v4();
        let token = keys.sign_access(id, "alice").unwrap();

        let mut parts = parts(Some(format!("Bearer {token}")));
        let user = AuthUser::from_request_parts(&mut parts, &keys).await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn refresh_token_is_not_a_session() {
        let keys = keys();
        let token = keys.sign_refresh(Uuid::new_v4(), "alice").unwrap();

        let mut parts = parts(Some(format!("Bearer {token}")));
        let err = AuthUser::from_request_parts(&mut parts, &keys).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let keys = keys();
        let mut parts = parts(None);
        let err = AuthUser::from_request_parts(&mut parts, &keys).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
