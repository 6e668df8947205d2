//! Request extractors whose rejections render as the usual `{ success, message }`
//! error body instead of axum's plain-text defaults.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON body. Missing content type, bad syntax and missing fields are validation errors.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::IntoResponse,
    };
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct NamedBody {
        name: String,
    }

    async fn reject(req: Request<Body>) -> (StatusCode, String) {
        let err = AppJson::<NamedBody>::from_request(req, &())
            .await
            .err()
            .expect("request must be rejected");
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn missing_field_is_a_validation_error() {
        let req = Request::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = reject(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("\"success\":false"));
        assert!(body.contains("name"));
    }

    #[tokio::test]
    async fn missing_content_type_is_a_validation_error() {
        let req = Request::post("/").body(Body::from(r#"{"name":"x"}"#)).unwrap();
        let (status, body) = reject(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("\"success\":false"));
    }

    #[tokio::test]
    async fn well_formed_body_is_extracted() {
        let req = Request::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"alice"}"#))
            .unwrap();
        let AppJson(body) = AppJson::<NamedBody>::from_request(req, &()).await.unwrap();
        assert_eq!(body.name, "alice");
    }
}
