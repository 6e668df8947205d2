use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        AuthResponse, MeResponse, RefreshRequest, ResendCodeRequest, SignInRequest,
        SignUpRequest, SignUpResponse, UsernameQuery, VerifyCodeRequest,
    },
    extractors::AuthUser,
    services::{AuthService, Session},
};
use crate::{
    error::{AppError, AppResult},
    extract::{AppJson, AppQuery},
    response::ApiResponse,
    state::AppState,
    validation::{EmailAddress, Password, Username, VerificationCode},
    verification::{DeliveryStatus, VerificationService},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/check-username-unique", get(check_username_unique))
        .route("/verify-code", post(verify_code))
        .route("/resend-code", post(resend_code))
        .route("/sign-in", post(sign_in))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn auth_response(message: &str, session: Session) -> Json<AuthResponse> {
    Json(AuthResponse {
        success: true,
        message: message.into(),
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        user: session.user.into(),
    })
}

#[instrument(skip(auth, payload), fields(username = %payload.username))]
pub async fn sign_up(
    State(auth): State<AuthService>,
    AppJson(payload): AppJson<SignUpRequest>,
) -> AppResult<(StatusCode, Json<SignUpResponse>)> {
    let username = Username::parse(&payload.username)?;
    let email = EmailAddress::parse(&payload.email)?;
    let password = Password::parse(&payload.password)?;

    let registration = auth.register(&username, &email, &password).await?;
    let (email_sent, message) = match registration.delivery {
        DeliveryStatus::Sent => (
            true,
            "User registered successfully. Please verify your account.",
        ),
        DeliveryStatus::Failed(_) => (
            false,
            "User registered, but the verification email could not be sent. Please request a new code.",
        ),
    };
    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            success: true,
            message: message.into(),
            email_sent,
        }),
    ))
}

#[instrument(skip(auth))]
pub async fn check_username_unique(
    State(auth): State<AuthService>,
    AppQuery(query): AppQuery<UsernameQuery>,
) -> AppResult<Json<ApiResponse>> {
    let username = Username::parse(&query.username)?;
    if !auth.username_available(&username).await? {
        return Err(AppError::Conflict("Username is already taken".into()));
    }
    Ok(Json(ApiResponse::ok("Username is available")))
}

#[instrument(skip(verification, payload), fields(username = %payload.username))]
pub async fn verify_code(
    State(verification): State<VerificationService>,
    AppJson(payload): AppJson<VerifyCodeRequest>,
) -> AppResult<Json<ApiResponse>> {
    let username = Username::parse(&payload.username)?;
    let code = VerificationCode::parse(&payload.code)?;
    verification.verify(&username, &code).await?;
    Ok(Json(ApiResponse::ok("Account verified successfully")))
}

#[instrument(skip(verification, payload), fields(username = %payload.username))]
pub async fn resend_code(
    State(verification): State<VerificationService>,
    AppJson(payload): AppJson<ResendCodeRequest>,
) -> AppResult<Json<ApiResponse>> {
    let username = Username::parse(&payload.username)?;
    verification.resend_code(&username).await?;
    Ok(Json(ApiResponse::ok("Verification code sent")))
}

#[instrument(skip(auth, payload))]
pub async fn sign_in(
    State(auth): State<AuthService>,
    AppJson(payload): AppJson<SignInRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = auth.sign_in(&payload.identifier, &payload.password).await?;
    Ok(auth_response("Signed in successfully", session))
}

#[instrument(skip(auth, payload))]
pub async fn refresh(
    State(auth): State<AuthService>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = auth.refresh(&payload.refresh_token).await?;
    Ok(auth_response("Session refreshed", session))
}

#[instrument(skip(auth), fields(user_id = %user.id, username = %user.username))]
pub async fn get_me(
    State(auth): State<AuthService>,
    user: AuthUser,
) -> AppResult<Json<MeResponse>> {
    let profile = auth.profile(user.id).await?;
    Ok(Json(MeResponse {
        success: true,
        message: "User profile".into(),
        user: profile.into(),
    }))
}
