//! Email verification endpoints
//!
//! Both endpoints are open (pre-authentication) and sit behind the per-IP
//! rate limiter in addition to the per-email backoff enforced by the store.

use crate::api::MessageResponse;
use crate::domain::{CheckCodeInput, SendCodeInput};
use crate::error::Result;
use crate::server::AppState;
use axum::{extract::State, Json};
use validator::Validate;

/// Send (or resend) a verification code to an email address.
#[utoipa::path(
    post,
    path = "/api/v1/auth/email-verification/send",
    tag = "Verification",
    request_body = SendCodeInput,
    responses(
        (status = 200, description = "Verification code sent", body = MessageResponse),
        (status = 422, description = "Invalid email address"),
        (status = 429, description = "Resend window still closed")
    )
)]
pub async fn send_code(
    State(state): State<AppState>,
    Json(input): Json<SendCodeInput>,
) -> Result<Json<MessageResponse>> {
    input.validate()?;
    state.verification.send_code(&input.email).await?;
    Ok(Json(MessageResponse::new("Verification code sent")))
}

/// Check a previously sent verification code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/email-verification/check",
    tag = "Verification",
    request_body = CheckCodeInput,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Wrong or expired code"),
        (status = 404, description = "No verification in progress for this email"),
        (status = 429, description = "Check window still closed")
    )
)]
pub async fn check_code(
    State(state): State<AppState>,
    Json(input): Json<CheckCodeInput>,
) -> Result<Json<MessageResponse>> {
    input.validate()?;
    state
        .verification
        .check_code(&input.email, &input.code)
        .await?;
    Ok(Json(MessageResponse::new("Email verified")))
}
