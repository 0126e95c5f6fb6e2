//! Registration, email verification, login, token refresh and the password
//! management endpoints.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use worklink_db::models::UserRow;
use worklink_types::api::{
    BasicProfile, ChangePasswordRequest, Claims, ForgotPasswordRequest, LoginRequest,
    LoginResponse, OtpVerifyRequest, RefreshRequest, RefreshResponse, RegisterRequest,
    ResendOtpRequest, ResetPasswordRequest,
};
use worklink_types::models::{OtpKind, Role};

use crate::error::{ApiError, ApiResult};
use crate::mail::send_otp_email;
use crate::otp::{self, VerifyError};
use crate::state::AppState;
use crate::token;

const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))
}

pub fn password_matches(stored_hash: &str, password: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn check_passwords(password: &str, confirm: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }
    if password != confirm {
        return Err(ApiError::validation("Passwords don't match"));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut errors = serde_json::Map::new();
    if req.first_name.trim().is_empty() {
        errors.insert("first_name".into(), json!("This field is required"));
    }
    if req.last_name.trim().is_empty() {
        errors.insert("last_name".into(), json!("This field is required"));
    }
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        errors.insert("email".into(), json!("Enter a valid email address"));
    }
    if !errors.is_empty() {
        return Err(ApiError::Fields(serde_json::Value::Object(errors)));
    }
    check_passwords(&req.password, &req.confirm_password)?;

    if state.db.get_user_by_email(&email)?.is_some() {
        return Err(ApiError::validation("User with this email already exists"));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();
    state.db.create_user(
        &user_id.to_string(),
        &email,
        &password_hash,
        req.first_name.trim(),
        req.last_name.trim(),
        req.role.as_str(),
        req.company_name.as_deref(),
    )?;

    let otp = otp::issue(&state.db, &user_id.to_string(), OtpKind::EmailVerification)?;
    send_otp_email(
        state.mailer.as_ref(),
        &email,
        &otp.code,
        OtpKind::EmailVerification,
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. Please verify your email with the OTP sent."
        })),
    ))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<OtpVerifyRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = user_by_email(&state, &req.email)?;

    match otp::verify(
        &state.db,
        &user.id,
        req.otp_code.trim(),
        OtpKind::EmailVerification,
        Utc::now(),
    )? {
        Ok(_) => {
            state.db.mark_email_verified(&user.id)?;
            Ok(Json(json!({ "message": "Email verified successfully" })))
        }
        Err(e) => Err(otp_error(e)),
    }
}

pub async fn resend_otp(
    State(state): State<AppState>,
    Json(req): Json<ResendOtpRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = user_by_email(&state, &req.email)?;
    let profile = state
        .db
        .get_profile(&user.id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if profile.is_email_verified {
        return Err(ApiError::validation("Email already verified"));
    }

    let otp = otp::issue(&state.db, &user.id, OtpKind::EmailVerification)?;
    send_otp_email(
        state.mailer.as_ref(),
        &user.email,
        &otp.code,
        OtpKind::EmailVerification,
    );

    Ok(Json(json!({ "message": "OTP sent successfully" })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = user_by_email(&state, &req.email)?;

    if !password_matches(&user.password, &req.password) {
        return Err(ApiError::unauthorized("Invalid password"));
    }
    if !user.is_active {
        return Err(ApiError::unauthorized("Please verify your email first"));
    }

    let profile = state
        .db
        .get_profile(&user.id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let role = Role::parse(&profile.role)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("unknown role '{}'", profile.role)))?;
    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id: {}", e)))?;

    let pair = token::issue_pair(&state.jwt_secret, user_id, &user.email, role)?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        access: pair.access,
        refresh: pair.refresh,
        user: BasicProfile {
            id: user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role,
        },
    }))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let access = token::refresh_access(&state.jwt_secret, &req.refresh)
        .map_err(|_| ApiError::unauthorized("Invalid or expired refresh token"))?;
    Ok(Json(RefreshResponse { access }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = user_by_email(&state, &req.email)?;

    let otp = otp::issue(&state.db, &user.id, OtpKind::PasswordReset)?;
    send_otp_email(
        state.mailer.as_ref(),
        &user.email,
        &otp.code,
        OtpKind::PasswordReset,
    );

    Ok(Json(json!({
        "message": "Password reset OTP sent to your email"
    })))
}

/// Pre-check for the reset form. The code is not consumed; the reset endpoint
/// verifies it again and consumes it there.
pub async fn verify_forgot_password(
    State(state): State<AppState>,
    Json(req): Json<OtpVerifyRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = user_by_email(&state, &req.email)?;

    match otp::peek(
        &state.db,
        &user.id,
        req.otp_code.trim(),
        OtpKind::PasswordReset,
        Utc::now(),
    )? {
        Ok(()) => Ok(Json(json!({
            "message": "OTP verified. You can now reset your password"
        }))),
        Err(e) => Err(otp_error(e)),
    }
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    check_passwords(&req.new_password, &req.confirm_password)?;
    let user = user_by_email(&state, &req.email)?;

    match otp::verify(
        &state.db,
        &user.id,
        req.otp_code.trim(),
        OtpKind::PasswordReset,
        Utc::now(),
    )? {
        Ok(_) => {
            let hash = hash_password(&req.new_password)?;
            state.db.set_password(&user.id, &hash)?;
            Ok(Json(json!({ "message": "Password reset successfully" })))
        }
        Err(e) => Err(otp_error(e)),
    }
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    check_passwords(&req.new_password, &req.confirm_password)?;

    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !password_matches(&user.password, &req.old_password) {
        return Err(ApiError::validation("Invalid old password"));
    }

    let hash = hash_password(&req.new_password)?;
    state.db.set_password(&user.id, &hash)?;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}

fn user_by_email(state: &AppState, email: &str) -> ApiResult<UserRow> {
    state
        .db
        .get_user_by_email(email.trim().to_lowercase().as_str())?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

fn otp_error(e: VerifyError) -> ApiError {
    match e {
        VerifyError::Invalid => ApiError::validation("Invalid OTP"),
        VerifyError::Expired => ApiError::validation("OTP has expired"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::LogMailer;
    use crate::state::AppStateInner;
    use axum::response::Response;
    use std::sync::Arc;
    use worklink_db::Database;

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            mailer: Arc::new(LogMailer),
            media_dir: std::env::temp_dir(),
        })
    }

    fn seed_user(state: &AppState, email: &str, password: &str, verified: bool) {
        let id = Uuid::new_v4().to_string();
        let hash = hash_password(password).unwrap();
        state
            .db
            .create_user(&id, email, &hash, "Ada", "Lovelace", "employee", None)
            .unwrap();
        if verified {
            state.db.mark_email_verified(&id).unwrap();
        }
    }

    async fn try_login(state: &AppState, email: &str, password: &str) -> ApiResult<Response> {
        login(
            State(state.clone()),
            Json(LoginRequest {
                email: email.into(),
                password: password.into(),
            }),
        )
        .await
        .map(|r| r.into_response())
    }

    #[tokio::test]
    async fn login_unknown_email_is_not_found() {
        let state = test_state();
        let result = try_login(&state, "ghost@x.com", "whatever123").await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn login_wrong_password_is_unauthorized() {
        let state = test_state();
        seed_user(&state, "ada@x.com", "correct horse", true);

        let result = try_login(&state, "ada@x.com", "wrong horse").await;
        assert!(matches!(
            result,
            Err(ApiError::Unauthorized(msg)) if msg == "Invalid password"
        ));
    }

    #[tokio::test]
    async fn login_unverified_account_is_rejected_distinctly() {
        let state = test_state();
        seed_user(&state, "ada@x.com", "correct horse", false);

        let result = try_login(&state, "ada@x.com", "correct horse").await;
        assert!(matches!(
            result,
            Err(ApiError::Unauthorized(msg)) if msg == "Please verify your email first"
        ));
    }

    #[tokio::test]
    async fn login_success_issues_token_pair() {
        let state = test_state();
        seed_user(&state, "ada@x.com", "correct horse", true);

        let response = match try_login(&state, "ada@x.com", "correct horse").await {
            Ok(r) => r,
            Err(e) => panic!("login rejected: {}", e),
        };
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Login successful");
        assert!(body["access"].is_string());
        assert!(body["refresh"].is_string());
        assert_eq!(body["user"]["email"], "ada@x.com");
    }

    #[test]
    fn hash_round_trips() {
        let hash = hash_password("correct horse").unwrap();
        assert!(password_matches(&hash, "correct horse"));
        assert!(!password_matches(&hash, "wrong horse"));
    }

    #[test]
    fn malformed_stored_hash_never_matches() {
        assert!(!password_matches("not-a-phc-string", "anything"));
    }

    #[test]
    fn password_rules() {
        assert!(check_passwords("short", "short").is_err());
        assert!(check_passwords("longenough", "different").is_err());
        assert!(check_passwords("longenough", "longenough").is_ok());
    }
}
