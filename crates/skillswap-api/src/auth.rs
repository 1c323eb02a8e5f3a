use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use skillswap_types::api::{
    ChangeEmailRequest, Claims, ConfirmEmailChangeRequest, ForgotPasswordRequest, LoginRequest,
    LoginResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest, VerifyEmailRequest,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const OTP_TTL_MINUTES: i64 = 10;
const SIGNUP_BONUS_CREDITS: i64 = 25;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::BadRequest(
            "username must be 3-32 characters".into(),
        ));
    }
    if !req.email.contains('@') {
        return Err(ApiError::BadRequest("invalid email address".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    if state.db.get_user_by_username(&req.username)?.is_some() {
        return Err(ApiError::Conflict("username already taken".into()));
    }
    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::Conflict("email already registered".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    state
        .db
        .create_user(&user_id.to_string(), &req.username, &req.email, &password_hash)?;

    issue_otp(&state, &user_id.to_string(), &req.email, "verify_email").await;

    info!("registered {} ({}), verification pending", req.username, user_id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            verification_required: true,
        }),
    ))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or_else(|| ApiError::BadRequest("invalid verification code".into()))?;

    if !state.db.consume_otp(&user.id, &req.code, "verify_email")? {
        return Err(ApiError::BadRequest("invalid verification code".into()));
    }

    state.db.mark_verified(&user.id)?;

    // Sign-up bonus moves through the ledger like every other credit.
    state.db.adjust_credits(
        &Uuid::new_v4().to_string(),
        &user.id,
        SIGNUP_BONUS_CREDITS,
        "signup_bonus",
        None,
    )?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id: {e}")))?;
    let token = create_token(&state.jwt_secret, user_id, &user.username, &user.role)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or(ApiError::Unauthorized)?;

    verify_password(&req.password, &user.password)?;

    if !user.verified {
        return Err(ApiError::Forbidden("email not verified".into()));
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id: {e}")))?;
    let token = create_token(&state.jwt_secret, user_id, &user.username, &user.role)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    // Same response whether or not the address exists.
    if let Some(user) = state.db.get_user_by_email(&req.email)? {
        issue_otp(&state, &user.id, &req.email, "reset_password").await;
    } else {
        info!("password reset requested for unknown address");
    }
    Ok(StatusCode::OK)
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.new_password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or_else(|| ApiError::BadRequest("invalid reset code".into()))?;

    if !state.db.consume_otp(&user.id, &req.code, "reset_password")? {
        return Err(ApiError::BadRequest("invalid reset code".into()));
    }

    let password_hash = hash_password(&req.new_password)?;
    state.db.set_password(&user.id, &password_hash)?;

    info!("password reset for {}", user.username);
    Ok(StatusCode::OK)
}

pub async fn change_email(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangeEmailRequest>,
) -> ApiResult<impl IntoResponse> {
    if !req.new_email.contains('@') {
        return Err(ApiError::BadRequest("invalid email address".into()));
    }
    if state.db.get_user_by_email(&req.new_email)?.is_some() {
        return Err(ApiError::Conflict("email already registered".into()));
    }

    let user_id = claims.sub.to_string();
    state.db.set_pending_email(&user_id, &req.new_email)?;

    // The code goes to the address being claimed, not the current one.
    issue_otp(&state, &user_id, &req.new_email, "change_email").await;

    Ok(StatusCode::OK)
}

pub async fn confirm_email_change(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ConfirmEmailChangeRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.sub.to_string();

    if !state.db.consume_otp(&user_id, &req.code, "change_email")? {
        return Err(ApiError::BadRequest("invalid confirmation code".into()));
    }

    if !state.db.apply_pending_email(&user_id)? {
        return Err(ApiError::Conflict("email change no longer applicable".into()));
    }

    Ok(StatusCode::OK)
}

/// Generate, store and email a fresh OTP. The email leg is best-effort;
/// a provider outage must not fail registration or reset.
async fn issue_otp(state: &AppState, user_id: &str, email: &str, purpose: &str) {
    let code = format!("{:06}", rand::rng().random_range(0..1_000_000u32));

    if let Err(e) = state.db.set_otp(user_id, &code, purpose, OTP_TTL_MINUTES) {
        warn!("failed to store OTP for {}: {}", user_id, e);
        return;
    }

    if let Err(e) = state.providers.mailer.send_otp(email, purpose, &code).await {
        warn!("failed to email OTP ({}) to {}: {}", purpose, email, e);
    }
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, stored_hash: &str) -> ApiResult<()> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt password hash: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str, role: &str) -> ApiResult<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("token encoding failed: {e}")))?;

    Ok(token)
}
