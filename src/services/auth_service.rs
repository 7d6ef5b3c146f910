use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::auth::{Claims, LoginRequest, SignupRequest, TokenResponse},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Create an inactive account and send the confirmation link. The mail is
/// best-effort: a delivery failure is logged but the signup still succeeds.
pub async fn signup(state: &AppState, payload: SignupRequest) -> AppResult<ApiResponse<User>> {
    let SignupRequest { email, password } = payload;
    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict(
            "Email already linked to an account".to_string(),
        ));
    }

    let password_hash = hash_password(&password)?;
    let user: User = sqlx::query_as(
        "INSERT INTO users (id, email, password_hash, is_active) VALUES ($1, $2, $3, FALSE) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(email.as_str())
    .bind(password_hash)
    .fetch_one(&state.pool)
    .await?;

    let confirm_url = format!("{}/api/confirm/{}", state.public_base_url, user.id);
    if let Err(err) = state.mailer.send_confirmation(&user.email, &confirm_url).await {
        tracing::warn!(error = %err, user_id = %user.id, "confirmation mail failed");
    }

    Ok(ApiResponse::success(
        "Account created! Check your email to confirm.",
        user,
        None,
    ))
}

pub async fn confirm(pool: &DbPool, user_id: Uuid) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("UPDATE users SET is_active = TRUE WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Email confirmed! You can now sign in.",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn login(pool: &DbPool, payload: LoginRequest) -> AppResult<ApiResponse<TokenResponse>> {
    let LoginRequest { email, password } = payload;
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(pool)
        .await?;
    let user = match user {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    if !user.is_active {
        return Err(AppError::BadRequest(
            "Please confirm your email before signing in".into(),
        ));
    }

    let resp = mint_token(user.id)?;
    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

/// Hand the already-authenticated actor a fresh access token.
pub fn issue_token(user: &AuthUser) -> AppResult<ApiResponse<TokenResponse>> {
    let resp = mint_token(user.user_id)?;
    Ok(ApiResponse::success("OK", resp, None))
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn mint_token(user_id: Uuid) -> AppResult<TokenResponse> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(TokenResponse {
        token: format!("Bearer {}", token),
    })
}
