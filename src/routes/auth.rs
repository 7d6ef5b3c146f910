use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::auth::{LoginRequest, SignupRequest, TokenResponse},
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/confirm/{user_id}", get(confirm))
        .route("/get-token", get(get_token))
}

#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Inactive account created, confirmation mail sent", body = ApiResponse<User>),
        (status = 409, description = "Email already linked to an account"),
    ),
    tag = "Auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = auth_service::signup(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/confirm/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID from the confirmation link")
    ),
    responses(
        (status = 200, description = "Account activated", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Unknown user"),
    ),
    tag = "Auth"
)]
pub async fn confirm(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::confirm(&state.pool, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Invalid credentials or unconfirmed account"),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let resp = auth_service::login(&state.pool, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/get-token",
    responses(
        (status = 200, description = "Fresh access token for the current actor", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Not authenticated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn get_token(user: AuthUser) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let resp = auth_service::issue_token(&user)?;
    Ok(Json(resp))
}
