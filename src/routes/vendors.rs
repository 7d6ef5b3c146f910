use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::vendors::{RegisterVendorRequest, UpdateVendorRequest, VendorList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Vendor,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vendors))
        .route("/register", post(register_vendor))
        .route("/{id}", get(get_vendor))
        .route("/{id}", put(update_vendor))
        .route("/{id}", delete(delete_vendor))
}

fn vendor_code(user_id: Uuid) -> String {
    let id = user_id.to_string();
    format!("V{}", &id[..8])
}

#[utoipa::path(
    get,
    path = "/api/vendors",
    responses(
        (status = 200, description = "The caller's own vendor records", body = ApiResponse<VendorList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn list_vendors(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<VendorList>>> {
    let items: Vec<Vendor> = sqlx::query_as("SELECT * FROM vendors WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(ApiResponse::success(
        "OK",
        VendorList { items },
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/vendors/register",
    request_body = RegisterVendorRequest,
    responses(
        (status = 200, description = "Current user registered as a vendor", body = ApiResponse<Vendor>),
        (status = 400, description = "Already a vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn register_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RegisterVendorRequest>,
) -> AppResult<Json<ApiResponse<Vendor>>> {
    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM vendors WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("Already a vendor".into()));
    }

    let vendor: Vendor = sqlx::query_as(
        "INSERT INTO vendors (id, user_id, name, code, phone) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.name)
    .bind(vendor_code(user.user_id))
    .bind(payload.phone)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Vendor registered",
        vendor,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/vendors/{id}",
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    responses(
        (status = 200, description = "Vendor detail", body = ApiResponse<Vendor>),
        (status = 404, description = "Not found or not owned by the caller"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn get_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vendor>>> {
    let vendor: Vendor = sqlx::query_as("SELECT * FROM vendors WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(ApiResponse::success("Vendor", vendor, None)))
}

#[utoipa::path(
    put,
    path = "/api/vendors/{id}",
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    request_body = UpdateVendorRequest,
    responses(
        (status = 200, description = "Updated vendor", body = ApiResponse<Vendor>),
        (status = 404, description = "Not found or not owned by the caller"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn update_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVendorRequest>,
) -> AppResult<Json<ApiResponse<Vendor>>> {
    let existing: Vendor = sqlx::query_as("SELECT * FROM vendors WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;

    let name = payload.name.unwrap_or(existing.name);
    let phone = payload.phone.unwrap_or(existing.phone);

    let vendor: Vendor = sqlx::query_as(
        "UPDATE vendors SET name = $2, phone = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(phone)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Updated",
        vendor,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/vendors/{id}",
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    responses(
        (status = 200, description = "Deleted vendor"),
        (status = 404, description = "Not found or not owned by the caller"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn delete_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let result = sqlx::query("DELETE FROM vendors WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}
