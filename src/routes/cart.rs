use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartView, CheckoutRequest, RemoveFromCartRequest},
    dto::orders::OrderView,
    error::AppResult,
    middleware::auth::CartActor,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_detail))
        .route("/add", post(add_to_cart))
        .route("/{id}/remove", post(remove_from_cart))
        .route("/{id}/checkout", post(checkout))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Current actor's cart with recomputed totals", body = ApiResponse<CartView>)
    ),
    tag = "Cart"
)]
pub async fn cart_detail(
    State(state): State<AppState>,
    actor: CartActor,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::list_cart(&state, &actor).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/add",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Cart with the added line and recomputed totals", body = ApiResponse<CartView>),
        (status = 400, description = "Invalid quantity or insufficient stock"),
        (status = 404, description = "Product not found"),
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    actor: CartActor,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::add_to_cart(&state, &actor, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/{id}/remove",
    params(
        ("id" = Uuid, Path, description = "Cart ID")
    ),
    request_body = RemoveFromCartRequest,
    responses(
        (status = 200, description = "Cart after removing the line", body = ApiResponse<CartView>),
        (status = 404, description = "Cart or line not found"),
    ),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    actor: CartActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<RemoveFromCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::remove_from_cart(&state, &actor, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/{id}/checkout",
    params(
        ("id" = Uuid, Path, description = "Cart ID")
    ),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order created from the cart", body = ApiResponse<OrderView>),
        (status = 400, description = "Cart is empty or stock insufficient"),
        (status = 403, description = "Not signed in"),
        (status = 404, description = "Cart or address not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn checkout(
    State(state): State<AppState>,
    actor: CartActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = cart_service::checkout(&state, &actor, id, payload).await?;
    Ok(Json(resp))
}
