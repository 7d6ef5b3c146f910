use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::customers::{
        AddressList, CreateAddressRequest, CreateCustomerRequest, CustomerDetail, CustomerList,
        UpdateCustomerRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, Customer},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/{id}", get(get_customer))
        .route("/{id}", put(update_customer))
        .route("/{id}", delete(delete_customer))
        .route("/{id}/addresses", get(list_addresses).post(create_address))
}

#[utoipa::path(
    get,
    path = "/api/customers",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List customers", body = ApiResponse<CustomerList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    let (page, limit, offset) = pagination.normalize();
    let items: Vec<Customer> =
        sqlx::query_as("SELECT * FROM customers ORDER BY name LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(Json(ApiResponse::success(
        "Customers",
        CustomerList { items },
        Some(meta),
    )))
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    params(
        ("id" = Uuid, Path, description = "Customer ID")
    ),
    responses(
        (status = 200, description = "Customer with addresses", body = ApiResponse<CustomerDetail>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CustomerDetail>>> {
    let customer: Customer = sqlx::query_as("SELECT * FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;

    let addresses: Vec<Address> = sqlx::query_as("SELECT * FROM addresses WHERE customer_id = $1")
        .bind(id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(ApiResponse::success(
        "Customer",
        CustomerDetail {
            customer,
            addresses,
        },
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 200, description = "Create a standalone customer record", body = ApiResponse<Customer>)
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateCustomerRequest>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let id = Uuid::new_v4();
    let code = format!("C{}", &id.to_string()[..8]);
    let customer: Customer = sqlx::query_as(
        "INSERT INTO customers (id, name, code, phone) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(id)
    .bind(payload.name)
    .bind(code)
    .bind(payload.phone)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Customer created",
        customer,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    params(
        ("id" = Uuid, Path, description = "Customer ID")
    ),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Updated customer", body = ApiResponse<Customer>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let existing: Customer = sqlx::query_as("SELECT * FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;

    let name = payload.name.unwrap_or(existing.name);
    let phone = payload.phone.unwrap_or(existing.phone);

    let customer: Customer = sqlx::query_as(
        "UPDATE customers SET name = $2, phone = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(phone)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Updated",
        customer,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    params(
        ("id" = Uuid, Path, description = "Customer ID")
    ),
    responses(
        (status = 200, description = "Deleted customer"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
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

#[utoipa::path(
    get,
    path = "/api/customers/{id}/addresses",
    params(
        ("id" = Uuid, Path, description = "Customer ID")
    ),
    responses(
        (status = 200, description = "Customer's addresses", body = ApiResponse<AddressList>),
        (status = 404, description = "Customer not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_none() {
        return Err(AppError::NotFound);
    }

    let items: Vec<Address> = sqlx::query_as("SELECT * FROM addresses WHERE customer_id = $1")
        .bind(id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(ApiResponse::success(
        "Addresses",
        AddressList { items },
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/customers/{id}/addresses",
    params(
        ("id" = Uuid, Path, description = "Customer ID")
    ),
    request_body = CreateAddressRequest,
    responses(
        (status = 200, description = "Address created", body = ApiResponse<Address>),
        (status = 404, description = "Customer not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn create_address(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateAddressRequest>,
) -> AppResult<Json<ApiResponse<Address>>> {
    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_none() {
        return Err(AppError::NotFound);
    }

    let address: Address = sqlx::query_as(
        r#"
        INSERT INTO addresses (id, customer_id, street, city, state, postal_code, country)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(id)
    .bind(payload.street)
    .bind(payload.city)
    .bind(payload.state)
    .bind(payload.postal_code)
    .bind(payload.country)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Address created",
        address,
        Some(Meta::empty()),
    )))
}
