use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, OrderView},
    entity::orders::{
        ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, Customer, Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

async fn customer_for_user(state: &AppState, user: &AuthUser) -> AppResult<Option<Customer>> {
    let customer = sqlx::query_as("SELECT * FROM customers WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?;
    Ok(customer)
}

/// List the requesting actor's own orders; nobody sees another's.
pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let Some(customer) = customer_for_user(state, user).await? else {
        return Ok(ApiResponse::success(
            "Ok",
            OrderList { items: Vec::new() },
            Some(Meta::new(page, limit, 0)),
        ));
    };

    let mut condition = Condition::all().add(OrderCol::CustomerId.eq(customer.id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    let customer = customer_for_user(state, user)
        .await?
        .ok_or(AppError::NotFound)?;

    let order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND customer_id = $2")
        .bind(id)
        .bind(customer.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;

    let items: Vec<OrderItem> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1")
            .bind(order.id)
            .fetch_all(&state.pool)
            .await?;

    let address: Option<Address> = match order.address_id {
        Some(address_id) => {
            sqlx::query_as("SELECT * FROM addresses WHERE id = $1")
                .bind(address_id)
                .fetch_optional(&state.pool)
                .await?
        }
        None => None,
    };

    Ok(ApiResponse::success(
        "OK",
        OrderView {
            order,
            address,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Direct order creation, not via checkout. The order carries no item
/// snapshots; it is tied to the actor's own customer record and triggers the
/// same best-effort SMS as checkout does.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderView>> {
    if payload.total_amount.is_sign_negative() {
        return Err(AppError::BadRequest("total_amount cannot be negative".into()));
    }

    let customer = customer_for_user(state, user)
        .await?
        .ok_or(AppError::NotFound)?;

    let address: Option<Address> = match payload.address_id {
        Some(address_id) => Some(
            sqlx::query_as("SELECT * FROM addresses WHERE id = $1 AND customer_id = $2")
                .bind(address_id)
                .bind(customer.id)
                .fetch_optional(&state.pool)
                .await?
                .ok_or(AppError::NotFound)?,
        ),
        None => None,
    };

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer.id),
        address_id: Set(address.as_ref().map(|a| a.id)),
        total_amount: Set(payload.total_amount),
        status: Set("Processing".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let message = format!("New order placed: {} for {}", order.id, order.total_amount);
    if let Err(err) = state.sms.send(&message, &[customer.phone.clone()]).await {
        tracing::warn!(error = %err, order_id = %order.id, "order SMS failed");
    }

    Ok(ApiResponse::success(
        "Order created",
        OrderView {
            order: order_from_entity(order),
            address,
            items: Vec::new(),
        },
        Some(Meta::empty()),
    ))
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        customer_id: model.customer_id,
        address_id: model.address_id,
        total_amount: model.total_amount,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
