use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::cart::{AddToCartRequest, CartItemView, CartView, CheckoutRequest, RemoveFromCartRequest},
    dto::orders::OrderView,
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        order_items::ActiveModel as OrderItemActive,
        orders::ActiveModel as OrderActive,
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::CartActor,
    models::{Address, Cart, CartItem, Customer, Order, OrderItem, Product},
    pricing,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Merge an add request into an existing cart line. Incrementing past the
/// available stock clamps the line to the full stock instead of failing,
/// so repeated adds converge on "as many as we can sell".
fn merge_quantity(existing: Option<i32>, requested: i32, stock: i32) -> i32 {
    match existing {
        Some(current) if current + requested <= stock => current + requested,
        Some(_) => stock,
        None => requested,
    }
}

fn customer_code(user_id: Uuid) -> String {
    let id = user_id.to_string();
    format!("C{}", &id[..8])
}

/// Locate or create the cart for the current actor.
///
/// Both the customer and the cart are written with a single-statement upsert
/// against their uniqueness constraints, so concurrent first requests settle
/// on one row instead of racing a check-then-insert.
pub async fn resolve_cart(pool: &DbPool, actor: &CartActor) -> AppResult<Cart> {
    match actor {
        CartActor::User(user) => {
            let email: (String,) = sqlx::query_as("SELECT email FROM users WHERE id = $1")
                .bind(user.user_id)
                .fetch_optional(pool)
                .await?
                .ok_or(AppError::NotFound)?;
            let name = email.0.split('@').next().unwrap_or(&email.0).to_string();

            let customer: Customer = sqlx::query_as(
                r#"
                INSERT INTO customers (id, user_id, name, code, phone)
                VALUES ($1, $2, $3, $4, '')
                ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user.user_id)
            .bind(name)
            .bind(customer_code(user.user_id))
            .fetch_one(pool)
            .await?;

            let cart: Cart = sqlx::query_as(
                r#"
                INSERT INTO carts (id, customer_id)
                VALUES ($1, $2)
                ON CONFLICT (customer_id) DO UPDATE SET customer_id = EXCLUDED.customer_id
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(customer.id)
            .fetch_one(pool)
            .await?;
            Ok(cart)
        }
        CartActor::Session(session_key) => {
            let cart: Cart = sqlx::query_as(
                r#"
                INSERT INTO carts (id, session_key)
                VALUES ($1, $2)
                ON CONFLICT (session_key) DO UPDATE SET session_key = EXCLUDED.session_key
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(session_key)
            .fetch_one(pool)
            .await?;
            Ok(cart)
        }
    }
}

/// Fetch a cart by id, scoped to the requesting actor. Another actor's cart
/// is indistinguishable from a missing one.
async fn find_cart_for_actor(pool: &DbPool, actor: &CartActor, cart_id: Uuid) -> AppResult<Cart> {
    let cart: Option<Cart> = match actor {
        CartActor::User(user) => {
            sqlx::query_as(
                r#"
                SELECT ct.* FROM carts ct
                JOIN customers cu ON cu.id = ct.customer_id
                WHERE ct.id = $1 AND cu.user_id = $2
                "#,
            )
            .bind(cart_id)
            .bind(user.user_id)
            .fetch_optional(pool)
            .await?
        }
        CartActor::Session(session_key) => {
            sqlx::query_as("SELECT * FROM carts WHERE id = $1 AND session_key = $2")
                .bind(cart_id)
                .bind(session_key)
                .fetch_optional(pool)
                .await?
        }
    };
    cart.ok_or(AppError::NotFound)
}

#[derive(FromRow)]
struct CartLineRow {
    item_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    vendor_id: Uuid,
    name: String,
    price: Decimal,
    stock: i32,
    description: String,
    created_at: DateTime<Utc>,
}

/// Assemble the priced cart representation from the current line items.
pub async fn cart_view(pool: &DbPool, cart: Cart) -> AppResult<CartView> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        r#"
        SELECT ci.id AS item_id, ci.quantity,
               p.id AS product_id, p.vendor_id, p.name, p.price, p.stock,
               p.description, p.created_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY ci.created_at
        "#,
    )
    .bind(cart.id)
    .fetch_all(pool)
    .await?;

    let totals = pricing::cart_totals(rows.iter().map(|row| (row.price, row.quantity)));
    let items = rows
        .into_iter()
        .map(|row| CartItemView {
            id: row.item_id,
            product: Product {
                id: row.product_id,
                vendor_id: row.vendor_id,
                name: row.name,
                price: row.price,
                stock: row.stock,
                description: row.description,
                created_at: row.created_at,
            },
            quantity: row.quantity,
        })
        .collect();

    Ok(CartView {
        id: cart.id,
        customer_id: cart.customer_id,
        session_key: cart.session_key,
        items,
        subtotal: totals.subtotal,
        tax: totals.tax,
        shipping: totals.shipping,
        total: totals.total,
    })
}

pub async fn list_cart(state: &AppState, actor: &CartActor) -> AppResult<ApiResponse<CartView>> {
    let cart = resolve_cart(&state.pool, actor).await?;
    let view = cart_view(&state.pool, cart).await?;
    Ok(ApiResponse::success("OK", view, None))
}

pub async fn add_to_cart(
    state: &AppState,
    actor: &CartActor,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let requested = payload.quantity.unwrap_or(1);
    if requested <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product: Product = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;

    if requested > product.stock {
        return Err(AppError::BadRequest(format!(
            "Only {} in stock",
            product.stock
        )));
    }

    let cart = resolve_cart(&state.pool, actor).await?;

    let existing: Option<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart.id)
            .bind(product.id)
            .fetch_optional(&state.pool)
            .await?;

    let quantity = merge_quantity(existing.as_ref().map(|item| item.quantity), requested, product.stock);

    // Second enforcement point: the write itself re-checks quantity against
    // the product's stock, so a concurrent stock change fails the save
    // instead of leaving an oversized line.
    let result = if let Some(item) = existing {
        sqlx::query(
            r#"
            UPDATE cart_items SET quantity = $2
            WHERE id = $1
              AND $2 <= (SELECT stock FROM products WHERE id = cart_items.product_id)
            "#,
        )
        .bind(item.id)
        .bind(quantity)
        .execute(&state.pool)
        .await?
    } else {
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity)
            SELECT $1, $2, $3, $4
            WHERE $4 <= (SELECT stock FROM products WHERE id = $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cart.id)
        .bind(product.id)
        .bind(quantity)
        .execute(&state.pool)
        .await?
    };
    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest(
            "quantity exceeds available stock".to_string(),
        ));
    }

    let view = cart_view(&state.pool, cart).await?;
    Ok(ApiResponse::success("OK", view, None))
}

pub async fn remove_from_cart(
    state: &AppState,
    actor: &CartActor,
    cart_id: Uuid,
    payload: RemoveFromCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let cart = find_cart_for_actor(&state.pool, actor, cart_id).await?;

    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart.id)
        .bind(payload.product_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    let view = cart_view(&state.pool, cart).await?;
    Ok(ApiResponse::success("Removed from cart", view, None))
}

#[derive(FromRow)]
struct CartOwnerRow {
    cart_id: Uuid,
    customer_id: Uuid,
    phone: String,
}

/// Convert the cart into an order inside one transaction: order row, item
/// snapshots at current prices, conditional stock decrements, cart cleared.
/// Any insufficient stock rolls the whole checkout back. The confirmation
/// SMS goes out after commit and never fails the checkout.
pub async fn checkout(
    state: &AppState,
    actor: &CartActor,
    cart_id: Uuid,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderView>> {
    let user = match actor {
        CartActor::User(user) => user,
        CartActor::Session(_) => {
            return Err(AppError::Forbidden("Please sign in to checkout".into()));
        }
    };

    let owner: CartOwnerRow = sqlx::query_as(
        r#"
        SELECT ct.id AS cart_id, cu.id AS customer_id, cu.phone
        FROM carts ct
        JOIN customers cu ON cu.id = ct.customer_id
        WHERE ct.id = $1 AND cu.user_id = $2
        "#,
    )
    .bind(cart_id)
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;

    let address: Address =
        sqlx::query_as("SELECT * FROM addresses WHERE id = $1 AND customer_id = $2")
            .bind(payload.address_id)
            .bind(owner.customer_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(AppError::NotFound)?;

    let txn = state.orm.begin().await?;

    let lines = CartItems::find()
        .filter(CartItemCol::CartId.eq(owner.cart_id))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let product_ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
    let products: HashMap<Uuid, crate::entity::products::Model> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let mut priced = Vec::with_capacity(lines.len());
    for line in &lines {
        let product = products.get(&line.product_id).ok_or(AppError::NotFound)?;
        priced.push((product.price, line.quantity));
    }
    let totals = pricing::cart_totals(priced);

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(owner.customer_id),
        address_id: Set(Some(address.id)),
        total_amount: Set(totals.total),
        status: Set("Processing".into()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::new();
    for line in &lines {
        let product = products.get(&line.product_id).ok_or(AppError::NotFound)?;

        // Snapshot the price at checkout time, not cart-add time.
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(line.quantity),
            price: Set(product.price),
        }
        .insert(&txn)
        .await?;
        order_items.push(OrderItem {
            id: item.id,
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
        });

        // Conditional decrement: refuse to commit an oversell if stock moved
        // underneath us since the add-to-cart validation.
        let result = Products::update_many()
            .col_expr(
                ProdCol::Stock,
                Expr::col(ProdCol::Stock).sub(line.quantity),
            )
            .filter(ProdCol::Id.eq(product.id))
            .filter(ProdCol::Stock.gte(line.quantity))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                product.id
            )));
        }
    }

    // Cart is cleared but the cart row itself persists for reuse.
    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(owner.cart_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    let message = format!("Your order #{} is being processed.", order.id);
    if let Err(err) = state.sms.send(&message, &[owner.phone.clone()]).await {
        tracing::warn!(error = %err, order_id = %order.id, "order confirmation SMS failed");
    }

    let view = OrderView {
        order: Order {
            id: order.id,
            customer_id: order.customer_id,
            address_id: order.address_id,
            total_amount: order.total_amount,
            status: order.status,
            created_at: order.created_at.with_timezone(&Utc),
        },
        address: Some(address),
        items: order_items,
    };
    Ok(ApiResponse::success(
        "Checkout successful! Your order is being processed.",
        view,
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::merge_quantity;

    #[test]
    fn new_line_takes_requested_quantity() {
        assert_eq!(merge_quantity(None, 3, 5), 3);
    }

    #[test]
    fn increments_within_stock() {
        assert_eq!(merge_quantity(Some(2), 3, 5), 5);
        assert_eq!(merge_quantity(Some(1), 1, 5), 2);
    }

    #[test]
    fn clamps_to_stock_when_increment_would_exceed() {
        // 3 already in the cart, 3 more requested, only 5 sellable.
        assert_eq!(merge_quantity(Some(3), 3, 5), 5);
        assert_eq!(merge_quantity(Some(5), 1, 5), 5);
    }
}
