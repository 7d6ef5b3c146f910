use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    /// Defaults to 1 when omitted.
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveFromCartRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub address_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemView {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
}

/// Full cart representation returned by every cart mutation. Totals are
/// recomputed from the current lines on each build; `session_key` is set for
/// anonymous carts so the client can keep addressing the same cart.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub session_key: Option<String>,
    pub items: Vec<CartItemView>,
    #[schema(value_type = String, example = "30.00")]
    pub subtotal: Decimal,
    #[schema(value_type = String, example = "3.00")]
    pub tax: Decimal,
    #[schema(value_type = String, example = "5.00")]
    pub shipping: Decimal,
    #[schema(value_type = String, example = "38.00")]
    pub total: Decimal,
}
