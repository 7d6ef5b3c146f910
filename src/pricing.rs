//! Cart pricing. Totals are recomputed from the current line items on every
//! read and never stored on the cart row.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// 10% flat tax applied to the subtotal.
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Flat shipping fee per order.
pub const SHIPPING_FEE: Decimal = Decimal::from_parts(500, 0, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CartTotals {
    #[schema(value_type = String, example = "30.00")]
    pub subtotal: Decimal,
    #[schema(value_type = String, example = "3.00")]
    pub tax: Decimal,
    #[schema(value_type = String, example = "5.00")]
    pub shipping: Decimal,
    #[schema(value_type = String, example = "38.00")]
    pub total: Decimal,
}

/// Compute subtotal/tax/shipping/total from (unit price, quantity) lines.
pub fn cart_totals<I>(lines: I) -> CartTotals
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    let subtotal: Decimal = lines
        .into_iter()
        .map(|(price, quantity)| price * Decimal::from(quantity))
        .sum();
    let tax = (subtotal * TAX_RATE).round_dp(2);
    CartTotals {
        subtotal,
        tax,
        shipping: SHIPPING_FEE,
        total: subtotal + tax + SHIPPING_FEE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn totals_for_single_line() {
        let totals = cart_totals([(dec("10.00"), 3)]);
        assert_eq!(totals.subtotal, dec("30.00"));
        assert_eq!(totals.tax, dec("3.00"));
        assert_eq!(totals.shipping, dec("5.00"));
        assert_eq!(totals.total, dec("38.00"));
    }

    #[test]
    fn totals_identity_holds() {
        let totals = cart_totals([(dec("19.99"), 2), (dec("3.49"), 5)]);
        assert_eq!(totals.total, totals.subtotal + totals.tax + totals.shipping);
        assert_eq!(totals.tax, (totals.subtotal * TAX_RATE).round_dp(2));
    }

    #[test]
    fn tax_rounds_to_cents() {
        // 0.15 * 0.10 = 0.015, rounds to 0.02 (banker's rounding rounds to even: 0.02).
        let totals = cart_totals([(dec("0.15"), 1)]);
        assert_eq!(totals.tax, dec("0.02"));
    }

    #[test]
    fn empty_cart_still_charges_shipping_only_in_total() {
        let totals = cart_totals([]);
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, SHIPPING_FEE);
    }
}
