//! Money amounts and order totals using decimal arithmetic.
//!
//! The hosted database stores prices and line amounts as numeric columns,
//! which its REST API returns as JSON numbers. [`Price`] keeps the value as a
//! [`Decimal`] so cart subtotals never accumulate float error, and writes it
//! back out as a JSON number.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Sales tax applied to every order, as a fraction of the subtotal.
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Flat shipping fee charged on any non-empty order.
pub const SHIPPING_FEE: Decimal = Decimal::from_parts(1000, 0, 0, false, 2);

/// A non-negative amount in the store currency (USD).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(serialize_with = "rust_decimal::serde::float::serialize")] Decimal);

/// Errors from parsing a price typed into a form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Not a decimal number.
    #[error("price must be a number")]
    Invalid,
    /// Below zero.
    #[error("price cannot be negative")]
    Negative,
}

impl Price {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Build a price from whole cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Round half away from zero to whole cents.
    #[must_use]
    pub fn round_to_cents(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Format for display, e.g. `$19.99`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.round_to_cents().0)
    }

    /// Parse a price from form input such as `49.99` or `$49.99`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if the input is not a non-negative decimal.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let cleaned = input.trim().trim_start_matches('$').replace(',', "");
        let amount = Decimal::from_str(&cleaned).map_err(|_| PriceError::Invalid)?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Price {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

/// Subtotal, tax, shipping, and grand total for a cart or a placed order.
///
/// Tax is 10% of the subtotal rounded to cents; shipping is a flat $10.00
/// whenever the subtotal is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Price,
    pub tax: Price,
    pub shipping: Price,
    pub total: Price,
}

impl OrderTotals {
    /// Compute totals from the sum of line amounts.
    #[must_use]
    pub fn from_subtotal(subtotal: Price) -> Self {
        let tax = Price(subtotal.0 * TAX_RATE).round_to_cents();
        let shipping = if subtotal.0 > Decimal::ZERO {
            Price(SHIPPING_FEE)
        } else {
            Price::ZERO
        };
        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_cents() {
        assert_eq!(Price::from_cents(99_999).display(), "$999.99");
        assert_eq!(Price::from_cents(500).display(), "$5.00");
        assert_eq!(Price::ZERO.display(), "$0.00");
    }

    #[test]
    fn test_times_and_sum() {
        let lines = [Price::from_cents(4_999).times(2), Price::from_cents(12_999)];
        let subtotal: Price = lines.iter().sum();
        assert_eq!(subtotal, Price::from_cents(22_997));
    }

    #[test]
    fn test_totals_for_non_empty_order() {
        let totals = OrderTotals::from_subtotal(Price::from_cents(22_997));
        assert_eq!(totals.tax, Price::from_cents(2_300));
        assert_eq!(totals.shipping, Price::from_cents(1_000));
        assert_eq!(totals.total, Price::from_cents(26_297));
    }

    #[test]
    fn test_totals_for_empty_order_have_no_shipping() {
        let totals = OrderTotals::from_subtotal(Price::ZERO);
        assert_eq!(totals.shipping, Price::ZERO);
        assert_eq!(totals.total, Price::ZERO);
    }

    #[test]
    fn test_parse_form_input() {
        assert_eq!(Price::parse("49.99").unwrap(), Price::from_cents(4_999));
        assert_eq!(Price::parse(" $1,299.00 ").unwrap(), Price::from_cents(129_900));
        assert_eq!(Price::parse("abc"), Err(PriceError::Invalid));
        assert_eq!(Price::parse("-1"), Err(PriceError::Negative));
    }

    #[test]
    fn test_json_number_round_trip() {
        let price: Price = serde_json::from_str("129.99").unwrap();
        assert_eq!(price, Price::from_cents(12_999));
        assert_eq!(serde_json::to_string(&price).unwrap(), "129.99");
    }
}
