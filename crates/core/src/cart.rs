//! Shopping cart lines and reconciliation.
//!
//! A cart is an ordered list of `(product, quantity)` lines. Guests keep
//! theirs in the browser session; signed-in users keep theirs in the
//! `user_cart` JSON column of their profile row. The JSON field names below
//! are that column's format and must not change.
//!
//! When a guest signs in, [`Cart::merge`] folds the guest cart into the stored
//! one so nothing the guest picked is lost and each product keeps a single
//! line.

use serde::{Deserialize, Serialize};

use crate::column::nullable;
use crate::types::{OrderTotals, Price, ProductNo};

/// Catalog fields copied onto cart and wishlist lines when a product is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_no: ProductNo,
    #[serde(default, deserialize_with = "nullable")]
    pub p_description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub product_price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_image: Option<String>,
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_no: ProductNo,
    #[serde(default, deserialize_with = "nullable")]
    pub p_description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub product_price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_image: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub quantity: u32,
}

impl CartItem {
    /// Build a line from a catalog snapshot.
    #[must_use]
    pub fn new(product: ProductSnapshot, quantity: u32) -> Self {
        Self {
            product_no: product.product_no,
            p_description: product.p_description,
            product_price: product.product_price,
            product_image: product.product_image,
            quantity,
        }
    }

    /// Price of the whole line (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product_price.times(self.quantity)
    }
}

/// An ordered collection of cart lines, at most one per product.
///
/// Stored lines are decoded through [`Cart::from_items`], so duplicate and
/// zero-quantity lines written by other clients are folded away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl From<Vec<CartItem>> for Cart {
    fn from(items: Vec<CartItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from stored lines, folding duplicate products together.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            cart.push_line(item);
        }
        cart
    }

    /// The cart lines in display order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Consume the cart, returning its lines.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Quantity of a product currently in the cart (0 if absent).
    #[must_use]
    pub fn quantity_of(&self, product_no: ProductNo) -> u32 {
        self.position(product_no)
            .and_then(|idx| self.items.get(idx))
            .map_or(0, |item| item.quantity)
    }

    /// Add `quantity` units of a product.
    ///
    /// An existing line keeps its original snapshot and has its quantity
    /// increased; otherwise a new line is appended. Adding zero units does
    /// nothing.
    pub fn add(&mut self, product: ProductSnapshot, quantity: u32) {
        if quantity == 0 {
            return;
        }
        self.push_line(CartItem::new(product, quantity));
    }

    /// Remove a product's line. Returns whether a line was removed.
    pub fn remove(&mut self, product_no: ProductNo) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product_no != product_no);
        self.items.len() != before
    }

    /// Set a line's quantity. A quantity below 1 removes the line.
    ///
    /// Returns whether the cart changed.
    pub fn update_quantity(&mut self, product_no: ProductNo, quantity: u32) -> bool {
        if quantity < 1 {
            return self.remove(product_no);
        }
        match self.items.iter_mut().find(|item| item.product_no == product_no) {
            Some(item) if item.quantity != quantity => {
                item.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Subtotal plus tax and shipping.
    #[must_use]
    pub fn totals(&self) -> OrderTotals {
        OrderTotals::from_subtotal(self.subtotal())
    }

    /// Fold a guest cart into this (stored) cart.
    ///
    /// Lines for products already present have their quantities summed; new
    /// products are appended in the guest cart's order. Existing lines keep
    /// their position, so the result contains every product from both carts
    /// exactly once and `item_count` is the sum of both counts.
    pub fn merge(&mut self, guest: Self) {
        for item in guest.items {
            self.push_line(item);
        }
    }

    fn position(&self, product_no: ProductNo) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product_no == product_no)
    }

    fn push_line(&mut self, line: CartItem) {
        if line.quantity == 0 {
            return;
        }
        match self
            .items
            .iter_mut()
            .find(|item| item.product_no == line.product_no)
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => self.items.push(line),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(no: i64, cents: i64) -> ProductSnapshot {
        ProductSnapshot {
            product_no: ProductNo::new(no),
            p_description: format!("Product {no}"),
            product_price: Price::from_cents(cents),
            product_image: None,
        }
    }

    #[test]
    fn test_add_new_and_existing_product() {
        let mut cart = Cart::new();
        cart.add(product(1, 999), 1);
        cart.add(product(2, 4_999), 2);
        cart.add(product(1, 999), 3);

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.quantity_of(ProductNo::new(1)), 4);
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_add_keeps_first_snapshot() {
        let mut cart = Cart::new();
        cart.add(product(1, 999), 1);
        cart.add(product(1, 1_299), 1);
        assert_eq!(cart.items()[0].product_price, Price::from_cents(999));
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut cart = Cart::new();
        cart.add(product(1, 999), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_below_one_removes() {
        let mut cart = Cart::new();
        cart.add(product(1, 999), 2);
        assert!(cart.update_quantity(ProductNo::new(1), 5));
        assert_eq!(cart.quantity_of(ProductNo::new(1)), 5);

        assert!(cart.update_quantity(ProductNo::new(1), 0));
        assert!(cart.is_empty());
        assert!(!cart.update_quantity(ProductNo::new(9), 3));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(product(1, 999), 1);
        cart.add(product(2, 999), 1);
        assert!(cart.remove(ProductNo::new(1)));
        assert!(!cart.remove(ProductNo::new(1)));
        assert_eq!(cart.items().len(), 1);
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_subtotal_and_totals() {
        let mut cart = Cart::new();
        cart.add(product(1, 99_999), 1);
        cart.add(product(2, 4_999), 2);

        assert_eq!(cart.subtotal(), Price::from_cents(109_997));
        let totals = cart.totals();
        assert_eq!(totals.tax, Price::from_cents(11_000));
        assert_eq!(totals.shipping, Price::from_cents(1_000));
        assert_eq!(totals.total, Price::from_cents(121_997));
    }

    #[test]
    fn test_merge_sums_shared_lines_and_appends_new_ones() {
        let mut stored = Cart::new();
        stored.add(product(1, 999), 1);
        stored.add(product(2, 4_999), 1);

        let mut guest = Cart::new();
        guest.add(product(3, 12_999), 1);
        guest.add(product(2, 4_999), 2);

        let expected_count = stored.item_count() + guest.item_count();
        stored.merge(guest);

        let order: Vec<i64> = stored
            .items()
            .iter()
            .map(|item| item.product_no.as_i64())
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(stored.quantity_of(ProductNo::new(2)), 3);
        assert_eq!(stored.item_count(), expected_count);
    }

    #[test]
    fn test_merge_into_empty_cart_keeps_guest_lines() {
        let mut stored = Cart::new();
        let mut guest = Cart::new();
        guest.add(product(5, 500), 2);
        stored.merge(guest.clone());
        assert_eq!(stored, guest);
    }

    #[test]
    fn test_from_items_folds_duplicates() {
        let cart = Cart::from_items(vec![
            CartItem::new(product(1, 100), 1),
            CartItem::new(product(1, 100), 2),
        ]);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_stored_json_format() {
        let json = r#"[{"product_no":4,"p_description":"Wireless Headphones","product_price":79.99,"product_image":"https://img/4.jpg","quantity":2}]"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.subtotal(), Price::from_cents(15_998));

        let written = serde_json::to_value(&cart).unwrap();
        assert_eq!(written[0]["product_no"], 4);
        assert_eq!(written[0]["product_price"], 79.99);
        assert_eq!(written[0]["quantity"], 2);
    }

    #[test]
    fn test_stored_null_columns_decode_as_defaults() {
        let json = r#"[{"product_no":3,"p_description":null,"product_price":null,"product_image":null,"quantity":1}]"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert!(cart.items()[0].p_description.is_empty());
        assert_eq!(cart.items()[0].product_price, Price::ZERO);
        assert_eq!(cart.items()[0].product_image, None);
    }

    #[test]
    fn test_stored_duplicate_and_empty_lines_are_folded() {
        let json = r#"[
            {"product_no":3,"p_description":"Running Shoes","product_price":129.99,"quantity":1},
            {"product_no":7,"p_description":"Desk Lamp","product_price":39.99,"quantity":0},
            {"product_no":3,"p_description":"Running Shoes","product_price":129.99,"quantity":2},
            {"product_no":8,"p_description":"Mug","product_price":9.99,"quantity":null}
        ]"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.quantity_of(ProductNo::new(3)), 3);
        assert_eq!(cart.quantity_of(ProductNo::new(7)), 0);
    }
}
