//! Saved-for-later product list stored in the `user_wish_list` column.

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, ProductSnapshot};
use crate::column::nullable;
use crate::types::{Price, ProductNo};

/// One saved product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub product_no: ProductNo,
    #[serde(default, deserialize_with = "nullable")]
    pub p_description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub product_price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_image: Option<String>,
}

impl From<ProductSnapshot> for WishlistItem {
    fn from(product: ProductSnapshot) -> Self {
        Self {
            product_no: product.product_no,
            p_description: product.p_description,
            product_price: product.product_price,
            product_image: product.product_image,
        }
    }
}

impl From<WishlistItem> for ProductSnapshot {
    fn from(item: WishlistItem) -> Self {
        Self {
            product_no: item.product_no,
            p_description: item.p_description,
            product_price: item.product_price,
            product_image: item.product_image,
        }
    }
}

/// Outcome of [`Wishlist::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// Ordered list of saved products, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<WishlistItem>", into = "Vec<WishlistItem>")]
pub struct Wishlist {
    items: Vec<WishlistItem>,
}

impl From<Vec<WishlistItem>> for Wishlist {
    fn from(items: Vec<WishlistItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<Wishlist> for Vec<WishlistItem> {
    fn from(wishlist: Wishlist) -> Self {
        wishlist.items
    }
}

impl Wishlist {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a wishlist from stored entries, keeping the first entry per product.
    #[must_use]
    pub fn from_items(items: Vec<WishlistItem>) -> Self {
        let mut wishlist = Self::new();
        for item in items {
            if !wishlist.contains(item.product_no) {
                wishlist.items.push(item);
            }
        }
        wishlist
    }

    #[must_use]
    pub fn items(&self) -> &[WishlistItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn contains(&self, product_no: ProductNo) -> bool {
        self.items.iter().any(|item| item.product_no == product_no)
    }

    /// Add the product if it is not saved yet, otherwise remove it.
    pub fn toggle(&mut self, product: ProductSnapshot) -> Toggled {
        if self.remove(product.product_no) {
            Toggled::Removed
        } else {
            self.items.push(product.into());
            Toggled::Added
        }
    }

    /// Remove a saved product. Returns whether it was present.
    pub fn remove(&mut self, product_no: ProductNo) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product_no != product_no);
        self.items.len() != before
    }

    /// Move a saved product into `cart`.
    ///
    /// One unit is added: an existing cart line gets its quantity bumped,
    /// otherwise the saved snapshot becomes a new line. Returns `false` and
    /// leaves both lists untouched if the product was not saved.
    pub fn move_to_cart(&mut self, product_no: ProductNo, cart: &mut Cart) -> bool {
        let Some(idx) = self
            .items
            .iter()
            .position(|item| item.product_no == product_no)
        else {
            return false;
        };
        let item = self.items.remove(idx);
        cart.add(item.into(), 1);
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(no: i64) -> ProductSnapshot {
        ProductSnapshot {
            product_no: ProductNo::new(no),
            p_description: format!("Product {no}"),
            product_price: Price::from_cents(1_999),
            product_image: Some(format!("https://img/{no}.jpg")),
        }
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut wishlist = Wishlist::new();
        assert_eq!(wishlist.toggle(product(1)), Toggled::Added);
        assert!(wishlist.contains(ProductNo::new(1)));
        assert_eq!(wishlist.toggle(product(1)), Toggled::Removed);
        assert!(wishlist.is_empty());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut wishlist = Wishlist::new();
        wishlist.toggle(product(1));
        assert!(!wishlist.remove(ProductNo::new(2)));
        assert_eq!(wishlist.len(), 1);
    }

    #[test]
    fn test_move_to_cart_appends_new_line() {
        let mut wishlist = Wishlist::new();
        wishlist.toggle(product(3));
        let mut cart = Cart::new();

        assert!(wishlist.move_to_cart(ProductNo::new(3), &mut cart));
        assert!(wishlist.is_empty());
        assert_eq!(cart.quantity_of(ProductNo::new(3)), 1);
        assert_eq!(
            cart.items()[0].product_image.as_deref(),
            Some("https://img/3.jpg")
        );
    }

    #[test]
    fn test_move_to_cart_bumps_existing_line() {
        let mut wishlist = Wishlist::new();
        wishlist.toggle(product(3));
        let mut cart = Cart::new();
        cart.add(product(3), 2);

        assert!(wishlist.move_to_cart(ProductNo::new(3), &mut cart));
        assert_eq!(cart.quantity_of(ProductNo::new(3)), 3);
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_move_unsaved_product_changes_nothing() {
        let mut wishlist = Wishlist::new();
        let mut cart = Cart::new();
        assert!(!wishlist.move_to_cart(ProductNo::new(8), &mut cart));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_stored_json_format() {
        let json = r#"[{"product_no":2,"p_description":"Casual T-Shirt","product_price":49.99}]"#;
        let wishlist: Wishlist = serde_json::from_str(json).unwrap();
        assert!(wishlist.contains(ProductNo::new(2)));
        assert_eq!(wishlist.items()[0].product_image, None);
    }

    #[test]
    fn test_stored_null_columns_decode_as_defaults() {
        let json = r#"[{"product_no":3,"p_description":null,"product_price":null,"product_image":null}]"#;
        let wishlist: Wishlist = serde_json::from_str(json).unwrap();
        assert!(wishlist.contains(ProductNo::new(3)));
        assert!(wishlist.items()[0].p_description.is_empty());
        assert_eq!(wishlist.items()[0].product_price, Price::ZERO);
    }

    #[test]
    fn test_stored_duplicates_keep_first_entry() {
        let json = r#"[
            {"product_no":2,"p_description":"Casual T-Shirt","product_price":49.99},
            {"product_no":2,"p_description":"Old Name","product_price":39.99}
        ]"#;
        let wishlist: Wishlist = serde_json::from_str(json).unwrap();
        assert_eq!(wishlist.len(), 1);
        assert_eq!(wishlist.items()[0].p_description, "Casual T-Shirt");
    }
}
