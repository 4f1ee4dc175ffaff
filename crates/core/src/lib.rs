//! Bazaar Core - Shared domain types and cart logic.
//!
//! This crate provides the types used across all Bazaar components:
//! - `storefront` - Public storefront and admin panel
//! - `cli` - Command-line tools for migrations, seeding, and admin promotion
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Cart reconciliation and order totals live here so
//! they can be tested without a backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, and statuses
//! - [`cart`] - Cart lines, quantity updates, and guest/server cart merging
//! - [`column`] - Lenient decoding for nullable JSON columns
//! - [`wishlist`] - Saved products and moving them into the cart

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod column;
pub mod types;
pub mod wishlist;

pub use cart::{Cart, CartItem, ProductSnapshot};
pub use column::nullable;
pub use types::*;
pub use wishlist::{Toggled, Wishlist, WishlistItem};
