//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Sign-in, sign-up, sign-out, and password recovery through the hosted auth API
//! - `cart` - Where the active cart lives (session or profile) and guest cart merging
//! - `checkout` - Turning a cart into an order, line items, and a payment record
//! - `catalog` - The sample catalog used to seed an empty store

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

pub use auth::{AuthError, AuthService, SignUpResult};
pub use cart::{CartError, CartService};
pub use checkout::{Buyer, CheckoutError, CheckoutService, PlacedOrder, combine_address};
