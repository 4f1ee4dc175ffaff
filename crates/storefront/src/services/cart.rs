//! Active cart storage.
//!
//! Guests keep their cart in the session. Signed-in users keep it in the
//! `user_cart` column of their profile, so it follows them across devices.
//! Every save also refreshes the cart badge count cached in the session.

use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{Cart, ProductNo};

use crate::backend::{BackendClient, BackendError};
use crate::models::{CurrentUser, session_keys};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductNo),

    /// The product has no units available.
    #[error("product {0} is out of stock")]
    OutOfStock(ProductNo),

    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Reads and writes the active cart for one request.
pub struct CartService<'a> {
    backend: &'a BackendClient,
    session: &'a Session,
    user: Option<&'a CurrentUser>,
}

impl<'a> CartService<'a> {
    /// Create a cart service for the current visitor.
    #[must_use]
    pub const fn new(
        backend: &'a BackendClient,
        session: &'a Session,
        user: Option<&'a CurrentUser>,
    ) -> Self {
        Self {
            backend,
            session,
            user,
        }
    }

    /// Load the active cart.
    ///
    /// A signed-in user without a profile row has an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the profile or session cannot be read.
    pub async fn load(&self) -> Result<Cart, CartError> {
        match self.user {
            Some(user) => {
                let profile = self
                    .backend
                    .as_user(&user.access_token)
                    .users()
                    .get(user.id)
                    .await?;
                Ok(profile.map(|p| p.user_cart).unwrap_or_default())
            }
            None => Ok(load_guest_cart(self.session).await?),
        }
    }

    /// Persist the cart where it was loaded from.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the profile or session cannot be written.
    pub async fn save(&self, cart: &Cart) -> Result<(), CartError> {
        match self.user {
            Some(user) => {
                self.backend
                    .as_user(&user.access_token)
                    .users()
                    .save_cart(user.id, cart)
                    .await?;
            }
            None => self.session.insert(session_keys::GUEST_CART, cart).await?,
        }
        set_cart_count(self.session, cart.item_count()).await;
        Ok(())
    }

    /// Add `quantity` units of a catalog product.
    ///
    /// The line is priced from the catalog, not from the request.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` or `CartError::OutOfStock` when
    /// the product cannot be added.
    #[instrument(skip(self), fields(product_no = %product_no))]
    pub async fn add(&self, product_no: ProductNo, quantity: u32) -> Result<Cart, CartError> {
        let product = self
            .backend
            .anon()
            .products()
            .get(product_no)
            .await?
            .ok_or(CartError::ProductNotFound(product_no))?;
        if !product.in_stock() {
            return Err(CartError::OutOfStock(product_no));
        }

        let mut cart = self.load().await?;
        cart.add(product.snapshot(), quantity.max(1));
        self.save(&cart).await?;
        Ok(cart)
    }

    /// Set a line's quantity; below 1 removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the cart cannot be loaded or saved.
    #[instrument(skip(self), fields(product_no = %product_no))]
    pub async fn update_quantity(
        &self,
        product_no: ProductNo,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        let mut cart = self.load().await?;
        if cart.update_quantity(product_no, quantity) {
            self.save(&cart).await?;
        }
        Ok(cart)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the cart cannot be loaded or saved.
    #[instrument(skip(self), fields(product_no = %product_no))]
    pub async fn remove(&self, product_no: ProductNo) -> Result<Cart, CartError> {
        let mut cart = self.load().await?;
        if cart.remove(product_no) {
            self.save(&cart).await?;
        }
        Ok(cart)
    }

    /// Empty the cart (after a successful checkout).
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the cart cannot be saved.
    pub async fn clear(&self) -> Result<(), CartError> {
        self.save(&Cart::new()).await
    }
}

/// Fold the session's guest cart into a user's stored cart after sign-in.
///
/// The guest cart is only removed from the session once the merged cart has
/// been saved, so a failed save loses nothing.
///
/// # Errors
///
/// Returns `CartError` if the profile cannot be read or written.
#[instrument(skip(backend, session, user), fields(user_id = %user.id))]
pub async fn merge_guest_cart_on_sign_in(
    backend: &BackendClient,
    session: &Session,
    user: &CurrentUser,
) -> Result<Cart, CartError> {
    let guest = load_guest_cart(session).await?;
    let users = backend.as_user(&user.access_token).users();
    let mut cart = users
        .get(user.id)
        .await?
        .map(|p| p.user_cart)
        .unwrap_or_default();

    if !guest.is_empty() {
        let guest_lines = guest.items().len();
        cart.merge(guest);
        users.save_cart(user.id, &cart).await?;
        tracing::info!(guest_lines, merged_lines = cart.items().len(), "Guest cart merged");
    }

    session.remove::<Cart>(session_keys::GUEST_CART).await?;
    set_cart_count(session, cart.item_count()).await;
    Ok(cart)
}

/// Cart badge count cached in the session.
pub async fn cart_count(session: &Session) -> u32 {
    session
        .get::<u32>(session_keys::CART_COUNT)
        .await
        .ok()
        .flatten()
        .unwrap_or(0)
}

/// Update the cached badge count. Failures only affect the badge.
pub async fn set_cart_count(session: &Session, count: u32) {
    if let Err(e) = session.insert(session_keys::CART_COUNT, count).await {
        tracing::warn!(error = %e, "Failed to cache cart count");
    }
}

async fn load_guest_cart(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session
        .get::<Cart>(session_keys::GUEST_CART)
        .await?
        .unwrap_or_default())
}
