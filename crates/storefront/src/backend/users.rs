//! Profile queries against `app_user`.

use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use bazaar_core::{Cart, Email, UserId, UserRole, Wishlist};

use super::rest::{Query, Rest};
use super::types::{BuyerUpdate, ShippingDetails, UserProfile, tables};
use super::BackendError;

/// Repository for profile operations.
pub struct UserRepository<'a> {
    rest: Rest<'a>,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(rest: Rest<'a>) -> Self {
        Self { rest }
    }

    fn by_id(user_id: UserId) -> Query {
        Query::table(tables::APP_USER).eq("user_id", user_id)
    }

    /// Get a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get(&self, user_id: UserId) -> Result<Option<UserProfile>, BackendError> {
        self.rest.fetch_optional(Self::by_id(user_id).select("*")).await
    }

    /// Find a profile by (normalized) email.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self, email))]
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<UserProfile>, BackendError> {
        let query = Query::table(tables::APP_USER)
            .select("*")
            .eq("user_email", email);
        self.rest.fetch_optional(query).await
    }

    /// Insert a new profile.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the user id is already taken.
    #[instrument(skip(self, profile), fields(user_id = %profile.user_id))]
    pub async fn create(&self, profile: &UserProfile) -> Result<(), BackendError> {
        self.rest.insert(tables::APP_USER, profile).await
    }

    /// Return the profile for `user_id`, creating it if missing.
    ///
    /// New profiles use `name` or, when blank, the email's local part, and
    /// start with an empty cart and wishlist and the customer role. Calling
    /// this for an existing user changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self, name, email), fields(user_id = %user_id))]
    pub async fn ensure(
        &self,
        user_id: UserId,
        name: Option<&str>,
        email: &Email,
    ) -> Result<(UserProfile, bool), BackendError> {
        if let Some(existing) = self.get(user_id).await? {
            return Ok((existing, false));
        }

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.local_part());
        let profile = UserProfile::new(user_id, name, email.as_str());

        match self.create(&profile).await {
            Ok(()) => {
                tracing::info!(user_id = %user_id, "Profile created");
                Ok((profile, true))
            }
            // Another request created it between our read and insert.
            Err(e) if e.is_conflict() => {
                let existing = self
                    .get(user_id)
                    .await?
                    .ok_or_else(|| BackendError::NotFound(format!("profile {user_id}")))?;
                Ok((existing, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Overwrite the shipping and contact fields.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self, shipping), fields(user_id = %user_id))]
    pub async fn update_shipping(
        &self,
        user_id: UserId,
        shipping: &ShippingDetails,
    ) -> Result<bool, BackendError> {
        let changed = self.rest.update(&Self::by_id(user_id), shipping).await?;
        Ok(changed > 0)
    }

    /// Overwrite email plus shipping fields (guest buyers found by email).
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn update_buyer(
        &self,
        user_id: UserId,
        email: &Email,
        shipping: &ShippingDetails,
    ) -> Result<bool, BackendError> {
        let body = BuyerUpdate {
            user_email: email.as_str(),
            shipping,
        };
        let changed = self.rest.update(&Self::by_id(user_id), &body).await?;
        Ok(changed > 0)
    }

    /// Persist the cart column.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self, cart), fields(user_id = %user_id, lines = cart.items().len()))]
    pub async fn save_cart(&self, user_id: UserId, cart: &Cart) -> Result<(), BackendError> {
        self.patch(user_id, &json!({ "user_cart": cart })).await
    }

    /// Persist the wishlist column.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self, wishlist), fields(user_id = %user_id))]
    pub async fn save_wishlist(
        &self,
        user_id: UserId,
        wishlist: &Wishlist,
    ) -> Result<(), BackendError> {
        self.patch(user_id, &json!({ "user_wish_list": wishlist }))
            .await
    }

    /// Persist both columns in one request (move-to-cart).
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn save_cart_and_wishlist(
        &self,
        user_id: UserId,
        cart: &Cart,
        wishlist: &Wishlist,
    ) -> Result<(), BackendError> {
        self.patch(
            user_id,
            &json!({ "user_cart": cart, "user_wish_list": wishlist }),
        )
        .await
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if no profile exists for the user.
    #[instrument(skip(self), fields(user_id = %user_id, role = %role))]
    pub async fn set_role(&self, user_id: UserId, role: UserRole) -> Result<(), BackendError> {
        self.patch(user_id, &json!({ "user_role": role })).await?;
        tracing::info!("User role changed");
        Ok(())
    }

    /// Number of profiles.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn count(&self) -> Result<u64, BackendError> {
        self.rest
            .count(&Query::table(tables::APP_USER).select("user_id"))
            .await
    }

    async fn patch<B: Serialize + ?Sized>(
        &self,
        user_id: UserId,
        body: &B,
    ) -> Result<(), BackendError> {
        let changed = self.rest.update(&Self::by_id(user_id), body).await?;
        if changed == 0 {
            return Err(BackendError::NotFound(format!("profile {user_id}")));
        }
        Ok(())
    }
}
