//! Profile, addresses, users, reviews and notifications.

use sapa_core::{AddressId, NotificationId, Page, PageRequest, ProductId, ReviewId, UserId};
use serde::Serialize;
use serde::de::IgnoredAny;
use tracing::instrument;

use crate::auth::AuthSession;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::{
    Address, AddressInput, Notification, PasswordChange, ProfileUpdate, Review, ReviewInput,
    ReviewQuery, UnreadCount, User, UserQuery, UserUpdate,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VisibilityBody {
    is_visible: bool,
}

fn page_pairs(page: PageRequest) -> [(&'static str, String); 2] {
    [
        ("page", page.page.to_string()),
        ("limit", page.limit.to_string()),
    ]
}

impl ApiClient {
    // =========================================================================
    // Profile
    // =========================================================================

    /// Update the caller's name and phone.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` on bad input.
    #[instrument(skip_all)]
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
        auth: &AuthSession,
    ) -> Result<User, ApiError> {
        self.patch("/users/me", update, Some(auth)).await
    }

    /// Change the caller's password.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the current password is wrong.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        change: &PasswordChange,
        auth: &AuthSession,
    ) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .post("/users/me/password", change, Some(auth))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// The caller's saved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn list_addresses(&self, auth: &AuthSession) -> Result<Vec<Address>, ApiError> {
        self.get("/users/me/addresses", &[], Some(auth)).await
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` on missing fields.
    #[instrument(skip_all)]
    pub async fn create_address(
        &self,
        input: &AddressInput,
        auth: &AuthSession,
    ) -> Result<Address, ApiError> {
        self.post("/users/me/addresses", input, Some(auth)).await
    }

    /// Update a saved address.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` or `ApiError::Validation`.
    #[instrument(skip(self, input, auth), fields(address_id = %id))]
    pub async fn update_address(
        &self,
        id: &AddressId,
        input: &AddressInput,
        auth: &AuthSession,
    ) -> Result<Address, ApiError> {
        self.patch(&format!("/users/me/addresses/{id}"), input, Some(auth))
            .await
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if it does not exist.
    #[instrument(skip(self, auth), fields(address_id = %id))]
    pub async fn delete_address(&self, id: &AddressId, auth: &AuthSession) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .delete(&format!("/users/me/addresses/{id}"), Some(auth))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Users (admin)
    // =========================================================================

    /// List accounts.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-admins.
    #[instrument(skip(self, auth))]
    pub async fn list_users(
        &self,
        query: &UserQuery,
        auth: &AuthSession,
    ) -> Result<Page<User>, ApiError> {
        self.get("/users", &query.to_pairs(), Some(auth)).await
    }

    /// One account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if it does not exist.
    #[instrument(skip(self, auth), fields(user_id = %id))]
    pub async fn get_user(&self, id: &UserId, auth: &AuthSession) -> Result<User, ApiError> {
        self.get(&format!("/users/{id}"), &[], Some(auth)).await
    }

    /// Change an account's role or active flag.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` on bad input.
    #[instrument(skip(self, auth), fields(user_id = %id))]
    pub async fn update_user(
        &self,
        id: &UserId,
        update: &UserUpdate,
        auth: &AuthSession,
    ) -> Result<User, ApiError> {
        self.patch(&format!("/users/{id}"), update, Some(auth))
            .await
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if the account has orders.
    #[instrument(skip(self, auth), fields(user_id = %id))]
    pub async fn delete_user(&self, id: &UserId, auth: &AuthSession) -> Result<(), ApiError> {
        let _: IgnoredAny = self.delete(&format!("/users/{id}"), Some(auth)).await?;
        Ok(())
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Visible reviews of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn product_reviews(
        &self,
        product_id: &ProductId,
        page: PageRequest,
    ) -> Result<Page<Review>, ApiError> {
        self.get(
            &format!("/products/{product_id}/reviews"),
            &page_pairs(page),
            None,
        )
        .await
    }

    /// Review a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` if the caller has not bought it, or
    /// `ApiError::Conflict` if they already reviewed it.
    #[instrument(skip(self, input, auth), fields(product_id = %product_id, rating = input.rating))]
    pub async fn create_review(
        &self,
        product_id: &ProductId,
        input: &ReviewInput,
        auth: &AuthSession,
    ) -> Result<Review, ApiError> {
        let review = self
            .post(&format!("/products/{product_id}/reviews"), input, Some(auth))
            .await?;
        // Rating and review count are embedded in products.
        self.invalidate_products().await;
        Ok(review)
    }

    /// All reviews (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-admins.
    #[instrument(skip(self, auth))]
    pub async fn list_reviews(
        &self,
        query: &ReviewQuery,
        auth: &AuthSession,
    ) -> Result<Page<Review>, ApiError> {
        self.get("/reviews", &query.to_pairs(), Some(auth)).await
    }

    /// Hide or show a review (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if it does not exist.
    #[instrument(skip(self, auth), fields(review_id = %id))]
    pub async fn set_review_visibility(
        &self,
        id: &ReviewId,
        is_visible: bool,
        auth: &AuthSession,
    ) -> Result<Review, ApiError> {
        let review = self
            .patch(
                &format!("/reviews/{id}"),
                &VisibilityBody { is_visible },
                Some(auth),
            )
            .await?;
        self.invalidate_products().await;
        Ok(review)
    }

    /// Delete a review (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if it does not exist.
    #[instrument(skip(self, auth), fields(review_id = %id))]
    pub async fn delete_review(&self, id: &ReviewId, auth: &AuthSession) -> Result<(), ApiError> {
        let _: IgnoredAny = self.delete(&format!("/reviews/{id}"), Some(auth)).await?;
        self.invalidate_products().await;
        Ok(())
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// The caller's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn list_notifications(
        &self,
        page: PageRequest,
        auth: &AuthSession,
    ) -> Result<Page<Notification>, ApiError> {
        self.get("/notifications", &page_pairs(page), Some(auth))
            .await
    }

    /// Number of unread notifications, for the header badge.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn unread_count(&self, auth: &AuthSession) -> Result<u64, ApiError> {
        let count: UnreadCount = self
            .get("/notifications/unread-count", &[], Some(auth))
            .await?;
        Ok(count.count)
    }

    /// Mark one notification read.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if it does not exist.
    #[instrument(skip(self, auth), fields(notification_id = %id))]
    pub async fn mark_read(&self, id: &NotificationId, auth: &AuthSession) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .patch(&format!("/notifications/{id}/read"), &serde_json::json!({}), Some(auth))
            .await?;
        Ok(())
    }

    /// Mark every notification read.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn mark_all_read(&self, auth: &AuthSession) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .patch("/notifications/read-all", &serde_json::json!({}), Some(auth))
            .await?;
        Ok(())
    }
}
