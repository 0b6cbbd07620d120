//! Session-related types.
//!
//! Types stored in the session for authentication state.

use sapa_api::TokenPair;
use sapa_api::types::User;
use sapa_core::{UserId, UserRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session-stored customer identity.
///
/// Minimal data needed to render the header and authorise pages without
/// calling `/auth/me` on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl CurrentCustomer {
    /// Name for the header greeting, falling back to the email's local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.email.split('@').next().unwrap_or(&self.email)
        } else {
            &self.name
        }
    }
}

impl From<&User> for CurrentCustomer {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// The session's API tokens.
///
/// `key` identifies the session to the token keeper, which owns the
/// scheduled refresh for this pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTokens {
    pub key: Uuid,
    pub tokens: TokenPair,
}

impl StoredTokens {
    #[must_use]
    pub fn new(tokens: TokenPair) -> Self {
        Self {
            key: Uuid::new_v4(),
            tokens,
        }
    }
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for the customer's API token pair.
    pub const TOKENS: &str = "api_tokens";

    /// Key for pending flash messages.
    pub const FLASH: &str = "flash";
}
