//! Session-related types for admin authentication.

use sapa_api::types::User;
use sapa_core::UserId;
use serde::{Deserialize, Serialize};

/// Session-stored admin identity.
///
/// Only users whose API role is `ADMIN` are ever stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

impl CurrentAdmin {
    /// Identity for an API user, or `None` for non-admins and disabled accounts.
    #[must_use]
    pub fn from_user(user: &User) -> Option<Self> {
        (user.is_admin() && user.is_active).then(|| Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        })
    }

    /// Name for the sidebar, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Session keys for admin authentication data.
pub mod session_keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for the admin's API token pair.
    pub const TOKENS: &str = "api_tokens";

    /// Key for pending flash messages.
    pub const FLASH: &str = "flash";
}
