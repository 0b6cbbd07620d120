//! Users, profiles, addresses and auth request bodies.

use chrono::{DateTime, Utc};
use sapa_core::{AddressId, PageRequest, UserId, UserRole};
use serde::{Deserialize, Serialize};

/// An account as returned by `/auth/me` and `/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub order_count: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub id: Option<AddressId>,
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub ward: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl Address {
    /// Single-line rendering, most specific part first.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            Some(self.line1.as_str()),
            self.line2.as_deref(),
            self.ward.as_deref(),
            self.district.as_deref(),
            Some(self.city.as_str()),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Body for creating or updating an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub ward: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl From<&Address> for AddressInput {
    fn from(address: &Address) -> Self {
        Self {
            full_name: address.full_name.clone(),
            phone: address.phone.clone(),
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            ward: address.ward.clone(),
            district: address.district.clone(),
            city: address.city.clone(),
            country: address.country.clone(),
            postal_code: address.postal_code.clone(),
            is_default: address.is_default,
        }
    }
}

/// Body for `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Body for `POST /auth/reset-password`.
#[derive(Debug, Clone, Serialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Body for `PATCH /users/me`.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Body for `POST /users/me/password`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Body for `PATCH /users/{id}` (admin).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Admin filters for `GET /users`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub page: PageRequest,
    pub search: Option<String>,
    pub role: Option<UserRole>,
}

impl UserQuery {
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.page.to_string()),
            ("limit", self.page.limit.to_string()),
        ];
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(role) = self.role {
            pairs.push(("role", role.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_defaults() {
        let user: User =
            serde_json::from_str(r#"{"id":"u1","email":"a@sapa.vn","name":"An"}"#).unwrap();
        assert_eq!(user.role, UserRole::Customer);
        assert!(user.is_active);
        assert!(!user.is_admin());
    }

    #[test]
    fn test_address_one_line_skips_blanks() {
        let address = Address {
            id: None,
            full_name: "Trần Bình".to_string(),
            phone: "0900000000".to_string(),
            line1: "12 Lý Thường Kiệt".to_string(),
            line2: Some(String::new()),
            ward: Some("Phường 7".to_string()),
            district: Some("Quận 10".to_string()),
            city: "TP. Hồ Chí Minh".to_string(),
            country: None,
            postal_code: None,
            is_default: true,
        };
        assert_eq!(
            address.one_line(),
            "12 Lý Thường Kiệt, Phường 7, Quận 10, TP. Hồ Chí Minh"
        );
    }

    #[test]
    fn test_user_update_skips_unset() {
        let body = UserUpdate {
            role: None,
            is_active: Some(false),
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"isActive":false}"#);
    }
}
