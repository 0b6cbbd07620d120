//! Errors returned by the commerce API client.

use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the commerce API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Missing or expired credentials, and refreshing did not help.
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed.
    #[error("Forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API rejected the input (400 or 422).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The request conflicts with current state (409), e.g. out of stock.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other non-success status.
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Too many requests.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The configured base URL is unusable.
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// An owned copy of an error shared between coalesced callers.
    ///
    /// Transport and decode errors cannot be cloned and come back as a
    /// `502` server error carrying their message.
    #[must_use]
    pub(crate) fn from_shared(err: Arc<Self>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(|shared| match &*shared {
            Self::Unauthorized => Self::Unauthorized,
            Self::Forbidden => Self::Forbidden,
            Self::NotFound(m) => Self::NotFound(m.clone()),
            Self::Validation(m) => Self::Validation(m.clone()),
            Self::Conflict(m) => Self::Conflict(m.clone()),
            Self::Server { status, message } => Self::Server {
                status: *status,
                message: message.clone(),
            },
            Self::RateLimited(secs) => Self::RateLimited(*secs),
            Self::InvalidBaseUrl(m) => Self::InvalidBaseUrl(m.clone()),
            Self::Http(e) => Self::Server {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: e.to_string(),
            },
            Self::Decode(e) => Self::Server {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: e.to_string(),
            },
        })
    }

    /// Build an error from a non-success status and the server's message.
    #[must_use]
    pub fn from_status(status: StatusCode, message: String, retry_after: Option<u64>) -> Self {
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation(message),
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::CONFLICT => Self::Conflict(message),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited(retry_after.unwrap_or(1)),
            _ => Self::Server {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// The message the API sent with the error, if it is meant for users.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::NotFound(m) | Self::Validation(m) | Self::Conflict(m) if !m.is_empty() => {
                Some(m.as_str())
            }
            _ => None,
        }
    }

    /// Translation key for a generic message when the API sent none.
    #[must_use]
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::Http(_) | Self::InvalidBaseUrl(_) => "error.network",
            Self::Decode(_) | Self::Server { .. } => "error.server",
            Self::Unauthorized => "error.unauthorized",
            Self::Forbidden => "error.forbidden",
            Self::NotFound(_) => "error.not_found",
            Self::Validation(_) => "error.validation",
            Self::Conflict(_) => "error.conflict",
            Self::RateLimited(_) => "error.rate_limited",
        }
    }

    /// A message safe to show in a flash, in English.
    ///
    /// Prefers the API's own message; otherwise a generic sentence.
    #[must_use]
    pub fn user_message(&self) -> String {
        if let Some(message) = self.server_message() {
            return message.to_string();
        }
        match self {
            Self::Http(_) | Self::InvalidBaseUrl(_) => {
                "The shop is temporarily unreachable. Please try again.".to_string()
            }
            Self::Unauthorized => "Please sign in again.".to_string(),
            Self::Forbidden => "You do not have permission to do that.".to_string(),
            Self::NotFound(_) => "That item could not be found.".to_string(),
            Self::Validation(_) => "Please check the form and try again.".to_string(),
            Self::Conflict(_) => "That change conflicts with the current state.".to_string(),
            Self::RateLimited(secs) => format!("Too many requests. Try again in {secs} seconds."),
            Self::Decode(_) | Self::Server { .. } => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }

    /// Whether this is a fault on our side or the API's, worth reporting.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Decode(_) | Self::Server { .. } | Self::InvalidBaseUrl(_)
        )
    }
}

/// Pull a human message out of an error body.
///
/// Accepts `{"message": "..."}`, `{"message": ["...", "..."]}` and
/// `{"error": "..."}`. Falls back to the raw body, truncated.
#[must_use]
pub fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let field = value.get("message").or_else(|| value.get("error"));
        match field {
            Some(serde_json::Value::String(s)) => return s.clone(),
            Some(serde_json::Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(serde_json::Value::as_str).collect();
                if !parts.is_empty() {
                    return parts.join("; ");
                }
            }
            _ => {}
        }
    }
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_shared_keeps_variant() {
        let shared = Arc::new(ApiError::Conflict("used".into()));
        let _other = Arc::clone(&shared);
        assert!(matches!(ApiError::from_shared(shared), ApiError::Conflict(m) if m == "used"));
        assert!(matches!(
            ApiError::from_shared(Arc::new(ApiError::Unauthorized)),
            ApiError::Unauthorized
        ));
    }

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad".into(), None),
            ApiError::Validation(m) if m == "bad"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, String::new(), None),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new(), Some(30)),
            ApiError::RateLimited(30)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "down".into(), None),
            ApiError::Server { status: 502, .. }
        ));
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ApiError::Conflict("Sản phẩm đã hết hàng".to_string());
        assert_eq!(err.user_message(), "Sản phẩm đã hết hàng");

        let err = ApiError::Conflict(String::new());
        assert_eq!(
            err.user_message(),
            "That change conflicts with the current state."
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = ApiError::Server {
            status: 500,
            message: "stack trace here".to_string(),
        };
        assert_eq!(err.server_message(), None);
        assert!(!err.user_message().contains("stack"));
        assert!(err.is_server_fault());
    }

    #[test]
    fn test_extract_message_shapes() {
        assert_eq!(extract_message(r#"{"message":"Invalid coupon"}"#), "Invalid coupon");
        assert_eq!(
            extract_message(r#"{"message":["email must be an email","password too short"]}"#),
            "email must be an email; password too short"
        );
        assert_eq!(extract_message(r#"{"error":"Not Found"}"#), "Not Found");
        assert_eq!(extract_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ApiError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
