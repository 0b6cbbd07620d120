//! Per-request CSP nonce.
//!
//! The base template carries one inline script (the cart badge bootstrap);
//! it is stamped with this nonce and `security_headers_middleware` allows
//! exactly that value in `script-src`.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;

/// 128 random bits, base64 encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CspNonce(pub String);

impl CspNonce {
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }

    /// Source expression for the header, `'nonce-<value>'`.
    #[must_use]
    pub fn source(&self) -> String {
        format!("'nonce-{}'", self.0)
    }
}

/// Insert a fresh [`CspNonce`]. Layered outside the security headers.
pub async fn csp_nonce_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(CspNonce::generate());
    next.run(request).await
}

/// Never fails. A missing nonce yields an empty value, which the policy
/// turns into plain `'self'` so the inline script is blocked.
impl<S: Send + Sync> FromRequestParts<S> for CspNonce {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let nonce = parts.extensions.get::<Self>().cloned();
        if nonce.is_none() {
            tracing::warn!("request reached a page without a CSP nonce");
        }
        Ok(nonce.unwrap_or_else(|| Self(String::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random_and_24_chars() {
        let first = CspNonce::generate();
        assert_ne!(first, CspNonce::generate());
        assert_eq!(first.value().len(), 24);
    }

    #[test]
    fn test_source() {
        assert_eq!(CspNonce("abc=".to_string()).source(), "'nonce-abc='");
    }
}
