//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added in `main`)
//! 2. Session layer (tower-sessions with `PostgreSQL` store, added in `main`)
//! 3. `TraceLayer` (request tracing)
//! 4. Request ID (add unique ID to each request)
//! 5. CSP nonce (generate per-request nonce for inline scripts)
//! 6. Security headers (CSP, frame and isolation policies)
//! 7. Locale (strip `/{locale}` or redirect to it)
//! 8. Token write-back (persist tokens refreshed by a handler)
//! 9. Rate limiting (governor, per route group)

pub mod auth;
pub mod csp;
pub mod locale;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAuth, current_customer, sign_in, sign_out, token_writeback_middleware,
};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use locale::{RequestLocale, locale_middleware};
pub use rate_limit::{action_rate_limiter, auth_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_layer};
