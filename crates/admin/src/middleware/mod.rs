//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added in `main`)
//! 2. Session layer (tower-sessions, SameSite=Strict, added in `main`)
//! 3. `TraceLayer` (request tracing)
//! 4. Security headers (strict CSP, no framing)
//! 5. Token write-back (persist tokens refreshed by a handler)

pub mod auth;
pub mod security_headers;
pub mod session;

pub use auth::{
    AdminAuthRejection, RequireAdminAuth, current_admin, sign_in, sign_out,
    token_writeback_middleware,
};
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_layer};
